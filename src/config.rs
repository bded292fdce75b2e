use std::time::Duration;

use serde::Deserialize;
use serde_with::{serde_as, DurationMilliSeconds};
use typed_builder::TypedBuilder;

use crate::{driver::Locator, page::PageIndex};

pub const DIRECTORY_URL: &str = "https://service2.mom.gov.sg/eadirectory/";

/// Everything a run needs to know about the site and how patient to be with it.
///
/// Every field has a default, so an empty (or absent) TOML file is a valid config.
#[derive(Clone, Debug, TypedBuilder, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScraperConfig {
    #[builder(default = DIRECTORY_URL.to_owned())]
    pub site_url: String,
    #[builder(default)]
    pub selectors: SiteSelectors,
    #[builder(default)]
    pub timeouts: Timeouts,
    #[builder(default)]
    pub limits: Limits,
    #[builder(default)]
    pub browser: BrowserOptions,
}
impl Default for ScraperConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Markup of the directory site.  The engine never hard-codes class names.
#[derive(Clone, Debug, TypedBuilder, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteSelectors {
    #[builder(default = "div.loadingoverlay".to_owned())]
    pub overlay: String,
    /// Element id of the button that reveals the agency listing.
    #[builder(default = "eadHomeForm:j_id_16_a".to_owned())]
    pub initial_panel_id: String,
    #[builder(default = ".ui-commandlink.ui-widget.cardAgencyName".to_owned())]
    pub card: String,
    #[builder(default = "id".to_owned())]
    pub card_id_attribute: String,
    #[builder(
        default = ".dxd-mom-columns.dxd-mom-three.dxd-mom-agency-location.dxd-mom-hard.contactBorderLeft.contactBorderTop".to_owned()
    )]
    pub detail_block: String,
    #[builder(default = "div.dxd-mom-columns.dxd-mom-eleven h2.eaName".to_owned())]
    pub name_heading: String,
    #[builder(default = ".ui-commandlink.ui-widget.backLink.dxd-mom-back-page-nav".to_owned())]
    pub back_link: String,
    #[builder(default = "a.ui-paginator-next".to_owned())]
    pub next_page: String,
    #[builder(default = "pageNumber".to_owned())]
    pub page_number_class: String,
    /// Class carried by the page-number control of the rendered page.  The directory's class
    /// for it is not known, so nothing is confirmed unless one is configured.
    #[builder(default)]
    pub active_page_class: Option<String>,
}
impl Default for SiteSelectors {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl SiteSelectors {
    pub fn overlay(&self) -> Locator {
        Locator::Css(self.overlay.clone())
    }

    pub fn initial_panel(&self) -> Locator {
        Locator::Id(self.initial_panel_id.clone())
    }

    pub fn card(&self) -> Locator {
        Locator::Css(self.card.clone())
    }

    pub fn detail_block(&self) -> Locator {
        Locator::Css(self.detail_block.clone())
    }

    pub fn name_heading(&self) -> Locator {
        Locator::Css(self.name_heading.clone())
    }

    pub fn back_link(&self) -> Locator {
        Locator::Css(self.back_link.clone())
    }

    pub fn next_page(&self) -> Locator {
        Locator::Css(self.next_page.clone())
    }

    /// The page-number control whose text is exactly `page`.
    ///
    /// The site pads the numbers with `&nbsp;`, which `normalize-space` alone keeps.
    pub fn page_number(&self, page: PageIndex) -> Locator {
        Locator::XPath(format!(
            "//span[{}][normalize-space(translate(., '\u{a0}', ' '))='{page}']",
            has_class(&self.page_number_class),
        ))
    }

    pub fn active_page_number(&self, page: PageIndex) -> Option<Locator> {
        let active = self.active_page_class.as_deref()?;
        Some(Locator::XPath(format!(
            "//span[{}][{}][normalize-space(translate(., '\u{a0}', ' '))='{page}']",
            has_class(&self.page_number_class),
            has_class(active),
        )))
    }
}

/// Whole-word class test; `contains(@class, 'active')` would also match `inactive`.
fn has_class(class: &str) -> String {
    format!("contains(concat(' ', normalize-space(@class), ' '), ' {class} ')")
}

/// Upper bounds of every condition-based wait.
#[serde_as]
#[derive(Clone, Debug, TypedBuilder, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Timeouts {
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[builder(default = Duration::from_secs(10))]
    pub overlay: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[builder(default = Duration::from_secs(10))]
    pub clickable: Duration,
    /// Re-check after scrolling or an intercepted click.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[builder(default = Duration::from_secs(1))]
    pub settle: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[builder(default = Duration::from_secs(10))]
    pub cards: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[builder(default = Duration::from_secs(10))]
    pub field: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[builder(default = Duration::from_secs(5))]
    pub page_confirm: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[builder(default = Duration::from_millis(100))]
    pub poll_interval: Duration,
}
impl Default for Timeouts {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Clone, Debug, TypedBuilder, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Limits {
    /// "next" clicks allowed while looking for the start page.
    #[builder(default = 1000)]
    pub seek_attempts: u32,
    #[builder(default = 3)]
    pub advance_attempts: u32,
}
impl Default for Limits {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[serde_as]
#[derive(Clone, Debug, TypedBuilder, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrowserOptions {
    #[builder(default = true)]
    pub headless: bool,
    #[builder(default = Some((1920, 1080)))]
    pub window_size: Option<(u32, u32)>,
    #[builder(default)]
    pub remote_debugging_port: Option<u16>,
    /// Chrome is killed after this long without any protocol traffic.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[builder(default = Duration::from_secs(600))]
    pub idle_timeout: Duration,
}
impl Default for BrowserOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}
