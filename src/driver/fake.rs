//! In-memory directory site for exercising the engine without a browser.
//!
//! Waits never take time: a condition either holds in the current state or the wait fails
//! at once with [`DriverError::Timeout`].

use std::{
    cell::{Ref, RefCell},
    collections::{HashMap, HashSet},
    time::Duration,
};

use super::{Driver, DriverError, DriverResult, Locator};
use crate::{config::SiteSelectors, page::PageIndex};

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum FakeElement {
    Panel,
    Overlay,
    Card(String),
    PageNumber(u32),
    Next,
    Back,
    DetailBlock,
    NameHeading,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Event {
    Navigated(String),
    Clicked(FakeElement),
    OverlayRemoved(usize),
    HistoryBack,
}

#[derive(Clone, Debug)]
pub struct FakeAgency {
    pub id: String,
    pub name: Option<String>,
    pub detail: Option<String>,
}

impl FakeAgency {
    pub fn new(id: &str, name: &str, detail: &str) -> Self {
        Self {
            id: id.to_owned(),
            name: Some(name.to_owned()),
            detail: Some(detail.to_owned()),
        }
    }

    fn generated(page: u32, i: u32) -> Self {
        Self {
            id: format!("agency-{page}-{i}"),
            name: Some(format!("  Agency {page}-{i}  ")),
            detail: Some(format!(
                "Main Branch: {i} Road\n{page} Lane\n6{page:03}{i:04}"
            )),
        }
    }
}

pub struct FakeSite {
    selectors: SiteSelectors,
    page_count: u32,
    cards_per_page: u32,
    overridden_pages: HashMap<u32, Vec<FakeAgency>>,
    /// Page numbers rendered on each side of the current one.
    pub strip_radius: u32,
    pub navigated: bool,
    pub panel_open: bool,
    pub current_page: u32,
    pub viewing: Option<String>,
    pub overlay_stuck: bool,
    pub unclickable: HashSet<FakeElement>,
    /// Remaining intercepted clicks per element.
    pub intercepts: HashMap<FakeElement, u32>,
    /// Upcoming "next" clicks that fail with a protocol error.
    pub failing_next_clicks: u32,
    pub back_link_missing: bool,
    pub events: Vec<Event>,
}

impl FakeSite {
    pub fn new(page_count: u32, cards_per_page: u32) -> Self {
        Self {
            selectors: SiteSelectors::default(),
            page_count,
            cards_per_page,
            overridden_pages: HashMap::new(),
            strip_radius: 2,
            navigated: false,
            panel_open: false,
            current_page: 1,
            viewing: None,
            overlay_stuck: false,
            unclickable: HashSet::new(),
            intercepts: HashMap::new(),
            failing_next_clicks: 0,
            back_link_missing: false,
            events: vec![],
        }
    }

    pub fn with_page(mut self, page: u32, agencies: Vec<FakeAgency>) -> Self {
        self.overridden_pages.insert(page, agencies);
        self
    }

    fn agencies(&self, page: u32) -> Vec<FakeAgency> {
        match self.overridden_pages.get(&page) {
            Some(agencies) => agencies.clone(),
            None => (1..=self.cards_per_page)
                .map(|i| FakeAgency::generated(page, i))
                .collect(),
        }
    }

    fn viewed_agency(&self) -> Option<FakeAgency> {
        let id = self.viewing.as_ref()?;
        self.agencies(self.current_page)
            .into_iter()
            .find(|agency| &agency.id == id)
    }

    fn on_listing(&self) -> bool {
        self.navigated && self.panel_open && self.viewing.is_none()
    }

    fn visible_page_numbers(&self) -> impl Iterator<Item = u32> {
        let low = self.current_page.saturating_sub(self.strip_radius).max(1);
        let high = (self.current_page + self.strip_radius).min(self.page_count);
        low..=high
    }

    fn resolve(&self, locator: &Locator) -> Vec<FakeElement> {
        let s = &self.selectors;
        if !self.navigated {
            return vec![];
        }
        if *locator == s.overlay() {
            return if self.overlay_stuck {
                vec![FakeElement::Overlay]
            } else {
                vec![]
            };
        }
        if *locator == s.initial_panel() {
            return vec![FakeElement::Panel];
        }
        if self.on_listing() {
            if *locator == s.card() {
                return self
                    .agencies(self.current_page)
                    .into_iter()
                    .map(|agency| FakeElement::Card(agency.id))
                    .collect();
            }
            if let Locator::Id(id) = locator {
                return self
                    .agencies(self.current_page)
                    .into_iter()
                    .filter(|agency| &agency.id == id)
                    .map(|agency| FakeElement::Card(agency.id))
                    .take(1)
                    .collect();
            }
            if *locator == s.next_page() && self.current_page < self.page_count {
                return vec![FakeElement::Next];
            }
            let current = PageIndex::new(self.current_page);
            if current.and_then(|page| s.active_page_number(page)).as_ref() == Some(locator) {
                return vec![FakeElement::PageNumber(self.current_page)];
            }
            for n in self.visible_page_numbers() {
                if let Some(page) = PageIndex::new(n) {
                    if *locator == s.page_number(page) {
                        return vec![FakeElement::PageNumber(n)];
                    }
                }
            }
        }
        if let Some(agency) = self.viewed_agency() {
            if *locator == s.detail_block() && agency.detail.is_some() {
                return vec![FakeElement::DetailBlock];
            }
            if *locator == s.name_heading() && agency.name.is_some() {
                return vec![FakeElement::NameHeading];
            }
            if *locator == s.back_link() && !self.back_link_missing {
                return vec![FakeElement::Back];
            }
        }
        vec![]
    }

    fn is_attached(&self, element: &FakeElement) -> bool {
        let s = &self.selectors;
        let locator = match element {
            FakeElement::Panel => s.initial_panel(),
            FakeElement::Overlay => s.overlay(),
            FakeElement::Card(id) => Locator::Id(id.clone()),
            FakeElement::PageNumber(n) => match PageIndex::new(*n) {
                Some(page) => s.page_number(page),
                None => return false,
            },
            FakeElement::Next => s.next_page(),
            FakeElement::Back => s.back_link(),
            FakeElement::DetailBlock => s.detail_block(),
            FakeElement::NameHeading => s.name_heading(),
        };
        self.resolve(&locator).contains(element)
    }

    fn click(&mut self, element: &FakeElement) -> DriverResult<()> {
        if !self.is_attached(element) {
            return Err(DriverError::Stale);
        }
        if let Some(remaining) = self.intercepts.get_mut(element) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(DriverError::ClickIntercepted);
            }
        }
        match element {
            FakeElement::Panel => self.panel_open = true,
            FakeElement::Card(id) => self.viewing = Some(id.clone()),
            FakeElement::Back => self.viewing = None,
            FakeElement::Next => {
                if self.failing_next_clicks > 0 {
                    self.failing_next_clicks -= 1;
                    return Err(DriverError::Protocol("Node is detached".to_owned()));
                }
                self.current_page += 1;
            }
            FakeElement::PageNumber(n) => self.current_page = *n,
            FakeElement::Overlay | FakeElement::DetailBlock | FakeElement::NameHeading => {}
        }
        self.events.push(Event::Clicked(element.clone()));
        Ok(())
    }
}

pub struct FakeDriver {
    site: RefCell<FakeSite>,
}

impl FakeDriver {
    pub fn new(site: FakeSite) -> Self {
        Self {
            site: RefCell::new(site),
        }
    }

    pub fn site(&self) -> Ref<'_, FakeSite> {
        self.site.borrow()
    }

    pub fn update(&self, f: impl FnOnce(&mut FakeSite)) {
        f(&mut self.site.borrow_mut())
    }

    pub fn clicks(&self) -> Vec<FakeElement> {
        self.site
            .borrow()
            .events
            .iter()
            .filter_map(|event| match event {
                Event::Clicked(element) => Some(element.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count_events(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.site.borrow().events.iter().filter(|&e| pred(e)).count()
    }
}

impl Driver for FakeDriver {
    type Element<'a> = FakeElement;

    fn navigate_to(&self, url: &str) -> DriverResult<()> {
        let mut site = self.site.borrow_mut();
        site.navigated = true;
        site.panel_open = false;
        site.viewing = None;
        site.current_page = 1;
        site.events.push(Event::Navigated(url.to_owned()));
        Ok(())
    }

    fn navigate_back(&self) -> DriverResult<()> {
        let mut site = self.site.borrow_mut();
        site.viewing = None;
        site.events.push(Event::HistoryBack);
        Ok(())
    }

    fn locate_all(&self, locator: &Locator) -> DriverResult<Vec<FakeElement>> {
        Ok(self.site.borrow().resolve(locator))
    }

    fn wait_until_present(&self, locator: &Locator, timeout: Duration) -> DriverResult<FakeElement> {
        self.site
            .borrow()
            .resolve(locator)
            .into_iter()
            .next()
            .ok_or_else(|| DriverError::Timeout {
                locator: locator.clone(),
                timeout,
            })
    }

    fn wait_until_clickable(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> DriverResult<FakeElement> {
        let site = self.site.borrow();
        site.resolve(locator)
            .into_iter()
            .find(|element| !site.unclickable.contains(element))
            .ok_or_else(|| DriverError::Timeout {
                locator: locator.clone(),
                timeout,
            })
    }

    fn wait_until_absent(&self, locator: &Locator, timeout: Duration) -> DriverResult<()> {
        if self.site.borrow().resolve(locator).is_empty() {
            Ok(())
        } else {
            Err(DriverError::Timeout {
                locator: locator.clone(),
                timeout,
            })
        }
    }

    fn remove_all(&self, locator: &Locator) -> DriverResult<usize> {
        let mut site = self.site.borrow_mut();
        let removed = site.resolve(locator).len();
        if *locator == site.selectors.overlay() {
            site.overlay_stuck = false;
        }
        site.events.push(Event::OverlayRemoved(removed));
        Ok(removed)
    }

    fn scroll_into_view(&self, element: &FakeElement) -> DriverResult<()> {
        if self.site.borrow().is_attached(element) {
            Ok(())
        } else {
            Err(DriverError::Stale)
        }
    }

    fn click_direct(&self, element: &FakeElement) -> DriverResult<()> {
        self.site.borrow_mut().click(element)
    }

    fn text_of(&self, element: &FakeElement) -> DriverResult<String> {
        let site = self.site.borrow();
        let agency = site.viewed_agency();
        let text = match element {
            FakeElement::DetailBlock => agency.and_then(|a| a.detail),
            FakeElement::NameHeading => agency.and_then(|a| a.name),
            FakeElement::PageNumber(n) => Some(format!("\u{a0}{n}")),
            _ => Some(String::new()),
        };
        text.ok_or(DriverError::Stale)
    }

    fn attribute_of(&self, element: &FakeElement, name: &str) -> DriverResult<Option<String>> {
        match (element, name) {
            (FakeElement::Card(id), "id") => Ok(Some(id.clone())),
            _ => Ok(None),
        }
    }
}
