//! [`Driver`] backed by a real Chrome instance through the DevTools protocol.

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use headless_chrome::{
    browser::tab::{element::Element, NoElementFound},
    util::Wait,
    Browser, LaunchOptionsBuilder, Tab,
};
use log::{debug, info};
use serde_json::{json, Value};

use super::{Driver, DriverError, DriverResult, Locator};
use crate::config::BrowserOptions;

const IS_CLICKABLE_JS: &str = r#"function() {
    if (!this.isConnected || this.disabled) { return false; }
    const style = window.getComputedStyle(this);
    if (style.display === 'none' || style.visibility === 'hidden') { return false; }
    const rect = this.getBoundingClientRect();
    return rect.width > 0 && rect.height > 0;
}"#;

const CLICK_DIRECT_JS: &str = r#"function(overlay) {
    const rect = this.getBoundingClientRect();
    const hit = document.elementFromPoint(rect.left + rect.width / 2, rect.top + rect.height / 2);
    if (overlay && hit && hit !== this && !this.contains(hit) && hit.closest(overlay)) {
        return false;
    }
    this.click();
    return true;
}"#;

/// The one browser of a run.  Dropping it closes the tab and kills Chrome, so holding it in
/// a local binding releases the browser on every exit path, unwinding included.
pub struct BrowserSession {
    driver: ChromeDriver,
    _browser: Browser,
}

impl BrowserSession {
    pub fn launch(
        options: &BrowserOptions,
        overlay: Locator,
        poll_interval: Duration,
    ) -> anyhow::Result<Self> {
        let launch_options = LaunchOptionsBuilder::default()
            .headless(options.headless)
            .window_size(options.window_size)
            .port(options.remote_debugging_port)
            .idle_browser_timeout(options.idle_timeout)
            .build()?;
        let browser = Browser::new(launch_options).context("Failed to launch Chrome")?;
        let tab = browser.new_tab().context("Failed to open a tab")?;
        info!("Browser session started.");
        Ok(Self {
            driver: ChromeDriver {
                tab,
                overlay,
                poll_interval,
            },
            _browser: browser,
        })
    }

    pub fn driver(&self) -> &ChromeDriver {
        &self.driver
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if let Err(e) = self.driver.tab.close(false) {
            debug!("Tab was not closed cleanly: {e}");
        }
        info!("Browser session released.");
    }
}

pub struct ChromeDriver {
    tab: Arc<Tab>,
    /// Anything under this is considered to intercept clicks.
    overlay: Locator,
    poll_interval: Duration,
}

impl ChromeDriver {
    fn wait(&self, timeout: Duration) -> Wait {
        Wait::new(timeout, self.poll_interval)
    }

    fn evaluate(&self, expression: &str) -> DriverResult<Option<Value>> {
        let object = self
            .tab
            .evaluate(expression, false)
            .map_err(DriverError::protocol)?;
        Ok(object.value)
    }

    fn is_clickable(element: &Element<'_>) -> bool {
        match element.call_js_fn(IS_CLICKABLE_JS, vec![], false) {
            Ok(object) => object.value == Some(Value::Bool(true)),
            Err(e) => {
                debug!("Clickability check failed: {e}");
                false
            }
        }
    }
}

impl Driver for ChromeDriver {
    type Element<'a> = Element<'a>;

    fn navigate_to(&self, url: &str) -> DriverResult<()> {
        self.tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(DriverError::protocol)?;
        Ok(())
    }

    fn navigate_back(&self) -> DriverResult<()> {
        self.evaluate("history.back()")?;
        Ok(())
    }

    fn locate_all(&self, locator: &Locator) -> DriverResult<Vec<Element<'_>>> {
        let found = match locator {
            Locator::Css(css) => self.tab.find_elements(css),
            Locator::Id(id) => self.tab.find_elements(&id_selector(id)),
            Locator::XPath(xpath) => self.tab.find_elements_by_xpath(xpath),
        };
        match found {
            Ok(elements) => Ok(elements),
            Err(e) if e.downcast_ref::<NoElementFound>().is_some() => Ok(vec![]),
            Err(e) => Err(DriverError::protocol(e)),
        }
    }

    fn wait_until_present(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> DriverResult<Element<'_>> {
        self.wait(timeout)
            .until(|| self.locate_all(locator).ok()?.into_iter().next())
            .map_err(|_| DriverError::Timeout {
                locator: locator.clone(),
                timeout,
            })
    }

    fn wait_until_clickable(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> DriverResult<Element<'_>> {
        self.wait(timeout)
            .until(|| {
                self.locate_all(locator)
                    .ok()?
                    .into_iter()
                    .find(Self::is_clickable)
            })
            .map_err(|_| DriverError::Timeout {
                locator: locator.clone(),
                timeout,
            })
    }

    fn wait_until_absent(&self, locator: &Locator, timeout: Duration) -> DriverResult<()> {
        let expression = all_invisible_js(locator);
        self.wait(timeout)
            .until(|| match self.evaluate(&expression) {
                Ok(Some(Value::Bool(true))) => Some(()),
                Ok(_) => None,
                Err(e) => {
                    debug!("Visibility check of {locator} failed: {e}");
                    None
                }
            })
            .map_err(|_| DriverError::Timeout {
                locator: locator.clone(),
                timeout,
            })
    }

    fn remove_all(&self, locator: &Locator) -> DriverResult<usize> {
        let removed = self.evaluate(&format!(
            "(() => {{ const els = {}; els.forEach(e => e.remove()); return els.length; }})()",
            select_all_js(locator)
        ))?;
        Ok(removed.and_then(|x| x.as_u64()).unwrap_or(0) as usize)
    }

    fn scroll_into_view(&self, element: &Element<'_>) -> DriverResult<()> {
        element.scroll_into_view().map_err(DriverError::protocol)?;
        Ok(())
    }

    fn click_direct(&self, element: &Element<'_>) -> DriverResult<()> {
        let overlay = match &self.overlay {
            Locator::Css(css) => json!(css),
            Locator::Id(id) => json!(id_selector(id)),
            Locator::XPath(_) => Value::Null,
        };
        let clicked = element
            .call_js_fn(CLICK_DIRECT_JS, vec![overlay], false)
            .map_err(DriverError::protocol)?;
        match clicked.value {
            Some(Value::Bool(false)) => Err(DriverError::ClickIntercepted),
            _ => Ok(()),
        }
    }

    fn text_of(&self, element: &Element<'_>) -> DriverResult<String> {
        element.get_inner_text().map_err(DriverError::protocol)
    }

    fn attribute_of(&self, element: &Element<'_>, name: &str) -> DriverResult<Option<String>> {
        element
            .get_attribute_value(name)
            .map_err(DriverError::protocol)
    }
}

fn id_selector(id: &str) -> String {
    format!("[id={}]", json!(id))
}

/// A JS expression evaluating to the array of elements matched by `locator`.
fn select_all_js(locator: &Locator) -> String {
    match locator {
        Locator::Css(css) => format!("Array.from(document.querySelectorAll({}))", json!(css)),
        Locator::Id(id) => format!(
            "Array.from(document.querySelectorAll({}))",
            json!(id_selector(id))
        ),
        Locator::XPath(xpath) => format!(
            "(() => {{ const r = document.evaluate({}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); \
             return Array.from({{ length: r.snapshotLength }}, (_, i) => r.snapshotItem(i)); }})()",
            json!(xpath)
        ),
    }
}

fn all_invisible_js(locator: &Locator) -> String {
    format!(
        "{}.every(e => {{ \
            if (!e.isConnected) {{ return true; }} \
            const s = window.getComputedStyle(e); \
            const r = e.getBoundingClientRect(); \
            return s.display === 'none' || s.visibility === 'hidden' || r.width === 0 || r.height === 0; \
        }})",
        select_all_js(locator)
    )
}
