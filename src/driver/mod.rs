//! The browser capabilities the engine relies on.
//!
//! Every wait is bounded and condition-based: it returns as soon as its predicate holds and
//! fails with [`DriverError::Timeout`] once the given duration has elapsed.  Nothing here
//! sleeps for a fixed amount of time.

use std::{fmt::Display, time::Duration};

pub mod chrome;
#[cfg(test)]
pub mod fake;

/// How to find elements on the rendered page.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Locator {
    Css(String),
    /// Matched against the `id` attribute verbatim, so ids containing `:` need no escaping.
    Id(String),
    XPath(String),
}

impl Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Css(css) => write!(f, "css {css:?}"),
            Locator::Id(id) => write!(f, "id {id:?}"),
            Locator::XPath(xpath) => write!(f, "xpath {xpath:?}"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("{locator} did not satisfy the condition within {timeout:?}")]
    Timeout { locator: Locator, timeout: Duration },
    #[error("The click was intercepted by another element")]
    ClickIntercepted,
    #[error("The element is no longer attached to the page")]
    Stale,
    #[error("Browser protocol error: {0}")]
    Protocol(String),
}

impl DriverError {
    pub fn protocol(e: impl Display) -> Self {
        Self::Protocol(e.to_string())
    }
}

pub type DriverResult<T> = Result<T, DriverError>;

/// A page the engine can look at and interact with.
///
/// Element handles borrow the driver, so they cannot outlive the session that produced them.
pub trait Driver {
    type Element<'a>
    where
        Self: 'a;

    fn navigate_to(&self, url: &str) -> DriverResult<()>;

    /// History back navigation.
    fn navigate_back(&self) -> DriverResult<()>;

    /// All elements currently matching `locator`, in document order.  Never waits.
    fn locate_all(&self, locator: &Locator) -> DriverResult<Vec<Self::Element<'_>>>;

    fn wait_until_present(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> DriverResult<Self::Element<'_>>;

    /// Present, visible and enabled.
    fn wait_until_clickable(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> DriverResult<Self::Element<'_>>;

    /// Every match is detached or invisible.  Holds trivially when nothing matches.
    fn wait_until_absent(&self, locator: &Locator, timeout: Duration) -> DriverResult<()>;

    /// Detaches every match from the document and returns how many were removed.
    fn remove_all(&self, locator: &Locator) -> DriverResult<usize>;

    fn scroll_into_view(&self, element: &Self::Element<'_>) -> DriverResult<()>;

    /// Script-level click that bypasses hit-testing.  Reports
    /// [`DriverError::ClickIntercepted`] while a loading overlay covers the element.
    fn click_direct(&self, element: &Self::Element<'_>) -> DriverResult<()>;

    fn text_of(&self, element: &Self::Element<'_>) -> DriverResult<String>;

    fn attribute_of(&self, element: &Self::Element<'_>, name: &str) -> DriverResult<Option<String>>;
}
