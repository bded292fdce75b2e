use log::{debug, warn};

use crate::{
    config::Timeouts,
    driver::{Driver, DriverError, Locator},
};

/// A successful click.  `overlay_forced` records the degraded path where the loading
/// overlay never went away by itself and had to be removed from the page.
pub struct Clicked<E> {
    pub element: E,
    pub overlay_forced: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ClickFailure {
    #[error("{locator} never became clickable: {source}")]
    ElementNotReady {
        locator: Locator,
        #[source]
        source: DriverError,
    },
    #[error("Clicking {locator} failed: {source}")]
    Rejected {
        locator: Locator,
        #[source]
        source: DriverError,
    },
}

/// Clicks elements of a page that keeps putting a loading overlay over itself.
pub struct SafeClicker<'d, D> {
    driver: &'d D,
    overlay: Locator,
    timeouts: &'d Timeouts,
}

impl<'d, D: Driver> SafeClicker<'d, D> {
    pub fn new(driver: &'d D, overlay: Locator, timeouts: &'d Timeouts) -> Self {
        Self {
            driver,
            overlay,
            timeouts,
        }
    }

    pub fn driver(&self) -> &'d D {
        self.driver
    }

    pub fn timeouts(&self) -> &'d Timeouts {
        self.timeouts
    }

    pub fn click(&self, locator: &Locator) -> Result<Clicked<D::Element<'d>>, ClickFailure> {
        let overlay_forced = self.clear_overlay();

        let element = self
            .driver
            .wait_until_clickable(locator, self.timeouts.clickable)
            .map_err(|source| ClickFailure::ElementNotReady {
                locator: locator.clone(),
                source,
            })?;
        let rejected = |source| ClickFailure::Rejected {
            locator: locator.clone(),
            source,
        };

        self.driver.scroll_into_view(&element).map_err(rejected)?;
        // Scrolling may re-render the element; prefer a handle taken afterwards.
        let element = match self
            .driver
            .wait_until_clickable(locator, self.timeouts.settle)
        {
            Ok(fresh) => fresh,
            Err(e) => {
                debug!("{locator} did not settle after scrolling: {e}");
                element
            }
        };

        self.press(locator, &element)?;
        Ok(Clicked {
            element,
            overlay_forced,
        })
    }

    /// Clicks an element that was already located, without waiting for it to be clickable.
    /// The overlay is still cleared first, and an intercepted click is retried once.
    pub fn click_located(
        &self,
        locator: &Locator,
        element: D::Element<'d>,
    ) -> Result<Clicked<D::Element<'d>>, ClickFailure> {
        let overlay_forced = self.clear_overlay();
        self.press(locator, &element)?;
        Ok(Clicked {
            element,
            overlay_forced,
        })
    }

    fn press(&self, locator: &Locator, element: &D::Element<'d>) -> Result<(), ClickFailure> {
        let rejected = |source| ClickFailure::Rejected {
            locator: locator.clone(),
            source,
        };
        match self.driver.click_direct(element) {
            Ok(()) => Ok(()),
            Err(DriverError::ClickIntercepted) => {
                warn!("Click on {locator} was intercepted; retrying once.");
                if let Err(e) = self
                    .driver
                    .wait_until_absent(&self.overlay, self.timeouts.settle)
                {
                    debug!("Overlay still present before the retry: {e}");
                }
                self.driver.click_direct(element).map_err(rejected)
            }
            Err(e) => Err(rejected(e)),
        }
    }

    /// Returns whether the overlay had to be removed by force.
    fn clear_overlay(&self) -> bool {
        match self
            .driver
            .wait_until_absent(&self.overlay, self.timeouts.overlay)
        {
            Ok(()) => false,
            Err(e) => {
                warn!("Overlay did not disappear in time ({e}); removing it.");
                match self.driver.remove_all(&self.overlay) {
                    Ok(removed) => debug!("Removed {removed} overlay element(s)."),
                    Err(e) => warn!("Could not remove the overlay: {e}"),
                }
                true
            }
        }
    }
}
