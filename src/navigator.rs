//! Moving the paginated listing to a given page.
//!
//! The page-number strip only renders a sliding window of numbers around the current page,
//! so a far-away page has to be brought into the window with "next" clicks before it can be
//! clicked ([`PaginationNavigator::seek`]).  Inside the window, the neighbouring page is
//! clicked directly ([`PaginationNavigator::advance`]).

use log::{debug, info, trace, warn};

use crate::{
    click::{ClickFailure, SafeClicker},
    config::{Limits, SiteSelectors},
    driver::{Driver, DriverError},
    page::PageIndex,
};

#[derive(Debug, thiserror::Error)]
pub enum NavigationError {
    #[error("Page {target} was not reached after {attempts} attempts")]
    Exhausted {
        target: PageIndex,
        attempts: u32,
        last_error: Option<StepError>,
    },
    #[error("The control for page {page} never appeared")]
    PageNotFound {
        page: PageIndex,
        #[source]
        source: ClickFailure,
    },
}

/// A failed attempt, counted against the attempt bound rather than raised.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error(transparent)]
    Click(#[from] ClickFailure),
}

enum SeekStep {
    Reached,
    MovedForward,
}

pub struct PaginationNavigator<'c, 'd, D> {
    clicker: &'c SafeClicker<'d, D>,
    selectors: &'c SiteSelectors,
    limits: &'c Limits,
}

impl<'c, 'd, D: Driver> PaginationNavigator<'c, 'd, D> {
    pub fn new(
        clicker: &'c SafeClicker<'d, D>,
        selectors: &'c SiteSelectors,
        limits: &'c Limits,
    ) -> Self {
        Self {
            clicker,
            selectors,
            limits,
        }
    }

    /// Clicks "next" until the control reading exactly `target` is rendered, then clicks it.
    pub fn seek(&self, target: PageIndex) -> Result<PageIndex, NavigationError> {
        info!("Navigating to page {target} through the next control.");
        let mut attempts = 0;
        let mut last_error = None;
        while attempts < self.limits.seek_attempts {
            match self.seek_step(target) {
                Ok(SeekStep::Reached) => {
                    info!("Clicked the control of page {target} after {attempts} next click(s).");
                    self.confirm(target);
                    return Ok(target);
                }
                Ok(SeekStep::MovedForward) => {
                    attempts += 1;
                    trace!("Page {target} not in view yet (attempt {attempts}).");
                }
                Err(e) => {
                    attempts += 1;
                    warn!("Error while navigating to page {target} (attempt {attempts}): {e}");
                    last_error = Some(e);
                }
            }
        }
        Err(NavigationError::Exhausted {
            target,
            attempts,
            last_error,
        })
    }

    fn seek_step(&self, target: PageIndex) -> Result<SeekStep, StepError> {
        let driver = self.clicker.driver();
        let locator = self.selectors.page_number(target);
        if let Some(control) = driver.locate_all(&locator)?.into_iter().next() {
            // The window may render the control as inactive; a script click works regardless.
            self.clicker.click_located(&locator, control)?;
            return Ok(SeekStep::Reached);
        }
        self.clicker.click(&self.selectors.next_page())?;
        Ok(SeekStep::MovedForward)
    }

    /// Moves from `current` to `current + 1` by clicking that page number.
    pub fn advance(&self, current: PageIndex) -> Result<PageIndex, NavigationError> {
        let next = current.next();
        let locator = self.selectors.page_number(next);
        let mut attempts = 0;
        let mut last_error = None;
        while attempts < self.limits.advance_attempts {
            attempts += 1;
            match self.clicker.click(&locator) {
                Ok(_) => {
                    debug!("Clicked the control of page {next}.");
                    self.confirm(next);
                    return Ok(next);
                }
                Err(source @ ClickFailure::ElementNotReady { .. }) => {
                    return Err(NavigationError::PageNotFound { page: next, source });
                }
                Err(e) => {
                    warn!("Error while navigating to page {next} (attempt {attempts}): {e}");
                    last_error = Some(e.into());
                }
            }
        }
        Err(NavigationError::Exhausted {
            target: next,
            attempts,
            last_error,
        })
    }

    /// Waits for the strip to mark `page` as the rendered one.  Only logged when it does not.
    fn confirm(&self, page: PageIndex) {
        let Some(active) = self.selectors.active_page_number(page) else {
            return;
        };
        let driver = self.clicker.driver();
        if let Err(e) = driver.wait_until_present(&active, self.clicker.timeouts().page_confirm) {
            warn!("Page {page} is not marked as active: {e}");
        }
    }
}
