//! The scrape loop.
//!
//! ```text
//! Init -> Seeking -> Processing(p) -> Advancing(p) -> Processing(p + 1) -> ... -> Done
//!   \________\______________________________________________________________-> Failed
//! ```
//!
//! What each failure means for the run is decided here, from the typed results of the
//! components: entity failures skip the entity, advancement failures end the run early with
//! its output intact, and failing to reach the start page fails the run.

use std::{io, path::Path};

use anyhow::Context;
use log::{error, info, trace, warn};

use crate::{
    click::{ClickFailure, SafeClicker},
    config::ScraperConfig,
    detail::DetailExtractor,
    driver::{chrome::BrowserSession, Driver, DriverError},
    listing::{ListingEnumerator, VisitedSet},
    navigator::{NavigationError, PaginationNavigator},
    page::{PageIndex, PageRange},
    persist::RecordPersister,
};

#[derive(Debug, strum::IntoStaticStr)]
enum RunState {
    Init,
    Seeking,
    Processing(PageIndex),
    Advancing(PageIndex),
    Done(EndReason),
    Failed(RunError),
}

/// Why a run that did not fail stopped.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EndReason {
    /// The end page was processed.
    Completed,
    /// There was no control for the page after `after`, or it could not be clicked.
    NoFurtherPages { after: PageIndex },
    /// The cards of `page` never appeared.
    PageUnreadable { page: PageIndex },
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Could not open the directory site: {0}")]
    SiteUnreachable(#[source] DriverError),
    #[error("Could not open the agency listing: {0}")]
    ListingUnavailable(#[source] ClickFailure),
    #[error("Could not navigate to the start page: {0}")]
    StartPageUnreachable(#[source] NavigationError),
    #[error("Could not write the output: {0}")]
    Persist(#[from] io::Error),
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RunSummary {
    pub pages_processed: Vec<PageIndex>,
    pub ids_recorded: usize,
    pub records_written: usize,
    pub entities_skipped: usize,
    pub end: EndReason,
}

pub struct ScrapeRun<'a, D> {
    driver: &'a D,
    config: &'a ScraperConfig,
    range: PageRange,
    persister: &'a RecordPersister,
    visited: VisitedSet,
    pages_processed: Vec<PageIndex>,
    records_written: usize,
    entities_skipped: usize,
}

impl<'a, D: Driver> ScrapeRun<'a, D> {
    pub fn new(
        driver: &'a D,
        config: &'a ScraperConfig,
        range: PageRange,
        persister: &'a RecordPersister,
    ) -> Self {
        Self {
            driver,
            config,
            range,
            persister,
            visited: VisitedSet::default(),
            pages_processed: vec![],
            records_written: 0,
            entities_skipped: 0,
        }
    }

    pub fn run(mut self) -> Result<RunSummary, RunError> {
        let config = self.config;
        let selectors = &config.selectors;
        let timeouts = &config.timeouts;
        let clicker = SafeClicker::new(self.driver, selectors.overlay(), timeouts);
        let navigator = PaginationNavigator::new(&clicker, selectors, &config.limits);
        let listing = ListingEnumerator::new(
            self.driver,
            selectors.card(),
            &selectors.card_id_attribute,
            timeouts.cards,
        );
        let extractor = DetailExtractor::new(&clicker, &listing, selectors);

        let mut state = RunState::Init;
        loop {
            trace!("Run state: {}", <&str>::from(&state));
            state = match state {
                RunState::Init => match self.init(&clicker) {
                    Ok(()) => RunState::Seeking,
                    Err(e) => RunState::Failed(e),
                },
                RunState::Seeking => {
                    let start = self.range.start();
                    if start > PageIndex::FIRST {
                        match navigator.seek(start) {
                            Ok(page) => RunState::Processing(page),
                            Err(e) => RunState::Failed(RunError::StartPageUnreachable(e)),
                        }
                    } else {
                        RunState::Processing(PageIndex::FIRST)
                    }
                }
                RunState::Processing(page) => match self.process_page(page, &listing, &extractor) {
                    Ok(None) if page >= self.range.end() => RunState::Done(EndReason::Completed),
                    Ok(None) => RunState::Advancing(page),
                    Ok(Some(end)) => RunState::Done(end),
                    Err(e) => RunState::Failed(e),
                },
                RunState::Advancing(page) => match navigator.advance(page) {
                    Ok(next) => RunState::Processing(next),
                    Err(e) => {
                        warn!("Could not navigate to the page after {page}: {e}");
                        RunState::Done(EndReason::NoFurtherPages { after: page })
                    }
                },
                RunState::Done(end) => return Ok(self.summary(end)),
                RunState::Failed(e) => return Err(e),
            };
        }
    }

    fn init(&self, clicker: &SafeClicker<'a, D>) -> Result<(), RunError> {
        info!("Opening {}", self.config.site_url);
        self.driver
            .navigate_to(&self.config.site_url)
            .map_err(RunError::SiteUnreachable)?;
        clicker
            .click(&self.config.selectors.initial_panel())
            .map_err(RunError::ListingUnavailable)?;
        info!("Currently at page {}", PageIndex::FIRST);
        Ok(())
    }

    /// Returns `Some` if the run cannot go on after this page.
    fn process_page(
        &mut self,
        page: PageIndex,
        listing: &ListingEnumerator<'a, D>,
        extractor: &DetailExtractor<'_, 'a, D>,
    ) -> Result<Option<EndReason>, RunError> {
        info!("Scraping page {page}");
        let ids = match listing.enumerate(&mut self.visited) {
            Ok(ids) => ids,
            Err(e) => {
                error!("Could not read page {page}: {e}");
                return Ok(Some(EndReason::PageUnreadable { page }));
            }
        };
        self.persister.append_ids(page, &ids)?;
        self.pages_processed.push(page);

        for id in &ids {
            match extractor.extract(id) {
                Ok(record) => {
                    self.persister.append_record(page, &record)?;
                    self.records_written += 1;
                    info!("  Saved {id} ({})", record.name);
                }
                Err(e) => {
                    warn!("  Skipping {id}: {e}");
                    self.entities_skipped += 1;
                }
            }
        }
        Ok(None)
    }

    fn summary(self, end: EndReason) -> RunSummary {
        RunSummary {
            pages_processed: self.pages_processed,
            ids_recorded: self.visited.len(),
            records_written: self.records_written,
            entities_skipped: self.entities_skipped,
            end,
        }
    }
}

/// Scrapes `range` into `Scraper_<start>_<end>` under `output_root`.
///
/// The browser is launched here and released before returning, whatever the outcome.
pub fn scrape(
    range: PageRange,
    config: &ScraperConfig,
    output_root: &Path,
) -> anyhow::Result<RunSummary> {
    let persister = RecordPersister::create(output_root, &range)
        .with_context(|| format!("While preparing the output directory under {output_root:?}"))?;
    let session = BrowserSession::launch(
        &config.browser,
        config.selectors.overlay(),
        config.timeouts.poll_interval,
    )?;
    let result = ScrapeRun::new(session.driver(), config, range, &persister).run();
    drop(session);
    let summary = result?;
    info!(
        "Wrote {} record(s) for {} page(s) to {:?}.",
        summary.records_written,
        summary.pages_processed.len(),
        persister.details_path()
    );
    Ok(summary)
}
