use std::fmt::Display;

use log::{debug, info, warn};

use crate::{
    click::{ClickFailure, SafeClicker},
    config::SiteSelectors,
    driver::{Driver, Locator},
    listing::{EntityId, ListingEnumerator},
};

/// Placeholder written for a field that could not be read.
pub const NOT_AVAILABLE: &str = "N/A";

/// A text field of the detail view, or the fact that it could not be read in time.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Field {
    Value(String),
    NotAvailable,
}

impl Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Field::Value(value) => f.write_str(value),
            Field::NotAvailable => f.write_str(NOT_AVAILABLE),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct EntityRecord {
    pub id: EntityId,
    pub name: Field,
    pub detail: Field,
}

#[derive(Debug, thiserror::Error)]
#[error("Could not open agency {id}: {source}")]
pub struct EntityClickFailure {
    pub id: EntityId,
    #[source]
    pub source: ClickFailure,
}

/// How the listing was brought back after reading a detail view.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BackNavigation {
    BackControl,
    /// The page may not be the one the run believes it is on.
    HistoryFallback,
}

pub struct DetailExtractor<'c, 'd, D> {
    clicker: &'c SafeClicker<'d, D>,
    listing: &'c ListingEnumerator<'d, D>,
    selectors: &'c SiteSelectors,
}

impl<'c, 'd, D: Driver> DetailExtractor<'c, 'd, D> {
    pub fn new(
        clicker: &'c SafeClicker<'d, D>,
        listing: &'c ListingEnumerator<'d, D>,
        selectors: &'c SiteSelectors,
    ) -> Self {
        Self {
            clicker,
            listing,
            selectors,
        }
    }

    /// Opens the agency, reads its fields and returns to the listing.
    ///
    /// Only failing to open the agency is an error; unreadable fields become
    /// [`Field::NotAvailable`].
    pub fn extract(&self, id: &EntityId) -> Result<EntityRecord, EntityClickFailure> {
        self.clicker
            .click(&Locator::Id(id.as_str().to_owned()))
            .map_err(|source| EntityClickFailure {
                id: id.clone(),
                source,
            })?;

        let detail = self.read_field(id, "details", &self.selectors.detail_block(), false);
        let name = self.read_field(id, "name", &self.selectors.name_heading(), true);
        let record = EntityRecord {
            id: id.clone(),
            name,
            detail,
        };

        if self.go_back(id) == BackNavigation::HistoryFallback {
            warn!("Returned from {id} through history; the listing page may have changed.");
        }
        if let Err(e) = self.listing.wait_for_cards() {
            warn!("The listing did not come back after {id}: {e}");
        }
        Ok(record)
    }

    fn read_field(&self, id: &EntityId, what: &str, locator: &Locator, trim: bool) -> Field {
        let driver = self.clicker.driver();
        let text = driver
            .wait_until_present(locator, self.clicker.timeouts().field)
            .and_then(|element| driver.text_of(&element));
        match text {
            Ok(text) if trim => Field::Value(text.trim().to_owned()),
            Ok(text) => Field::Value(text),
            Err(e) => {
                info!("Could not read the {what} of {id}: {e}");
                Field::NotAvailable
            }
        }
    }

    fn go_back(&self, id: &EntityId) -> BackNavigation {
        match self.clicker.click(&self.selectors.back_link()) {
            Ok(_) => BackNavigation::BackControl,
            Err(e) => {
                warn!("Error navigating back from {id}: {e}");
                if let Err(e) = self.clicker.driver().navigate_back() {
                    debug!("History back navigation failed as well: {e}");
                }
                BackNavigation::HistoryFallback
            }
        }
    }
}
