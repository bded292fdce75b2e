use std::{collections::HashSet, time::Duration};

use log::{debug, trace};

use crate::driver::{Driver, DriverError, Locator};

/// Identifier of an agency card, as found in its `id` attribute.  Never blank.
#[derive(Clone, PartialEq, Eq, Hash, Debug, derive_more::Display)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        (!id.trim().is_empty()).then_some(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Every identifier enumerated so far in this run.  Only ever grows.
#[derive(Default, Debug)]
pub struct VisitedSet(HashSet<EntityId>);

impl VisitedSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `false` if `id` was already visited.
    fn insert(&mut self, id: EntityId) -> bool {
        self.0.insert(id)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error("No agency card appeared on the page: {0}")]
    NoCards(#[source] DriverError),
    #[error("The agency cards could not be read: {0}")]
    Unreadable(#[source] DriverError),
}

pub struct ListingEnumerator<'d, D> {
    driver: &'d D,
    card: Locator,
    id_attribute: &'d str,
    timeout: Duration,
}

impl<'d, D: Driver> ListingEnumerator<'d, D> {
    pub fn new(driver: &'d D, card: Locator, id_attribute: &'d str, timeout: Duration) -> Self {
        Self {
            driver,
            card,
            id_attribute,
            timeout,
        }
    }

    /// Waits for the cards to be rendered.
    pub fn wait_for_cards(&self) -> Result<(), ListingError> {
        self.driver
            .wait_until_present(&self.card, self.timeout)
            .map(|_| ())
            .map_err(ListingError::NoCards)
    }

    /// Identifiers of the cards on the current page that are not in `visited`, in page order.
    /// They are added to `visited` before being returned.
    pub fn enumerate(&self, visited: &mut VisitedSet) -> Result<Vec<EntityId>, ListingError> {
        self.wait_for_cards()?;
        let cards = self
            .driver
            .locate_all(&self.card)
            .map_err(ListingError::Unreadable)?;
        let mut fresh = vec![];
        for card in &cards {
            let id = match self.driver.attribute_of(card, self.id_attribute) {
                Ok(Some(id)) => id,
                Ok(None) => continue,
                Err(e) => {
                    debug!("Skipping a card whose id could not be read: {e}");
                    continue;
                }
            };
            let Some(id) = EntityId::new(id) else {
                continue;
            };
            if visited.insert(id.clone()) {
                fresh.push(id);
            } else {
                trace!("Already visited: {id}");
            }
        }
        debug!(
            "{} card(s) on the page, {} of them new.",
            cards.len(),
            fresh.len()
        );
        Ok(fresh)
    }
}
