use std::path::{Path, PathBuf};

/// 1-based page number of the paginated listing.
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Debug,
    derive_more::Display,
)]
pub struct PageIndex(u32);

impl PageIndex {
    pub const FIRST: Self = Self(1);

    pub fn new(page: u32) -> Option<Self> {
        (page >= 1).then_some(Self(page))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Closed page range `[start, end]` a run is responsible for.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PageRange {
    start: PageIndex,
    end: PageIndex,
}

#[derive(Debug, thiserror::Error)]
pub enum PageRangeError {
    #[error("Pages are 1-based, but the start page was {0}")]
    ZeroStart(u32),
    #[error("The end page {end} is before the start page {start}")]
    Reversed { start: u32, end: u32 },
}

impl PageRange {
    pub fn new(start: u32, end: u32) -> Result<Self, PageRangeError> {
        let start_index = PageIndex::new(start).ok_or(PageRangeError::ZeroStart(start))?;
        if end < start {
            return Err(PageRangeError::Reversed { start, end });
        }
        Ok(Self {
            start: start_index,
            end: PageIndex(end),
        })
    }

    pub fn start(&self) -> PageIndex {
        self.start
    }

    pub fn end(&self) -> PageIndex {
        self.end
    }

    pub fn output_dir(&self, root: &Path) -> PathBuf {
        root.join(format!("Scraper_{}_{}", self.start, self.end))
    }

    pub fn ledger_file_name(&self) -> String {
        format!("agency_ids_{}_{}.txt", self.start, self.end)
    }

    pub fn details_file_name(&self) -> String {
        format!("agency_details_{}_{}.txt", self.start, self.end)
    }
}
