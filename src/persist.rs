//! Append-only raw text output of a run.
//!
//! Both files are opened in append mode for every write, so whatever was written before a
//! crash stays valid, and re-running the same range accumulates into the same files.

use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};

use fs_err::OpenOptions;
use itertools::Itertools;
use log::debug;

use crate::{
    detail::EntityRecord,
    listing::EntityId,
    page::{PageIndex, PageRange},
};

pub struct RecordPersister {
    ledger_path: PathBuf,
    details_path: PathBuf,
}

impl RecordPersister {
    /// Creates `Scraper_<start>_<end>` under `root` if needed.
    pub fn create(root: &Path, range: &PageRange) -> io::Result<Self> {
        let dir = range.output_dir(root);
        fs_err::create_dir_all(&dir)?;
        Ok(Self {
            ledger_path: dir.join(range.ledger_file_name()),
            details_path: dir.join(range.details_file_name()),
        })
    }

    pub fn ledger_path(&self) -> &Path {
        &self.ledger_path
    }

    pub fn details_path(&self) -> &Path {
        &self.details_path
    }

    /// Writes `Page <n>: <id>,<id>,...`.  Nothing is written for an empty page.
    pub fn append_ids(&self, page: PageIndex, ids: &[EntityId]) -> io::Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        debug!("Recording {} id(s) of page {page}.", ids.len());
        append(
            &self.ledger_path,
            &format!("Page {page}: {}\n", ids.iter().join(",")),
        )
    }

    pub fn append_record(&self, page: PageIndex, record: &EntityRecord) -> io::Result<()> {
        append(&self.details_path, &format_record(page, record))
    }
}

fn format_record(page: PageIndex, record: &EntityRecord) -> String {
    format!(
        "Page {page} - Agency ID: {}\nAgency Name: {}\nAgency Details: {}\n\n",
        record.id, record.name, record.detail
    )
}

fn append(path: &Path, text: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(text.as_bytes())?;
    file.flush()
}
