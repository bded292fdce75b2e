use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use ea_directory_scraping::{
    config::ScraperConfig,
    page::PageRange,
    run::{scrape, EndReason},
};
use ea_directory_scraping_utils::fs_toml_util::read_toml_or_default;
use log::{info, warn};

/// Scrapes the Employment Agency directory from START_PAGE to END_PAGE (inclusive).
#[derive(Parser)]
struct Opts {
    start_page: u32,
    end_page: u32,
    /// TOML file overriding selectors, timeouts and browser options.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory under which `Scraper_<start>_<end>` is created.
    #[arg(long, default_value = ".")]
    output_root: PathBuf,
    /// Show the browser window.
    #[arg(long)]
    headful: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_timestamp_millis()
        .init();
    let opts = Opts::parse();

    let mut config: ScraperConfig =
        read_toml_or_default(opts.config.as_ref()).context("While loading the config")?;
    if opts.headful {
        config.browser.headless = false;
    }
    let range = PageRange::new(opts.start_page, opts.end_page)?;

    let summary = scrape(range, &config, &opts.output_root)
        .with_context(|| format!("While scraping pages {} to {}", range.start(), range.end()))?;
    info!(
        "Pages processed: {}, ids recorded: {}, records written: {}, agencies skipped: {}",
        summary.pages_processed.len(),
        summary.ids_recorded,
        summary.records_written,
        summary.entities_skipped,
    );
    match summary.end {
        EndReason::Completed => info!("Reached the end page."),
        EndReason::NoFurtherPages { after } => {
            warn!("Stopped after page {after}: there was no further page.")
        }
        EndReason::PageUnreadable { page } => {
            warn!("Stopped at page {page}: its agencies could not be read.")
        }
    }
    Ok(())
}
