use std::path::PathBuf;

use clap::Parser;
use ea_directory_scraping::converter::{parse_agency_details_file, write_csv, write_xlsx};
use log::info;

/// Converts an `agency_details_*.txt` log into a spreadsheet.
#[derive(Parser)]
struct Opts {
    details_txt: PathBuf,
    /// Written as an `.xlsx` workbook, or as CSV when the extension is `.csv`.
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    let opts = Opts::parse();

    let rows = parse_agency_details_file(&opts.details_txt)?;
    let is_csv = opts
        .output
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if is_csv {
        write_csv(&rows, &opts.output)?;
    } else {
        write_xlsx(&rows, &opts.output)?;
    }
    info!("Wrote {} row(s) to {:?}.", rows.len(), opts.output);
    Ok(())
}
