//! Turns the raw detail log back into rows of `(id, name, address, phone)`.
//!
//! Lines are classified one by one:
//! - `Page <n> - Agency ID: <id>` starts a new agency,
//! - `Agency Name: <name>`,
//! - `Agency Details: Main Branch: <address>` starts the address,
//! - a line of digits only is the phone number,
//! - anything else continues the address until the phone number is found.
//!
//! Agencies missing any of the four values are left out.

use std::path::Path;

use anyhow::Context;
use ea_directory_scraping_utils::regex;
use log::{debug, info};
use rust_xlsxwriter::{Format, Workbook};
use serde::Serialize;

pub const HEADER: [&str; 4] = ["Agency ID", "Agency Name", "Address", "Phone Number"];
const SHEET_NAME: &str = "Agencies";

#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct AgencyRow {
    #[serde(rename = "Agency ID")]
    pub id: String,
    #[serde(rename = "Agency Name")]
    pub name: String,
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "Phone Number")]
    pub phone: String,
}

impl AgencyRow {
    fn cells(&self) -> [&str; 4] {
        [
            self.id.as_str(),
            self.name.as_str(),
            self.address.as_str(),
            self.phone.as_str(),
        ]
    }
}

#[derive(Default)]
struct PartialRow {
    id: Option<String>,
    name: Option<String>,
    address: Option<String>,
    phone: Option<String>,
}

impl PartialRow {
    fn finish(self) -> Option<AgencyRow> {
        let row = AgencyRow {
            id: self.id?,
            name: self.name.filter(|x| !x.is_empty())?,
            address: self.address.filter(|x| !x.is_empty())?,
            phone: self.phone?,
        };
        Some(row)
    }
}

pub fn parse_agency_details(text: &str) -> Vec<AgencyRow> {
    let mut rows = vec![];
    let mut current: Option<PartialRow> = None;
    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            continue;
        }
        if let Some(captures) = regex!(r"^Page \d+ - Agency ID: (.+)$").captures(line) {
            rows.extend(current.take().and_then(PartialRow::finish));
            current = Some(PartialRow {
                id: Some(captures[1].trim().to_owned()),
                ..Default::default()
            });
            continue;
        }
        let Some(row) = current.as_mut() else {
            debug!("Ignoring a line outside of any agency: {line:?}");
            continue;
        };
        if let Some(name) = line.strip_prefix("Agency Name:") {
            row.name = Some(name.trim().to_owned());
        } else if let Some(details) = line.strip_prefix("Agency Details:") {
            if let Some(address) = details.trim().strip_prefix("Main Branch:") {
                row.address = Some(address.trim().to_owned());
            }
        } else if regex!(r"^\d+$").is_match(line) {
            if row.phone.is_none() {
                row.phone = Some(line.to_owned());
            }
        } else if row.phone.is_none() {
            if let Some(address) = row.address.as_mut() {
                address.push(' ');
                address.push_str(line);
            }
        }
    }
    rows.extend(current.and_then(PartialRow::finish));
    rows
}

pub fn parse_agency_details_file(path: &Path) -> anyhow::Result<Vec<AgencyRow>> {
    let text = fs_err::read_to_string(path)?;
    let rows = parse_agency_details(&text);
    info!("Parsed {} agencies from {path:?}.", rows.len());
    Ok(rows)
}

/// Writes a workbook with a single `Agencies` sheet: a bold [`HEADER`] row, then one row per
/// agency.
pub fn write_xlsx(rows: &[AgencyRow], path: &Path) -> anyhow::Result<()> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;
    for (col, title) in (0..).zip(HEADER) {
        worksheet.write_string_with_format(0, col, title, &header_format)?;
    }
    for (row_num, row) in (1..).zip(rows) {
        for (col, value) in (0..).zip(row.cells()) {
            worksheet.write_string(row_num, col, value)?;
        }
    }
    worksheet.autofit();
    workbook
        .save(path)
        .with_context(|| format!("While writing {path:?}"))?;
    Ok(())
}

/// Writes the rows with the header `Agency ID,Agency Name,Address,Phone Number`.
pub fn write_csv(rows: &[AgencyRow], path: &Path) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(fs_err::File::create(path)?);
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .flush()
        .with_context(|| format!("While writing {path:?}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use calamine::{open_workbook, Data, Reader, Xlsx};
    use itertools::Itertools;

    use super::{parse_agency_details, write_csv, write_xlsx, AgencyRow};

    fn row(id: &str, name: &str, address: &str, phone: &str) -> AgencyRow {
        AgencyRow {
            id: id.to_owned(),
            name: name.to_owned(),
            address: address.to_owned(),
            phone: phone.to_owned(),
        }
    }

    #[test]
    fn test_single_block() {
        let text = "Page 3 - Agency ID: abc\n\
                    Agency Name: Foo\n\
                    Agency Details: Main Branch: 1 Road\n\
                    123 Lane\n\
                    91234567\n\
                    \n";
        assert_eq!(
            parse_agency_details(text),
            [row("abc", "Foo", "1 Road 123 Lane", "91234567")]
        );
    }

    #[test]
    fn test_incomplete_blocks_are_dropped() {
        let text = "Page 1 - Agency ID: no-phone\n\
                    Agency Name: Foo\n\
                    Agency Details: Main Branch: 1 Road\n\
                    \n\
                    Page 1 - Agency ID: na\n\
                    Agency Name: N/A\n\
                    Agency Details: N/A\n\
                    \n\
                    Page 2 - Agency ID: ok\n\
                    Agency Name: Bar\n\
                    Agency Details: Main Branch: 2 Street\n\
                    #01-02\n\
                    Singapore 123456\n\
                    61234567\n\
                    Email: bar@example.com\n\
                    62345678\n\
                    \n";
        assert_eq!(
            parse_agency_details(text),
            [row(
                "ok",
                "Bar",
                "2 Street #01-02 Singapore 123456",
                "61234567"
            )]
        );
    }

    #[test]
    fn test_write_xlsx() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agencies.xlsx");
        let rows = parse_agency_details(
            "Page 3 - Agency ID: abc\n\
             Agency Name: Foo\n\
             Agency Details: Main Branch: 1 Road\n\
             123 Lane\n\
             91234567\n\
             \n",
        );
        write_xlsx(&rows, &path).unwrap();

        let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
        let range = workbook.worksheet_range("Agencies").unwrap();
        let cells = range
            .rows()
            .map(|row| {
                row.iter()
                    .map(|cell| match cell {
                        Data::String(s) => s.as_str(),
                        other => panic!("unexpected cell {other:?}"),
                    })
                    .collect_vec()
            })
            .collect_vec();
        assert_eq!(
            cells,
            [
                vec!["Agency ID", "Agency Name", "Address", "Phone Number"],
                vec!["abc", "Foo", "1 Road 123 Lane", "91234567"],
            ]
        );
    }

    #[test]
    fn test_write_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agencies.csv");
        write_csv(
            &[
                row("abc", "Foo", "1 Road 123 Lane", "91234567"),
                row("def", "Bar, Pte. Ltd.", "2 Street", "61234567"),
            ],
            &path,
        )
        .unwrap();
        assert_eq!(
            fs_err::read_to_string(&path).unwrap(),
            "Agency ID,Agency Name,Address,Phone Number\n\
             abc,Foo,1 Road 123 Lane,91234567\n\
             def,\"Bar, Pte. Ltd.\",2 Street,61234567\n"
        );
    }
}
