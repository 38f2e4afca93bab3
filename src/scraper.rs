use crate::geocode::{parse_show_pin, Geocode};
use crate::models::{Record, ResultSet, TABLE_COLUMNS};
use anyhow::{anyhow, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Spreadsheet cells overflow at 32,767 characters; stay well below that.
pub const MAX_CELL_CHARS: usize = 32_000;
pub const TRUNCATION_NOTE: &str =
    "... Value is too long, please visit https://skillbridge.osd.mil for more information";

// Cell positions as rendered, before the blank leading cell is dropped.
const CITY_CELL: usize = 3;
const STATE_CELL: usize = 4;
const ZIP_CELL: usize = 5;

/// Rows with this many cells or fewer are the repeated partner sub-headers.
const SUBHEADER_MAX_CELLS: usize = 3;

static TOTAL_ENTRIES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"of\s+([\d,]+)\s+entries").unwrap());

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("directory table `{0}` not found on page")]
    MissingTable(String),

    #[error("could not read total entries from summary: {0:?}")]
    BadSummary(String),

    #[error("timed out after {waited:?} waiting for {what}")]
    Timeout { what: String, waited: Duration },
}

/// Turns one rendered directory page into records.
pub struct RowExtractor {
    table_selector: String,
    table: Selector,
    rows: Selector,
    cells: Selector,
    buttons: Selector,
}

impl RowExtractor {
    pub fn new(table_selector: &str) -> Result<Self> {
        Ok(Self {
            table_selector: table_selector.to_string(),
            table: parse_selector(table_selector)?,
            rows: parse_selector("tbody tr")?,
            cells: parse_selector("td")?,
            buttons: parse_selector("button")?,
        })
    }

    /// Append every data row of the page's directory table to `results`,
    /// returning how many were added.
    pub fn extract_page(&self, html: &str, results: &mut ResultSet) -> Result<usize> {
        let document = Html::parse_document(html);
        let table = document
            .select(&self.table)
            .next()
            .ok_or_else(|| ScrapeError::MissingTable(self.table_selector.clone()))?;

        let mut added = 0;
        for row in table.select(&self.rows) {
            if let Some(record) = self.extract_row(row) {
                results.push_directory(record);
                added += 1;
            }
        }

        debug!(rows = added, "extracted directory page");
        Ok(added)
    }

    fn extract_row(&self, row: ElementRef) -> Option<Record> {
        let cells: Vec<String> = row
            .select(&self.cells)
            .map(|cell| clean_cell_text(&cell.text().collect::<String>()))
            .collect();

        if cells.len() <= SUBHEADER_MAX_CELLS {
            return None;
        }

        let geocode = self.row_geocode(row);
        normalize_row(cells, geocode.as_ref())
    }

    fn row_geocode(&self, row: ElementRef) -> Option<Geocode> {
        let handler = row
            .select(&self.buttons)
            .filter_map(|button| button.value().attr("onclick"))
            .find(|handler| handler.contains("ShowPin("))?;

        match parse_show_pin(handler) {
            Ok(geocode) => Some(geocode),
            Err(e) => {
                warn!(handler, "could not decode map button: {}", e);
                None
            }
        }
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| anyhow!("Invalid selector {:?}: {}", selector, e))
}

/// Strip embedded newlines and cap the length of one cell's text.
pub fn clean_cell_text(text: &str) -> String {
    truncate_cell(text.replace('\n', ""))
}

pub fn truncate_cell(text: String) -> String {
    match text.char_indices().nth(MAX_CELL_CHARS) {
        Some((cut, _)) => format!("{}{}", &text[..cut], TRUNCATION_NOTE),
        None => text,
    }
}

/// Realign a data row's cells into the output columns.
///
/// The decoded zip goes in only when the geocode's city and state agree
/// with the row's own cells. The leading blank cell is dropped, the table
/// part is padded or cut to its fixed width, and lat/long close the record.
pub fn normalize_row(mut cells: Vec<String>, geocode: Option<&Geocode>) -> Option<Record> {
    if cells.len() <= SUBHEADER_MAX_CELLS {
        return None;
    }

    let zip = match geocode {
        Some(g) if g.matches(cell(&cells, CITY_CELL), cell(&cells, STATE_CELL)) => {
            g.zip_or_empty().to_string()
        }
        _ => String::new(),
    };

    if cells.len() < ZIP_CELL {
        cells.resize(ZIP_CELL, String::new());
    }
    cells.insert(ZIP_CELL, zip);
    cells.remove(0);

    if cells.len() > TABLE_COLUMNS {
        warn!(
            cells = cells.len(),
            expected = TABLE_COLUMNS,
            "row has more cells than expected, extra cells dropped"
        );
    }
    cells.resize(TABLE_COLUMNS, String::new());

    let (lat, long) = geocode
        .map(|g| (g.lat.clone(), g.long.clone()))
        .unwrap_or_default();
    cells.push(lat);
    cells.push(long);

    let columns: [String; 21] = cells.try_into().ok()?;
    Some(Record::from_columns(columns))
}

fn cell(cells: &[String], index: usize) -> &str {
    cells.get(index).map(String::as_str).unwrap_or("")
}

/// Read Y out of a "Showing 1 to 10 of Y entries" summary.
pub fn parse_total_entries(summary: &str) -> Result<usize, ScrapeError> {
    TOTAL_ENTRIES_RE
        .captures(summary)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().replace(',', "").parse::<usize>().ok())
        .ok_or_else(|| ScrapeError::BadSummary(summary.to_string()))
}
