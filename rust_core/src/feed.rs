//! Distributor stock feed loader.
//!
//! The distributor publishes a zip archive holding a single spreadsheet. The
//! first worksheet has a preamble, then a header row naming the columns, then
//! one row per watch.

use crate::error::{Result, SyncError};
use crate::models::FeedRecord;
use async_trait::async_trait;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use reqwest::Client;
use std::io::{Cursor, Read};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_FEED_URL: &str = "https://timeworld.ru/upload/files/ostatki.zip";
pub const DEFAULT_FEED_ENTRY: &str = "ostatki.xls";
/// 0-based index of the header row in the worksheet
pub const DEFAULT_HEADER_ROW: usize = 17;

pub const CODE_COLUMN: &str = "Код";
pub const QUANTITY_COLUMN: &str = "Количество";
pub const PRICE_COLUMN: &str = "Цена";

/// Anything that can produce the current feed.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn load(&self) -> Result<Vec<FeedRecord>>;
}

#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub url: String,
    /// Name of the spreadsheet inside the archive
    pub entry: String,
    pub header_row: usize,
    pub timeout: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_FEED_URL.to_string(),
            entry: DEFAULT_FEED_ENTRY.to_string(),
            header_row: DEFAULT_HEADER_ROW,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Downloads and parses the zipped spreadsheet over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFeedLoader {
    client: Client,
    config: FeedConfig,
}

impl HttpFeedLoader {
    pub fn new(config: FeedConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    async fn download(&self) -> Result<Vec<u8>> {
        debug!("Downloading stock feed from {}", self.config.url);
        let response = self.client.get(&self.config.url).send().await?;
        let response = response.error_for_status()?;
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl FeedSource for HttpFeedLoader {
    async fn load(&self) -> Result<Vec<FeedRecord>> {
        let archive = self.download().await?;
        let records = parse_archive(&archive, &self.config.entry, self.config.header_row)?;
        info!("Loaded {} feed records", records.len());
        Ok(records)
    }
}

/// Extract `entry` from a zip archive and parse it as a spreadsheet.
pub fn parse_archive(archive: &[u8], entry: &str, header_row: usize) -> Result<Vec<FeedRecord>> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive))?;
    let mut file = zip.by_name(entry)?;
    let mut workbook = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut workbook)?;
    parse_workbook(workbook, header_row)
}

/// Parse the first worksheet of an xls/xlsx workbook.
pub fn parse_workbook(workbook: Vec<u8>, header_row: usize) -> Result<Vec<FeedRecord>> {
    let mut sheets = open_workbook_auto_from_rs(Cursor::new(workbook))?;
    let range = sheets
        .worksheet_range_at(0)
        .ok_or(SyncError::EmptyFeed)??;

    // calamine ranges begin at the first used cell, not at sheet row 0
    let header_offset = header_row
        .checked_sub(first_used_row(range.start()))
        .ok_or_else(|| SyncError::MissingColumn(CODE_COLUMN.to_string()))?;

    let rows = range
        .rows()
        .map(|row| row.iter().map(render_cell).collect::<Vec<String>>());
    parse_rows(rows, header_offset)
}

fn first_used_row(start: Option<(u32, u32)>) -> usize {
    start.map_or(0, |(row, _)| row as usize)
}

/// Map worksheet rows to records using the header found at `header_row`.
///
/// Rows before the header are ignored, as are rows with no code, quantity or
/// price.
pub fn parse_rows<I>(rows: I, header_row: usize) -> Result<Vec<FeedRecord>>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut rows = rows.into_iter().skip(header_row);
    let header = rows
        .next()
        .ok_or_else(|| SyncError::MissingColumn(CODE_COLUMN.to_string()))?;

    let column = |name: &str| {
        header
            .iter()
            .position(|cell| cell.trim() == name)
            .ok_or_else(|| SyncError::MissingColumn(name.to_string()))
    };
    let code_idx = column(CODE_COLUMN)?;
    let quantity_idx = column(QUANTITY_COLUMN)?;
    let price_idx = column(PRICE_COLUMN)?;

    let cell = |row: &[String], idx: usize| row.get(idx).cloned().unwrap_or_default();

    Ok(rows
        .map(|row| FeedRecord {
            code: cell(row.as_slice(), code_idx),
            quantity: cell(row.as_slice(), quantity_idx),
            price: cell(row.as_slice(), price_idx),
        })
        .filter(|r| !(r.code.is_empty() && r.quantity.is_empty() && r.price.is_empty()))
        .collect())
}

/// Render a cell the way the feed's codes and quantities are written.
///
/// Integral floats lose their fractional part so a numeric code `12345.0`
/// matches the listing `"12345"`.
fn render_cell(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
