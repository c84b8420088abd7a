//! Flat records projected from feed entries.

use crate::error::{FeedError, Result};
use crate::feed::FeedEntry;

/// Column headers, in row order.
pub const HEADER: [&str; 3] = ["Title", "Link", "Notified"];

/// One alert as written to the sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub title: String,
    pub link: String,
    pub notified: String,
}

impl Record {
    /// Cell values in [`HEADER`] order.
    pub fn cells(&self) -> [&str; 3] {
        [&self.title, &self.link, &self.notified]
    }
}

/// Map every entry to a [`Record`], keeping feed order.
///
/// Values are copied as-is. An entry without a title, link or description
/// fails the whole extraction.
pub fn extract_records(entries: &[FeedEntry]) -> Result<Vec<Record>> {
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let field = |value: &Option<String>, field: &'static str| {
                value
                    .clone()
                    .ok_or(FeedError::MissingField { index, field })
            };
            Ok(Record {
                title: field(&entry.title, "title")?,
                link: field(&entry.link, "link")?,
                notified: field(&entry.description, "description")?,
            })
        })
        .collect()
}
