//! The run itself: fetch, extract, append a dated sheet, save.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rasff_core::{DEFAULT_SHEET_TITLE, Workbook};
use tracing::{debug, info, warn};

use crate::countries;
use crate::feed::{self, RASFF_FEED_BASE};
use crate::record::{HEADER, Record, extract_records};
use crate::report::Reporter;

/// Everything a run needs, resolved once from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Jurisdiction code, used verbatim in the URL and the file name.
    pub country: String,
    pub feed_base: String,
    /// Directory of the output workbook; empty means the working directory.
    pub output_dir: PathBuf,
}

impl RunConfig {
    pub fn new(country: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            feed_base: RASFF_FEED_BASE.to_string(),
            output_dir: PathBuf::new(),
        }
    }

    pub fn feed_url(&self) -> String {
        feed::feed_url(&self.feed_base, &self.country)
    }

    /// `notifications-{country}.xlsx` inside the output directory.
    pub fn output_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("notifications-{}.xlsx", self.country))
    }
}

/// Title of the sheet a run on `date` appends.
pub fn sheet_title(date: NaiveDate) -> String {
    format!("Notifications_{}", date.format("%Y%m%d"))
}

/// Fetch the feed for `config.country` and append it to the workbook as a
/// sheet for `today`. Returns the path of the saved workbook.
pub fn run<W: Write>(config: &RunConfig, today: NaiveDate, reporter: &mut Reporter<W>) -> Result<PathBuf> {
    if !countries::is_known_code(&config.country) {
        warn!(country = %config.country, "Not a known RASFF country code, fetching anyway");
    }

    let url = config.feed_url();
    info!(%url, "Fetching feed");
    let client = feed::create_client()?;
    let feed = feed::fetch_feed(&client, &url)?;
    if let Some(err) = &feed.parse_error {
        warn!(%url, error = %err, "Feed could not be parsed, continuing without entries");
    }
    info!(entries = feed.entries.len(), title = ?feed.title, "Feed parsed");

    let records = extract_records(&feed.entries)?;

    let path = config.output_path();
    let sheet = write_records(&path, &records, today, reporter)?;
    info!(path = %path.display(), %sheet, rows = records.len(), "Workbook saved");

    reporter.finished(&path)?;
    Ok(path)
}

/// Append a sheet holding the header and `records` to the workbook at
/// `path`, echoing each record, and save. Returns the sheet's title.
pub fn write_records<W: Write>(
    path: &Path,
    records: &[Record],
    today: NaiveDate,
    reporter: &mut Reporter<W>,
) -> Result<String> {
    let mut book = open_or_create(path)?;

    let sheet = book.add_worksheet(&sheet_title(today))?;
    book.append_row(HEADER)?;
    for record in records {
        book.append_row(record.cells())?;
        reporter.record(record)?;
    }

    book.save(path)?;
    Ok(sheet)
}

/// Load the workbook at `path`, or start one without any sheets.
///
/// An existing file that is not a readable workbook is replaced by a new,
/// empty workbook; one that cannot be opened at all is an error.
pub fn open_or_create(path: &Path) -> Result<Workbook> {
    if !path.exists() {
        debug!(path = %path.display(), "No workbook yet, creating one");
        return empty_workbook();
    }

    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    match Workbook::from_reader(file) {
        Ok(book) => {
            debug!(path = %path.display(), "Loaded existing workbook");
            Ok(book)
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                error = %format!("{err:#}"),
                "Existing file is not a valid workbook, starting a new one"
            );
            empty_workbook()
        }
    }
}

fn empty_workbook() -> Result<Workbook> {
    let mut book = Workbook::new();
    book.remove_sheet(DEFAULT_SHEET_TITLE)?;
    Ok(book)
}
