//! rasff-xlsx: RASFF food-safety alerts into a dated xlsx sheet.
//!
//! One run fetches the consumer feed for a jurisdiction, turns each entry into
//! a [`record::Record`], appends a `Notifications_YYYYMMDD` sheet to
//! `notifications-{code}.xlsx` and echoes every record to the console.

pub mod cli;
pub mod countries;
pub mod error;
pub mod feed;
pub mod pipeline;
pub mod record;
pub mod report;

pub use error::FeedError;
pub use pipeline::{RunConfig, run};
