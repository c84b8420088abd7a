//! Console output of a run.

use std::io::{self, Stdout, Write};
use std::path::Path;

use crate::record::Record;

/// Closing line of every successful run.
pub const ATTRIBUTION: &str = "Consulta RASFF, Carlos Simoes & OpenAI, Abril 2024";

/// Echoes records as they are written, then the completion lines.
pub struct Reporter<W: Write> {
    out: W,
}

impl Reporter<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn record(&mut self, record: &Record) -> io::Result<()> {
        writeln!(
            self.out,
            "Title: {}, Link: {}, Notified: {}",
            record.title, record.link, record.notified
        )
    }

    pub fn finished(&mut self, output: &Path) -> io::Result<()> {
        writeln!(self.out, "RSS feed data has been written to {}", output.display())?;
        writeln!(self.out, "{ATTRIBUTION}")?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
