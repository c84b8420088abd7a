//! Command-line interface.

use clap::Parser;

use crate::countries::{self, ALL};
use crate::pipeline::{self, RunConfig};
use crate::report::Reporter;

/// Fetch RASFF notifications from the RSS feed and append them to an xlsx workbook.
#[derive(Parser, Debug)]
#[command(name = "rasff")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Country code for the RSS feed (see --list-countries)
    #[arg(long, value_name = "CODE", default_value = ALL)]
    pub country: String,

    /// List the country codes and exit
    #[arg(long)]
    pub list_countries: bool,
}

impl Cli {
    pub fn run_config(&self) -> RunConfig {
        RunConfig::new(self.country.clone())
    }
}

/// Run the CLI.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.list_countries {
        print!("{}", countries::render_table());
        return Ok(());
    }

    let today = chrono::Local::now().date_naive();
    let mut reporter = Reporter::stdout();
    pipeline::run(&cli.run_config(), today, &mut reporter)?;
    Ok(())
}
