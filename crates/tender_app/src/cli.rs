//! Command line: where the config lives plus a few per-run overrides.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{AppConfig, DEFAULT_CONFIG_PATH};

#[derive(Debug, Parser)]
#[command(name = "tender_app", about = "Harvest procurement search results into JSONL")]
#[command(version)]
pub struct Cli {
    /// Path to the RON config file. A missing file means defaults.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// First page to collect.
    #[arg(long)]
    pub start_page: Option<u32>,

    /// Last page to collect, inclusive.
    #[arg(long, conflicts_with = "open_ended")]
    pub end_page: Option<u32>,

    /// Keep going until the portal runs out of pages.
    #[arg(long)]
    pub open_ended: bool,

    /// Run the browser without a window.
    #[arg(long)]
    pub headless: bool,

    /// JSONL file to append to.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl Cli {
    /// Command line values win over the config file.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(start) = self.start_page {
            config.start_page = start;
        }
        if let Some(end) = self.end_page {
            config.end_page = Some(end);
        }
        if self.open_ended {
            config.end_page = None;
        }
        if self.headless {
            config.headless = true;
        }
        if let Some(output) = &self.output {
            config.output_path = output.clone();
        }
    }
}
