//! RON run configuration.
//!
//! Every field is optional; durations are whole milliseconds.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use log::LevelFilter;
use serde::{Deserialize, Serialize};
use tender_engine::{ScrapeSettings, SessionSettings};
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "tender.ron";
pub const DEFAULT_OUTPUT_PATH: &str = "tenders.jsonl";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid log level {0:?}")]
    LogLevel(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub portal_url: String,
    pub output_path: PathBuf,
    pub start_page: u32,
    pub end_page: Option<u32>,
    pub per_page_cap: Option<usize>,

    pub headless: bool,
    pub webdriver_url: String,
    pub page_load_timeout_ms: u64,
    pub maximize_window: bool,

    pub card_selector: String,
    pub link_selector: String,
    pub description_selector: String,
    pub pager_selector: String,
    pub page_input_selector: String,

    pub initial_wait_ms: u64,
    pub poll_interval_base_ms: u64,
    pub poll_interval_max_ms: u64,
    pub poll_jitter_ms: u64,
    pub poll_max_wait_ms: u64,
    pub attempt_wait_extension_ms: u64,
    pub max_page_retries: u32,
    pub retry_delay_base_ms: u64,
    pub retry_delay_step_ms: u64,
    pub retry_jitter_ms: (u64, u64),
    pub click_settle_ms: u64,
    pub scroll_repeats: u32,
    pub scroll_pause_ms: u64,
    pub settle_after_nav_ms: u64,
    pub pace_delay_ms: (u64, u64),
    pub cooldown_every: u32,
    pub cooldown_ms: u64,

    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let scrape = ScrapeSettings::default();
        let session = SessionSettings::default();
        Self {
            portal_url: scrape.portal_url,
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            start_page: scrape.start_page,
            end_page: scrape.end_page,
            per_page_cap: scrape.per_page_cap,
            headless: session.headless,
            webdriver_url: session.webdriver_url,
            page_load_timeout_ms: ms(session.page_load_timeout),
            maximize_window: session.maximize_window,
            card_selector: scrape.card_selector,
            link_selector: scrape.link_selector,
            description_selector: scrape.description_selector,
            pager_selector: scrape.pager_selector,
            page_input_selector: scrape.page_input_selector,
            initial_wait_ms: ms(scrape.initial_wait),
            poll_interval_base_ms: ms(scrape.poll_interval_base),
            poll_interval_max_ms: ms(scrape.poll_interval_max),
            poll_jitter_ms: ms(scrape.poll_jitter),
            poll_max_wait_ms: ms(scrape.poll_max_wait),
            attempt_wait_extension_ms: ms(scrape.attempt_wait_extension),
            max_page_retries: scrape.max_page_retries,
            retry_delay_base_ms: ms(scrape.retry_delay_base),
            retry_delay_step_ms: ms(scrape.retry_delay_step),
            retry_jitter_ms: (ms(scrape.retry_jitter.0), ms(scrape.retry_jitter.1)),
            click_settle_ms: ms(scrape.click_settle),
            scroll_repeats: scrape.scroll_repeats,
            scroll_pause_ms: ms(scrape.scroll_pause),
            settle_after_nav_ms: ms(scrape.settle_after_nav),
            pace_delay_ms: (ms(scrape.pace_delay.0), ms(scrape.pace_delay.1)),
            cooldown_every: scrape.cooldown_every,
            cooldown_ms: ms(scrape.cooldown),
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

impl AppConfig {
    pub fn scrape_settings(&self) -> ScrapeSettings {
        ScrapeSettings {
            portal_url: self.portal_url.clone(),
            start_page: self.start_page,
            end_page: self.end_page,
            per_page_cap: self.per_page_cap,
            card_selector: self.card_selector.clone(),
            link_selector: self.link_selector.clone(),
            description_selector: self.description_selector.clone(),
            pager_selector: self.pager_selector.clone(),
            page_input_selector: self.page_input_selector.clone(),
            initial_wait: millis(self.initial_wait_ms),
            poll_interval_base: millis(self.poll_interval_base_ms),
            poll_interval_max: millis(self.poll_interval_max_ms),
            poll_jitter: millis(self.poll_jitter_ms),
            poll_max_wait: millis(self.poll_max_wait_ms),
            attempt_wait_extension: millis(self.attempt_wait_extension_ms),
            max_page_retries: self.max_page_retries,
            retry_delay_base: millis(self.retry_delay_base_ms),
            retry_delay_step: millis(self.retry_delay_step_ms),
            retry_jitter: (millis(self.retry_jitter_ms.0), millis(self.retry_jitter_ms.1)),
            click_settle: millis(self.click_settle_ms),
            scroll_repeats: self.scroll_repeats,
            scroll_pause: millis(self.scroll_pause_ms),
            settle_after_nav: millis(self.settle_after_nav_ms),
            pace_delay: (millis(self.pace_delay_ms.0), millis(self.pace_delay_ms.1)),
            cooldown_every: self.cooldown_every,
            cooldown: millis(self.cooldown_ms),
        }
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            webdriver_url: self.webdriver_url.clone(),
            headless: self.headless,
            page_load_timeout: millis(self.page_load_timeout_ms),
            maximize_window: self.maximize_window,
        }
    }

    pub fn log_level(&self) -> Result<LevelFilter, ConfigError> {
        LevelFilter::from_str(self.log_level.trim())
            .map_err(|_| ConfigError::LogLevel(self.log_level.clone()))
    }
}

/// Reads the config at `path`. A missing file is `Ok(None)`.
pub fn load(path: &Path) -> Result<Option<AppConfig>, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    ron::from_str(&content)
        .map(Some)
        .map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
}

fn ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn millis(value: u64) -> Duration {
    Duration::from_millis(value)
}
