use std::time::Duration;

use tender_core::{PageCursor, PollSchedule};
use url::Url;

use crate::error::SettingsError;
use crate::parse::parse_selector;

pub const DEFAULT_PORTAL_URL: &str = "https://purchasing.alberta.ca/search";
pub const DEFAULT_CARD_SELECTOR: &str =
    "apc-opportunity-search-result, .result-item, li.result, div.search-result";
pub const DEFAULT_LINK_SELECTOR: &str = "a[href^='/posting/']";
pub const DEFAULT_DESCRIPTION_SELECTOR: &str =
    "span.search-result__description, .result-description, .summary, .teaser";
pub const DEFAULT_PAGER_SELECTOR: &str =
    "apc-paginator, .pagination, nav[aria-label='pagination'], .paginator, .mat-paginator";
pub const DEFAULT_PAGE_INPUT_SELECTOR: &str = "apc-paginator input[aria-label='Page Number'], input[aria-label='Page number'], input[type='number']";

/// Everything the run needs to know about the portal and its pacing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeSettings {
    pub portal_url: String,
    pub start_page: u32,
    /// `None` keeps going until pagination fails.
    pub end_page: Option<u32>,
    pub per_page_cap: Option<usize>,

    pub card_selector: String,
    pub link_selector: String,
    pub description_selector: String,
    pub pager_selector: String,
    pub page_input_selector: String,

    pub initial_wait: Duration,
    pub poll_interval_base: Duration,
    pub poll_interval_max: Duration,
    pub poll_jitter: Duration,
    pub poll_max_wait: Duration,
    pub attempt_wait_extension: Duration,
    pub max_page_retries: u32,
    pub retry_delay_base: Duration,
    pub retry_delay_step: Duration,
    pub retry_jitter: (Duration, Duration),
    pub click_settle: Duration,

    pub scroll_repeats: u32,
    pub scroll_pause: Duration,
    pub settle_after_nav: Duration,
    pub pace_delay: (Duration, Duration),
    pub cooldown_every: u32,
    pub cooldown: Duration,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            portal_url: DEFAULT_PORTAL_URL.to_string(),
            start_page: 1,
            end_page: None,
            per_page_cap: None,
            card_selector: DEFAULT_CARD_SELECTOR.to_string(),
            link_selector: DEFAULT_LINK_SELECTOR.to_string(),
            description_selector: DEFAULT_DESCRIPTION_SELECTOR.to_string(),
            pager_selector: DEFAULT_PAGER_SELECTOR.to_string(),
            page_input_selector: DEFAULT_PAGE_INPUT_SELECTOR.to_string(),
            initial_wait: Duration::from_secs(35),
            poll_interval_base: Duration::from_millis(300),
            poll_interval_max: Duration::from_secs(2),
            poll_jitter: Duration::from_millis(150),
            poll_max_wait: Duration::from_secs(35),
            attempt_wait_extension: Duration::from_secs(5),
            max_page_retries: 5,
            retry_delay_base: Duration::from_millis(700),
            retry_delay_step: Duration::from_millis(1_200),
            retry_jitter: (Duration::from_millis(200), Duration::from_millis(800)),
            click_settle: Duration::from_millis(100),
            scroll_repeats: 4,
            scroll_pause: Duration::from_millis(300),
            settle_after_nav: Duration::from_millis(800),
            pace_delay: (Duration::from_millis(100), Duration::from_millis(500)),
            cooldown_every: 25,
            cooldown: Duration::from_secs(10),
        }
    }
}

impl ScrapeSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.cursor()?;
        self.base_url()?;
        for selector in [
            &self.card_selector,
            &self.link_selector,
            &self.description_selector,
            &self.pager_selector,
            &self.page_input_selector,
        ] {
            parse_selector(selector)?;
        }
        if self.max_page_retries == 0 {
            return Err(SettingsError::Value("max_page_retries must be at least 1".into()));
        }
        if self.pace_delay.0 > self.pace_delay.1 {
            return Err(SettingsError::Value("pace_delay minimum exceeds maximum".into()));
        }
        if self.retry_jitter.0 > self.retry_jitter.1 {
            return Err(SettingsError::Value("retry_jitter minimum exceeds maximum".into()));
        }
        if self.poll_interval_base.is_zero() {
            return Err(SettingsError::Value("poll_interval_base must be positive".into()));
        }
        Ok(())
    }

    pub fn cursor(&self) -> Result<PageCursor, SettingsError> {
        PageCursor::new(self.start_page, self.end_page).ok_or_else(|| {
            SettingsError::PageRange(format!(
                "start {} end {:?}",
                self.start_page, self.end_page
            ))
        })
    }

    pub fn base_url(&self) -> Result<Url, SettingsError> {
        Url::parse(&self.portal_url).map_err(|err| SettingsError::PortalUrl {
            url: self.portal_url.clone(),
            message: err.to_string(),
        })
    }

    pub fn poll_schedule(&self) -> PollSchedule {
        PollSchedule::new(self.poll_interval_base, self.poll_interval_max)
    }
}
