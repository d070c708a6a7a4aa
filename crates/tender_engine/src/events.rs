use std::time::Duration;

use tender_core::RunStats;

use crate::error::PageError;
use crate::paginate::Strategy;

/// Structured progress reported by the run; formatting is up to the receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    RunStarted {
        portal_url: String,
        start_page: u32,
        end_page: Option<u32>,
    },
    PageReached {
        page: u32,
        attempts: u32,
        strategy: Option<Strategy>,
    },
    NavigationFailed {
        page: u32,
        attempt: u32,
        error: PageError,
    },
    EmptyPage {
        page: u32,
        attempt: u32,
    },
    PageSkipped {
        page: u32,
    },
    RecordsCollected {
        page: u32,
        new_rows: usize,
        duplicates: usize,
        total_rows: u64,
    },
    Cooldown {
        after_pages: u32,
        duration: Duration,
    },
    RunHalted {
        page: u32,
        error: PageError,
    },
    RunAborted {
        page: u32,
        reason: String,
    },
    RunFinished {
        stats: RunStats,
    },
}

pub trait EventSink {
    fn emit(&self, event: RunEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&self, _event: RunEvent) {}
}
