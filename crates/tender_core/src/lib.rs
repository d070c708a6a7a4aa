//! Tender core: pure data model for the paginated harvest.
//!
//! Nothing in here touches a browser, a clock or a file. The engine owns the
//! side effects and threads these values through explicitly.
mod card;
mod cursor;
mod fingerprint;
mod schedule;
mod seen;
mod stats;

pub use card::{normalize_url_for_dedupe, resolve_card_url, ResultCard};
pub use cursor::PageCursor;
pub use fingerprint::{fingerprint, has_changed, PageFingerprint};
pub use schedule::{confirmation_window, retry_delay, PollIntervals, PollSchedule};
pub use seen::SeenSet;
pub use stats::RunStats;
