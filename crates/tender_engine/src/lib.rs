//! Tender engine: browser session, shadow-DOM traversal, pagination and output.
mod clock;
mod collect;
mod error;
mod events;
mod paginate;
mod parse;
mod run;
pub mod scripts;
mod session;
mod settings;
mod sink;
mod traverse;
mod webdriver;

pub use clock::{Clock, Pacer, SystemClock};
pub use collect::{Harvest, RecordCollector};
pub use error::{AbortError, PageError, SettingsError, SinkError};
pub use events::{EventSink, NullEventSink, RunEvent};
pub use paginate::{Baseline, NavOutcome, NavState, PaginationDriver, Strategy};
pub use parse::CardParser;
pub use run::{RunController, RunEnd, RunReport, Timestamp};
pub use session::{BrowserSession, ElementRef, ScriptArg, ScriptValue, SessionError};
pub use settings::{
    ScrapeSettings, DEFAULT_CARD_SELECTOR, DEFAULT_DESCRIPTION_SELECTOR, DEFAULT_LINK_SELECTOR,
    DEFAULT_PAGER_SELECTOR, DEFAULT_PAGE_INPUT_SELECTOR, DEFAULT_PORTAL_URL,
};
pub use sink::{prepare_output_dir, JsonlSink, OutputRecord, RecordSink};
pub use traverse::ShadowTraverser;
pub use webdriver::{SessionSettings, WebDriverSession};
