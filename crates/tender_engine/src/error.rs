use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::session::SessionError;

/// Why a page could not be reached or harvested.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageError {
    #[error("execution blocked: {0}")]
    ExecutionBlocked(String),
    #[error("no pagination control for page {page}")]
    ControlNotFound { page: u32 },
    #[error("page {page} did not change within {waited:?}")]
    ConfirmationTimeout { page: u32, waited: Duration },
    #[error("no result cards on page {page}")]
    EmptyPage { page: u32 },
    #[error("browser session failed: {0}")]
    Session(SessionError),
}

impl PageError {
    /// Fatal errors end the run at once; the rest count against the page's retry budget.
    pub fn is_fatal(&self) -> bool {
        match self {
            PageError::ExecutionBlocked(_) => true,
            PageError::Session(err) => !err.is_transient(),
            _ => false,
        }
    }
}

impl From<SessionError> for PageError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::ScriptBlocked(message) => PageError::ExecutionBlocked(message),
            other => PageError::Session(other),
        }
    }
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("output directory {path:?} unusable: {message}")]
    OutputDir { path: PathBuf, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("invalid page range: {0}")]
    PageRange(String),
    #[error("invalid selector {selector:?}: {message}")]
    Selector { selector: String, message: String },
    #[error("invalid portal url {url:?}: {message}")]
    PortalUrl { url: String, message: String },
    #[error("invalid setting: {0}")]
    Value(String),
}

/// Ends a run early without a graceful halt.
#[derive(Debug, Error)]
pub enum AbortError {
    #[error(transparent)]
    Page(#[from] PageError),
    #[error("output sink failed: {0}")]
    Sink(#[from] SinkError),
}

/// Maps a session error on an optional step: transient failures become `None`.
pub(crate) fn soften<T>(result: Result<T, SessionError>) -> Result<Option<T>, PageError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_transient() => Ok(None),
        Err(err) => Err(err.into()),
    }
}
