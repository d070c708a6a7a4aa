use thiserror::Error;

/// Opaque handle to an element the session has handed out.
///
/// Handles are only meaningful to the session that produced them and may go
/// stale once the page re-renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementRef(u64);

impl ElementRef {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

/// Argument passed to an injected script as `arguments[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptArg {
    Null,
    Text(String),
    Element(ElementRef),
}

impl From<Option<ElementRef>> for ScriptArg {
    fn from(value: Option<ElementRef>) -> Self {
        match value {
            Some(element) => ScriptArg::Element(element),
            None => ScriptArg::Null,
        }
    }
}

/// Value returned by an injected script.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    Null,
    Bool(bool),
    Text(String),
    Element(ElementRef),
    Elements(Vec<ElementRef>),
    Json(serde_json::Value),
}

impl ScriptValue {
    pub fn into_elements(self) -> Vec<ElementRef> {
        match self {
            ScriptValue::Elements(elements) => elements,
            ScriptValue::Element(element) => vec![element],
            _ => Vec::new(),
        }
    }

    pub fn into_element(self) -> Option<ElementRef> {
        match self {
            ScriptValue::Element(element) => Some(element),
            ScriptValue::Elements(elements) => elements.into_iter().next(),
            _ => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            ScriptValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("script execution blocked: {0}")]
    ScriptBlocked(String),
    /// The script ran but threw, timed out or was interrupted by a dialog.
    #[error("script failed: {0}")]
    ScriptFailed(String),
    #[error("stale element: {0}")]
    StaleElement(String),
    #[error("interaction failed: {0}")]
    Interaction(String),
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("webdriver error: {0}")]
    Driver(String),
}

impl SessionError {
    /// Stale handles, refused clicks and failing scripts are part of normal
    /// page churn.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SessionError::StaleElement(_)
                | SessionError::Interaction(_)
                | SessionError::ScriptFailed(_)
        )
    }
}

/// The browser capabilities the scraper relies on.
///
/// Everything the engine knows about the page goes through `execute_script`;
/// the remaining methods are the native interaction primitives.
pub trait BrowserSession {
    fn navigate_to(&mut self, url: &str) -> Result<(), SessionError>;

    fn current_url(&mut self) -> Result<String, SessionError>;

    fn execute_script(
        &mut self,
        script: &str,
        args: &[ScriptArg],
    ) -> Result<ScriptValue, SessionError>;

    fn click(&mut self, element: ElementRef) -> Result<(), SessionError>;

    fn clear(&mut self, element: ElementRef) -> Result<(), SessionError>;

    fn send_keys(&mut self, element: ElementRef, text: &str) -> Result<(), SessionError>;

    fn press_enter(&mut self, element: ElementRef) -> Result<(), SessionError>;

    /// Drop cached element handles. Called between pages.
    fn release_elements(&mut self) {}
}
