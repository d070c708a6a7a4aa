use std::collections::HashMap;
use std::time::Duration;

use engine_logging::{engine_debug, engine_warn};
use serde_json::Value;
use thirtyfour::error::WebDriverError;
use thirtyfour::prelude::*;
use thirtyfour::session::scriptret::ScriptRet;
use tokio::runtime::Runtime;

use crate::session::{BrowserSession, ElementRef, ScriptArg, ScriptValue, SessionError};

/// Key of a W3C WebDriver element reference object.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f413bc8ab43";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// geckodriver endpoint.
    pub webdriver_url: String,
    pub headless: bool,
    pub page_load_timeout: Duration,
    pub maximize_window: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:4444".to_string(),
            headless: false,
            page_load_timeout: Duration::from_secs(60),
            maximize_window: true,
        }
    }
}

struct CachedElement {
    element: WebElement,
    reference: Value,
}

/// Firefox over WebDriver, driven synchronously.
///
/// The session owns a current-thread runtime and blocks on every call. The
/// browser is closed when the session is dropped.
pub struct WebDriverSession {
    runtime: Runtime,
    driver: Option<WebDriver>,
    elements: Vec<CachedElement>,
    index: HashMap<String, ElementRef>,
}

impl WebDriverSession {
    pub fn launch(settings: &SessionSettings) -> Result<Self, SessionError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| SessionError::Driver(err.to_string()))?;

        let driver = runtime
            .block_on(async {
                let mut caps = DesiredCapabilities::firefox();
                if settings.headless {
                    caps.set_headless()?;
                }
                let driver = WebDriver::new(&settings.webdriver_url, caps).await?;
                driver.set_page_load_timeout(settings.page_load_timeout).await?;
                if settings.maximize_window {
                    if let Err(err) = driver.maximize_window().await {
                        engine_debug!("maximize window failed: {}", err);
                    }
                }
                Ok::<_, WebDriverError>(driver)
            })
            .map_err(|err| SessionError::Driver(err.to_string()))?;

        Ok(Self {
            runtime,
            driver: Some(driver),
            elements: Vec::new(),
            index: HashMap::new(),
        })
    }

    /// Closes the browser now instead of on drop.
    pub fn quit(mut self) -> Result<(), SessionError> {
        match self.driver.take() {
            Some(driver) => self
                .runtime
                .block_on(driver.quit())
                .map_err(|err| SessionError::Driver(err.to_string())),
            None => Ok(()),
        }
    }

    fn driver(&self) -> Result<&WebDriver, SessionError> {
        self.driver
            .as_ref()
            .ok_or_else(|| SessionError::Driver("session already closed".to_string()))
    }

    fn element(&self, handle: ElementRef) -> Result<&CachedElement, SessionError> {
        self.elements
            .get(handle.id() as usize)
            .ok_or_else(|| SessionError::StaleElement(format!("unknown handle {}", handle.id())))
    }

    fn remember(&mut self, element: WebElement, reference: Value) -> ElementRef {
        let key = reference
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| reference.to_string());
        if let Some(existing) = self.index.get(&key) {
            return *existing;
        }
        let handle = ElementRef::new(self.elements.len() as u64);
        self.elements.push(CachedElement { element, reference });
        self.index.insert(key, handle);
        handle
    }

    fn encode_arg(&self, arg: &ScriptArg) -> Result<Value, SessionError> {
        Ok(match arg {
            ScriptArg::Null => Value::Null,
            ScriptArg::Text(text) => Value::String(text.clone()),
            ScriptArg::Element(handle) => self.element(*handle)?.reference.clone(),
        })
    }

    fn decode(&mut self, ret: ScriptRet) -> Result<ScriptValue, SessionError> {
        let json = ret.json().clone();
        match shape_of(&json) {
            ReturnShape::Plain(value) => Ok(value),
            ReturnShape::Elements => {
                let references = json.as_array().cloned().unwrap_or_default();
                let elements = ret
                    .elements()
                    .map_err(|err| classify(err, SessionError::ScriptFailed))?;
                let handles = elements
                    .into_iter()
                    .zip(references)
                    .map(|(element, reference)| self.remember(element, reference))
                    .collect();
                Ok(ScriptValue::Elements(handles))
            }
            ReturnShape::Element => {
                let element = ret
                    .element()
                    .map_err(|err| classify(err, SessionError::ScriptFailed))?;
                Ok(ScriptValue::Element(self.remember(element, json)))
            }
        }
    }
}

/// What a script returned, before element references are resolved.
#[derive(Debug, PartialEq)]
enum ReturnShape {
    Plain(ScriptValue),
    Element,
    Elements,
}

fn shape_of(json: &Value) -> ReturnShape {
    match json {
        Value::Null => ReturnShape::Plain(ScriptValue::Null),
        Value::Bool(value) => ReturnShape::Plain(ScriptValue::Bool(*value)),
        Value::String(text) => ReturnShape::Plain(ScriptValue::Text(text.clone())),
        Value::Array(items) if items.is_empty() => {
            ReturnShape::Plain(ScriptValue::Elements(Vec::new()))
        }
        Value::Array(items) if items.iter().all(is_element_reference) => ReturnShape::Elements,
        value if is_element_reference(value) => ReturnShape::Element,
        other => ReturnShape::Plain(ScriptValue::Json(other.clone())),
    }
}

impl BrowserSession for WebDriverSession {
    fn navigate_to(&mut self, url: &str) -> Result<(), SessionError> {
        self.release_elements();
        let driver = self.driver()?;
        self.runtime
            .block_on(driver.goto(url))
            .map_err(|err| classify(err, SessionError::Navigation))
    }

    fn current_url(&mut self) -> Result<String, SessionError> {
        let driver = self.driver()?;
        self.runtime
            .block_on(driver.current_url())
            .map(|url| url.to_string())
            .map_err(|err| classify(err, SessionError::Driver))
    }

    fn execute_script(
        &mut self,
        script: &str,
        args: &[ScriptArg],
    ) -> Result<ScriptValue, SessionError> {
        let args = args
            .iter()
            .map(|arg| self.encode_arg(arg))
            .collect::<Result<Vec<_>, _>>()?;
        let driver = self.driver()?;
        let ret = self
            .runtime
            .block_on(driver.execute(script, args))
            .map_err(|err| classify(err, SessionError::ScriptFailed))?;
        self.decode(ret)
    }

    fn click(&mut self, element: ElementRef) -> Result<(), SessionError> {
        let cached = self.element(element)?;
        self.runtime
            .block_on(cached.element.click())
            .map_err(|err| classify(err, SessionError::Interaction))
    }

    fn clear(&mut self, element: ElementRef) -> Result<(), SessionError> {
        let cached = self.element(element)?;
        self.runtime
            .block_on(cached.element.clear())
            .map_err(|err| classify(err, SessionError::Interaction))
    }

    fn send_keys(&mut self, element: ElementRef, text: &str) -> Result<(), SessionError> {
        let cached = self.element(element)?;
        self.runtime
            .block_on(cached.element.send_keys(text))
            .map_err(|err| classify(err, SessionError::Interaction))
    }

    fn press_enter(&mut self, element: ElementRef) -> Result<(), SessionError> {
        let cached = self.element(element)?;
        self.runtime
            .block_on(cached.element.send_keys(Key::Enter + ""))
            .map_err(|err| classify(err, SessionError::Interaction))
    }

    fn release_elements(&mut self) {
        self.elements.clear();
        self.index.clear();
    }
}

impl Drop for WebDriverSession {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.take() {
            if let Err(err) = self.runtime.block_on(driver.quit()) {
                engine_warn!("failed to close browser session: {}", err);
            }
        }
    }
}

fn is_element_reference(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|map| map.contains_key(ELEMENT_KEY))
}

/// Sorts a driver error into the session taxonomy; `fallback` wraps the rest.
fn classify(err: WebDriverError, fallback: fn(String) -> SessionError) -> SessionError {
    let message = err.to_string();
    match err {
        WebDriverError::StaleElementReference(_) | WebDriverError::NoSuchElement(_) => {
            SessionError::StaleElement(message)
        }
        WebDriverError::InvalidSessionId(_)
        | WebDriverError::NoSuchWindow(_)
        | WebDriverError::SessionNotCreated(_)
        | WebDriverError::RequestFailed(_)
        | WebDriverError::HttpError(_)
        | WebDriverError::IoError(_)
        | WebDriverError::FatalError(_)
        | WebDriverError::CommandSendError(_)
        | WebDriverError::CommandRecvError(_) => SessionError::Driver(message),
        WebDriverError::JavascriptError(info) if is_policy_refusal(&info.value.message) => {
            SessionError::ScriptBlocked(message)
        }
        WebDriverError::JavascriptError(_)
        | WebDriverError::ScriptTimeout(_)
        | WebDriverError::UnexpectedAlertOpen(_) => SessionError::ScriptFailed(message),
        _ => fallback(message),
    }
}

/// Browsers report a Content Security Policy refusal as a script error.
fn is_policy_refusal(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("content security policy")
        || lower.contains("blocked by csp")
        || lower.contains("unsafe-eval")
}
