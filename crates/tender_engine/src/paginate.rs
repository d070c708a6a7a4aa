//! Page navigation with change confirmation.
//!
//! A navigation request runs `Idle → Navigating → Confirming → Success`, or
//! ends in `Failed` and goes back to `Idle` for another attempt until the
//! attempt budget is spent.

use std::time::Duration;

use engine_logging::{engine_debug, engine_trace};
use tender_core::{
    confirmation_window, fingerprint, has_changed, retry_delay, PageFingerprint,
};

use crate::clock::{Clock, Pacer};
use crate::error::{soften, PageError};
use crate::events::{EventSink, RunEvent};
use crate::parse::CardParser;
use crate::scripts;
use crate::session::{BrowserSession, ElementRef, ScriptArg};
use crate::settings::ScrapeSettings;
use crate::traverse::ShadowTraverser;

/// How a navigation was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    PageInput,
    ControlClick,
}

/// What the page looked like before navigating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Baseline {
    /// Not captured yet; the driver captures it before the first action.
    Unknown,
    Known(Option<PageFingerprint>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavState {
    Idle,
    Navigating,
    Confirming { strategy: Strategy },
    Success { strategy: Strategy, fingerprint: Option<PageFingerprint> },
    Failed(PageError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavOutcome {
    /// Navigation attempts made; 0 when already on the target page.
    pub attempts: u32,
    pub strategy: Option<Strategy>,
    /// Fingerprint of the page now shown.
    pub fingerprint: Option<PageFingerprint>,
    /// Failures of the attempts before the successful one.
    pub failures: Vec<PageError>,
}

enum Confirmation {
    Changed(Option<PageFingerprint>),
    TimedOut(Duration),
}

pub struct PaginationDriver<'a> {
    settings: &'a ScrapeSettings,
    parser: &'a CardParser,
    clock: &'a dyn Clock,
    events: &'a dyn EventSink,
    traverser: ShadowTraverser,
}

impl<'a> PaginationDriver<'a> {
    pub fn new(
        settings: &'a ScrapeSettings,
        parser: &'a CardParser,
        clock: &'a dyn Clock,
        events: &'a dyn EventSink,
    ) -> Self {
        Self {
            settings,
            parser,
            clock,
            events,
            traverser: ShadowTraverser::new(),
        }
    }

    /// Brings the browser from `current` to `target`.
    ///
    /// Returns the last failure once every attempt failed. Fatal errors
    /// return immediately.
    pub fn reach(
        &self,
        session: &mut dyn BrowserSession,
        pacer: &mut Pacer,
        current: u32,
        target: u32,
        baseline: Baseline,
    ) -> Result<NavOutcome, PageError> {
        if current == target {
            let fingerprint = match baseline {
                Baseline::Known(fp) => fp,
                Baseline::Unknown => None,
            };
            return Ok(NavOutcome {
                attempts: 0,
                strategy: None,
                fingerprint,
                failures: Vec::new(),
            });
        }

        let max_attempts = self.settings.max_page_retries.max(1);
        let mut before = match baseline {
            Baseline::Known(fp) => Some(fp),
            Baseline::Unknown => None,
        };
        let mut failures = Vec::new();
        let mut attempt = 0;
        let mut state = NavState::Idle;

        loop {
            state = match state {
                NavState::Idle => {
                    attempt += 1;
                    engine_debug!("navigating to page {} (attempt {})", target, attempt);
                    NavState::Navigating
                }
                NavState::Navigating => match self.navigate(session, target, &mut before) {
                    Ok(Some(strategy)) => NavState::Confirming { strategy },
                    Ok(None) => NavState::Failed(PageError::ControlNotFound { page: target }),
                    Err(error) if error.is_fatal() => return Err(error),
                    Err(error) => NavState::Failed(error),
                },
                NavState::Confirming { strategy } => {
                    let baseline = before.as_ref().and_then(Option::as_ref);
                    match self.confirm(session, pacer, baseline, attempt) {
                        Ok(Confirmation::Changed(fingerprint)) => NavState::Success {
                            strategy,
                            fingerprint,
                        },
                        Ok(Confirmation::TimedOut(waited)) => {
                            NavState::Failed(PageError::ConfirmationTimeout {
                                page: target,
                                waited,
                            })
                        }
                        Err(error) if error.is_fatal() => return Err(error),
                        Err(error) => NavState::Failed(error),
                    }
                }
                NavState::Success {
                    strategy,
                    fingerprint,
                } => {
                    return Ok(NavOutcome {
                        attempts: attempt,
                        strategy: Some(strategy),
                        fingerprint,
                        failures,
                    });
                }
                NavState::Failed(error) => {
                    self.events.emit(RunEvent::NavigationFailed {
                        page: target,
                        attempt,
                        error: error.clone(),
                    });
                    if attempt >= max_attempts {
                        return Err(error);
                    }
                    failures.push(error);

                    let (low, high) = self.settings.retry_jitter;
                    let pause = retry_delay(
                        self.settings.retry_delay_base,
                        self.settings.retry_delay_step,
                        attempt,
                    ) + pacer.between(low, high);
                    self.clock.sleep(pause);
                    NavState::Idle
                }
            };
        }
    }

    /// Fingerprint of whatever is rendered right now.
    pub fn capture_fingerprint(
        &self,
        session: &mut dyn BrowserSession,
    ) -> Result<Option<PageFingerprint>, PageError> {
        let cards = self
            .traverser
            .deep_query(session, &self.settings.card_selector)?;
        let first = self.parser.first_card(session, &cards)?;
        Ok(fingerprint(first.as_slice()))
    }

    /// Captures the baseline if it is still unknown, then issues the request.
    fn navigate(
        &self,
        session: &mut dyn BrowserSession,
        target: u32,
        before: &mut Option<Option<PageFingerprint>>,
    ) -> Result<Option<Strategy>, PageError> {
        if before.is_none() {
            *before = Some(self.capture_fingerprint(session)?);
        }
        self.issue(session, target)
    }

    fn confirm(
        &self,
        session: &mut dyn BrowserSession,
        pacer: &mut Pacer,
        before: Option<&PageFingerprint>,
        attempt: u32,
    ) -> Result<Confirmation, PageError> {
        let window = confirmation_window(
            self.settings.poll_max_wait,
            self.settings.attempt_wait_extension,
            attempt,
        );
        let started = self.clock.now();
        let mut intervals = self.settings.poll_schedule().intervals();

        loop {
            let now = self.capture_fingerprint(session)?;
            if has_changed(before, now.as_ref()) {
                return Ok(Confirmation::Changed(now));
            }
            let waited = self.clock.now().saturating_duration_since(started);
            if waited >= window {
                return Ok(Confirmation::TimedOut(waited));
            }
            let interval = intervals
                .next()
                .unwrap_or(self.settings.poll_interval_max);
            engine_trace!("page unchanged after {:?}, next poll in {:?}", waited, interval);
            self.clock
                .sleep(interval + pacer.jitter(self.settings.poll_jitter));
        }
    }

    fn issue(
        &self,
        session: &mut dyn BrowserSession,
        target: u32,
    ) -> Result<Option<Strategy>, PageError> {
        self.scroll_pager_into_view(session)?;
        if self.try_page_input(session, target)? {
            return Ok(Some(Strategy::PageInput));
        }
        if self.try_control_click(session, target)? {
            return Ok(Some(Strategy::ControlClick));
        }
        Ok(None)
    }

    fn scroll_pager_into_view(&self, session: &mut dyn BrowserSession) -> Result<(), PageError> {
        let pagers = self
            .traverser
            .deep_query(session, &self.settings.pager_selector)?;
        if let Some(pager) = pagers.first() {
            soften(session.execute_script(scripts::SCROLL_INTO_VIEW, &[ScriptArg::Element(*pager)]))?;
        }
        Ok(())
    }

    fn try_page_input(
        &self,
        session: &mut dyn BrowserSession,
        target: u32,
    ) -> Result<bool, PageError> {
        let inputs = self
            .traverser
            .deep_query(session, &self.settings.page_input_selector)?;
        let Some(input) = inputs.first().copied() else {
            return Ok(false);
        };
        let value = target.to_string();

        if soften(type_and_submit(session, input, &value))?.is_some() {
            return Ok(true);
        }
        engine_debug!("native input failed, dispatching events instead");
        let args = [ScriptArg::Element(input), ScriptArg::Text(value)];
        Ok(soften(session.execute_script(scripts::SET_VALUE_AND_SUBMIT, &args))?.is_some())
    }

    fn try_control_click(
        &self,
        session: &mut dyn BrowserSession,
        target: u32,
    ) -> Result<bool, PageError> {
        let hits = self
            .traverser
            .deep_find_by_text(session, &target.to_string())?;

        for hit in hits {
            let resolved = soften(session.execute_script(scripts::CLICK_TARGET, &[ScriptArg::Element(hit)]))?;
            let control = resolved.and_then(|v| v.into_element()).unwrap_or(hit);
            let scrolled = soften(session.execute_script(scripts::SCROLL_INTO_VIEW, &[ScriptArg::Element(control)]))?;
            if scrolled.is_none() {
                continue;
            }
            self.clock.sleep(self.settings.click_settle);

            if soften(session.click(control))?.is_some() {
                return Ok(true);
            }
            let clicked = soften(session.execute_script(scripts::SCRIPT_CLICK, &[ScriptArg::Element(control)]))?;
            if clicked.is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

fn type_and_submit(
    session: &mut dyn BrowserSession,
    input: ElementRef,
    value: &str,
) -> Result<(), crate::session::SessionError> {
    session.execute_script(scripts::FOCUS, &[ScriptArg::Element(input)])?;
    session.clear(input)?;
    session.send_keys(input, value)?;
    session.press_enter(input)
}
