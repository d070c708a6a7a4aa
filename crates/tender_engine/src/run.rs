use std::sync::Arc;

use engine_logging::{clear_page, engine_debug, engine_warn, set_page};
use tender_core::{fingerprint, retry_delay, PageCursor, PageFingerprint, RunStats, SeenSet};

use crate::clock::{Clock, Pacer};
use crate::collect::{Harvest, RecordCollector};
use crate::error::{AbortError, PageError, SettingsError};
use crate::events::{EventSink, RunEvent};
use crate::paginate::{Baseline, PaginationDriver};
use crate::parse::CardParser;
use crate::session::BrowserSession;
use crate::settings::ScrapeSettings;
use crate::sink::{OutputRecord, RecordSink};
use crate::traverse::ShadowTraverser;

/// Produces the `collected_utc` stamp for each record.
pub type Timestamp = Arc<dyn Fn() -> String + Send + Sync>;

/// How a run ended.
#[derive(Debug)]
pub enum RunEnd {
    Completed,
    /// A page could not be reached within its retry budget.
    Halted { page: u32, error: PageError },
    /// Unrecoverable failure: blocked scripts, a dead session or a failing sink.
    Aborted { page: u32, error: AbortError },
}

#[derive(Debug)]
pub struct RunReport {
    pub stats: RunStats,
    pub end: RunEnd,
}

impl RunReport {
    pub fn is_complete(&self) -> bool {
        matches!(self.end, RunEnd::Completed)
    }
}

/// State owned by one run and threaded through every page.
struct RunState {
    stats: RunStats,
    seen: SeenSet,
    displayed_page: u32,
    handled_pages: u32,
}

/// Sequences the requested pages: navigate, collect, write, pace.
pub struct RunController<'a> {
    settings: &'a ScrapeSettings,
    clock: &'a dyn Clock,
    events: &'a dyn EventSink,
    parser: CardParser,
    cursor: PageCursor,
    pacer: Pacer,
    timestamp: Option<Timestamp>,
}

impl<'a> RunController<'a> {
    pub fn new(
        settings: &'a ScrapeSettings,
        clock: &'a dyn Clock,
        events: &'a dyn EventSink,
    ) -> Result<Self, SettingsError> {
        settings.validate()?;
        let parser = CardParser::new(
            &settings.link_selector,
            &settings.description_selector,
            Some(settings.base_url()?),
        )?;
        Ok(Self {
            settings,
            clock,
            events,
            parser,
            cursor: settings.cursor()?,
            pacer: Pacer::from_entropy(),
            timestamp: None,
        })
    }

    pub fn with_pacer(mut self, pacer: Pacer) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Runs the whole page range. Never fails: the report says how it ended
    /// and the sink is flushed on every path.
    pub fn run(
        &mut self,
        session: &mut dyn BrowserSession,
        sink: &mut dyn RecordSink,
    ) -> RunReport {
        self.events.emit(RunEvent::RunStarted {
            portal_url: self.settings.portal_url.clone(),
            start_page: self.cursor.start(),
            end_page: self.cursor.end(),
        });

        let mut state = RunState {
            stats: RunStats::new(),
            seen: SeenSet::new(),
            displayed_page: 1,
            handled_pages: 0,
        };
        let mut end = self.drive(session, sink, &mut state);

        if let Err(err) = sink.flush() {
            if matches!(end, RunEnd::Completed | RunEnd::Halted { .. }) {
                end = RunEnd::Aborted {
                    page: state.displayed_page,
                    error: err.into(),
                };
            }
        }
        match &end {
            RunEnd::Completed => {}
            RunEnd::Halted { page, error } => self.events.emit(RunEvent::RunHalted {
                page: *page,
                error: error.clone(),
            }),
            RunEnd::Aborted { page, error } => self.events.emit(RunEvent::RunAborted {
                page: *page,
                reason: error.to_string(),
            }),
        }
        clear_page();
        self.events.emit(RunEvent::RunFinished { stats: state.stats });

        RunReport {
            stats: state.stats,
            end,
        }
    }

    fn drive(
        &mut self,
        session: &mut dyn BrowserSession,
        sink: &mut dyn RecordSink,
        state: &mut RunState,
    ) -> RunEnd {
        set_page(1);
        if let Err(err) = session.navigate_to(&self.settings.portal_url) {
            return aborted(1, PageError::from(err));
        }
        let mut before = match self.await_first_results(session) {
            Ok(fp) => fp,
            Err(error) if error.is_fatal() => return aborted(1, error),
            Err(error) => return RunEnd::Halted { page: 1, error },
        };

        let mut cursor = self.cursor;
        while let Some(page) = cursor.current() {
            set_page(page);
            let settings = self.settings;
            let reached = PaginationDriver::new(settings, &self.parser, self.clock, self.events)
                .reach(
                    session,
                    &mut self.pacer,
                    state.displayed_page,
                    page,
                    Baseline::Known(before.take()),
                );
            let nav = match reached {
                Ok(nav) => nav,
                Err(error) if error.is_fatal() => return aborted(page, error),
                Err(error) => return RunEnd::Halted { page, error },
            };
            state.displayed_page = page;
            self.events.emit(RunEvent::PageReached {
                page,
                attempts: nav.attempts,
                strategy: nav.strategy,
            });
            if nav.attempts > 0 {
                self.clock.sleep(settings.settle_after_nav);
            }

            match self.collect_page(session, page, state) {
                Ok(Some(harvest)) => {
                    if let Err(err) = self.write_page(sink, page, &harvest, state) {
                        return RunEnd::Aborted {
                            page,
                            error: err.into(),
                        };
                    }
                }
                Ok(None) => {
                    state.stats.record_skipped_page();
                    self.events.emit(RunEvent::PageSkipped { page });
                }
                Err(error) if error.is_fatal() => return aborted(page, error),
                Err(error) => return RunEnd::Halted { page, error },
            }
            state.handled_pages += 1;

            let driver = PaginationDriver::new(settings, &self.parser, self.clock, self.events);
            before = match driver.capture_fingerprint(session) {
                Ok(fp) => fp,
                Err(error) if error.is_fatal() => return aborted(page, error),
                Err(_) => None,
            };
            session.release_elements();

            cursor.advance();
            if cursor.current().is_some() {
                self.pace(state.handled_pages);
            }
        }
        RunEnd::Completed
    }

    /// Waits for the landing page to render its first card.
    fn await_first_results(
        &mut self,
        session: &mut dyn BrowserSession,
    ) -> Result<Option<PageFingerprint>, PageError> {
        let traverser = ShadowTraverser::new();
        let started = self.clock.now();
        loop {
            match self.first_result(&traverser, session) {
                Ok(Some(fp)) => return Ok(Some(fp)),
                Ok(None) => {}
                Err(error) if error.is_fatal() => return Err(error),
                Err(error) => engine_debug!("landing page not ready: {}", error),
            }
            if self.clock.now().saturating_duration_since(started) >= self.settings.initial_wait {
                return Err(PageError::EmptyPage { page: 1 });
            }
            self.clock.sleep(self.settings.poll_interval_base);
        }
    }

    fn first_result(
        &self,
        traverser: &ShadowTraverser,
        session: &mut dyn BrowserSession,
    ) -> Result<Option<PageFingerprint>, PageError> {
        let cards = traverser.deep_query(session, &self.settings.card_selector)?;
        Ok(self
            .parser
            .first_card(session, &cards)?
            .and_then(|card| fingerprint(std::slice::from_ref(&card))))
    }

    /// Collects a page, retrying while it comes back empty or a script fails.
    /// `Ok(None)` means the page stayed empty and is skipped.
    fn collect_page(
        &mut self,
        session: &mut dyn BrowserSession,
        page: u32,
        state: &mut RunState,
    ) -> Result<Option<Harvest>, PageError> {
        let collector = RecordCollector::new(self.settings, &self.parser, self.clock);
        let attempts = self.settings.max_page_retries.max(1);
        for attempt in 1..=attempts {
            match collector.collect(session, page, &mut state.seen) {
                Ok(harvest) => return Ok(Some(harvest)),
                Err(error) if !error.is_fatal() => {
                    if matches!(error, PageError::EmptyPage { .. }) {
                        self.events.emit(RunEvent::EmptyPage { page, attempt });
                    } else if attempt == attempts {
                        return Err(error);
                    } else {
                        engine_warn!("collecting page {} failed: {}", page, error);
                    }
                    if attempt < attempts {
                        let (low, high) = self.settings.retry_jitter;
                        let pause = retry_delay(
                            self.settings.retry_delay_base,
                            self.settings.retry_delay_step,
                            attempt,
                        ) + self.pacer.between(low, high);
                        self.clock.sleep(pause);
                    }
                }
                Err(error) => return Err(error),
            }
        }
        Ok(None)
    }

    fn write_page(
        &self,
        sink: &mut dyn RecordSink,
        page: u32,
        harvest: &Harvest,
        state: &mut RunState,
    ) -> Result<(), crate::error::SinkError> {
        let first_seq = state.stats.rows_collected + 1;
        for (offset, card) in harvest.cards.iter().enumerate() {
            let stamp = self.timestamp.as_ref().map(|now| now());
            let record = OutputRecord::new(card, page, first_seq + offset as u64, stamp);
            sink.append(&record)?;
            state.stats.record_row();
        }
        sink.flush()?;

        state.stats.record_page();
        state.stats.record_duplicates(harvest.duplicates);
        self.events.emit(RunEvent::RecordsCollected {
            page,
            new_rows: harvest.cards.len(),
            duplicates: harvest.duplicates,
            total_rows: state.stats.rows_collected,
        });
        Ok(())
    }

    fn pace(&mut self, handled_pages: u32) {
        let every = self.settings.cooldown_every;
        if every > 0 && handled_pages % every == 0 {
            self.events.emit(RunEvent::Cooldown {
                after_pages: handled_pages,
                duration: self.settings.cooldown,
            });
            self.clock.sleep(self.settings.cooldown);
        }
        let (low, high) = self.settings.pace_delay;
        let pause = self.pacer.between(low, high);
        engine_debug!("pacing {:?} before next page", pause);
        self.clock.sleep(pause);
    }
}

fn aborted(page: u32, error: PageError) -> RunEnd {
    RunEnd::Aborted {
        page,
        error: error.into(),
    }
}
