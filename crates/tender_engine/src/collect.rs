use engine_logging::engine_debug;
use tender_core::{ResultCard, SeenSet};

use crate::clock::Clock;
use crate::error::PageError;
use crate::parse::CardParser;
use crate::scripts;
use crate::session::{BrowserSession, ElementRef};
use crate::settings::ScrapeSettings;
use crate::traverse::ShadowTraverser;

/// Cards harvested from one page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Harvest {
    /// Newly seen cards, in page order.
    pub cards: Vec<ResultCard>,
    /// Cards that parsed, before deduplication.
    pub parsed: usize,
    pub duplicates: usize,
}

pub struct RecordCollector<'a> {
    settings: &'a ScrapeSettings,
    parser: &'a CardParser,
    clock: &'a dyn Clock,
    traverser: ShadowTraverser,
}

impl<'a> RecordCollector<'a> {
    pub fn new(settings: &'a ScrapeSettings, parser: &'a CardParser, clock: &'a dyn Clock) -> Self {
        Self {
            settings,
            parser,
            clock,
            traverser: ShadowTraverser::new(),
        }
    }

    /// Scrolls to load lazy content, then harvests the visible cards.
    pub fn collect(
        &self,
        session: &mut dyn BrowserSession,
        page: u32,
        seen: &mut SeenSet,
    ) -> Result<Harvest, PageError> {
        self.load_lazy_content(session);
        let elements = self
            .traverser
            .deep_query(session, &self.settings.card_selector)?;
        self.harvest(session, &elements, page, seen)
    }

    /// Parses `elements` and keeps the cards not yet in `seen`.
    ///
    /// Fails with `EmptyPage` when nothing parses at all; a page of pure
    /// duplicates is a valid, empty harvest.
    pub fn harvest(
        &self,
        session: &mut dyn BrowserSession,
        elements: &[ElementRef],
        page: u32,
        seen: &mut SeenSet,
    ) -> Result<Harvest, PageError> {
        let cap = self.settings.per_page_cap.unwrap_or(usize::MAX);
        let mut harvest = Harvest::default();

        for element in elements.iter().take(cap) {
            let Some(card) = self.parser.parse_element(session, *element)? else {
                continue;
            };
            harvest.parsed += 1;
            if seen.insert_url(card.url()) {
                harvest.cards.push(card);
            } else {
                harvest.duplicates += 1;
            }
        }

        if harvest.parsed == 0 {
            return Err(PageError::EmptyPage { page });
        }
        engine_debug!(
            "{} elements, {} parsed, {} new, {} duplicate",
            elements.len(),
            harvest.parsed,
            harvest.cards.len(),
            harvest.duplicates
        );
        Ok(harvest)
    }

    fn load_lazy_content(&self, session: &mut dyn BrowserSession) {
        for _ in 0..self.settings.scroll_repeats {
            if let Err(err) = session.execute_script(scripts::SCROLL_TO_BOTTOM, &[]) {
                engine_debug!("scroll to bottom failed: {}", err);
                return;
            }
            self.clock.sleep(self.settings.scroll_pause);
        }
    }
}
