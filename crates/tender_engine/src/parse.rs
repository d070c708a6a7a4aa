use scraper::{ElementRef as HtmlElement, Html, Selector};
use tender_core::{resolve_card_url, ResultCard};
use url::Url;

use crate::error::{soften, PageError, SettingsError};
use crate::scripts;
use crate::session::{BrowserSession, ElementRef, ScriptArg};

/// Turns the markup of one result card into a [`ResultCard`].
///
/// The link is the first element matching the link selector, falling back to
/// the first `<a>`; its text is the title and its href (resolved against the
/// portal) the url. Cards missing either are rejected.
#[derive(Debug, Clone)]
pub struct CardParser {
    base_url: Option<Url>,
    link: Selector,
    fallback_link: Selector,
    description: Selector,
}

impl CardParser {
    pub fn new(
        link_selector: &str,
        description_selector: &str,
        base_url: Option<Url>,
    ) -> Result<Self, SettingsError> {
        Ok(Self {
            base_url,
            link: parse_selector(link_selector)?,
            fallback_link: parse_selector("a")?,
            description: parse_selector(description_selector)?,
        })
    }

    pub fn parse_html(&self, outer_html: &str) -> Option<ResultCard> {
        let fragment = Html::parse_fragment(outer_html);
        let link = fragment
            .select(&self.link)
            .next()
            .or_else(|| fragment.select(&self.fallback_link).next())?;

        let title = element_text(link);
        let href = link.value().attr("href").unwrap_or_default();
        let url = resolve_card_url(href, self.base_url.as_ref())?;
        let description = fragment.select(&self.description).next().map(element_text);

        ResultCard::new(title, url.as_str(), description)
    }

    /// Parses a live card; a card that re-rendered under us yields `None`.
    pub fn parse_element(
        &self,
        session: &mut dyn BrowserSession,
        card: ElementRef,
    ) -> Result<Option<ResultCard>, PageError> {
        let markup = soften(session.execute_script(scripts::OUTER_HTML, &[ScriptArg::Element(card)]))?;
        Ok(markup
            .and_then(|value| value.into_text())
            .and_then(|html| self.parse_html(&html)))
    }

    /// First card among `cards` that parses.
    pub fn first_card(
        &self,
        session: &mut dyn BrowserSession,
        cards: &[ElementRef],
    ) -> Result<Option<ResultCard>, PageError> {
        for card in cards {
            if let Some(parsed) = self.parse_element(session, *card)? {
                return Ok(Some(parsed));
            }
        }
        Ok(None)
    }
}

pub(crate) fn parse_selector(selector: &str) -> Result<Selector, SettingsError> {
    Selector::parse(selector).map_err(|err| SettingsError::Selector {
        selector: selector.to_string(),
        message: err.to_string(),
    })
}

fn element_text(element: HtmlElement<'_>) -> String {
    element.text().collect::<String>()
}
