use crate::ResultCard;

/// Cheap signature of a rendered page: title and url of the first card.
///
/// Two pages that share their first card compare equal even if the rest of
/// the list differs. Page changes always move the first card, so this is
/// enough to notice a completed transition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageFingerprint {
    pub title: String,
    pub url: String,
}

impl PageFingerprint {
    pub fn of(card: &ResultCard) -> Self {
        Self {
            title: card.title().to_string(),
            url: card.url().to_string(),
        }
    }
}

/// Fingerprint of a card list; `None` while nothing is rendered.
pub fn fingerprint(cards: &[ResultCard]) -> Option<PageFingerprint> {
    cards.first().map(PageFingerprint::of)
}

/// True when `after` shows a rendered page that differs from `before`.
pub fn has_changed(before: Option<&PageFingerprint>, after: Option<&PageFingerprint>) -> bool {
    match after {
        None => false,
        Some(after) => before != Some(after),
    }
}
