use url::Url;

/// One opportunity as rendered on a result page.
///
/// Construction trims every field and refuses cards without a title or url;
/// a half-rendered card is normal while the portal is still painting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultCard {
    title: String,
    url: String,
    description: Option<String>,
}

impl ResultCard {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        description: Option<String>,
    ) -> Option<Self> {
        let title = collapse_whitespace(&title.into());
        let url = url.into().trim().to_string();
        if title.is_empty() || url.is_empty() {
            return None;
        }
        let description = description
            .map(|d| collapse_whitespace(&d))
            .filter(|d| !d.is_empty());
        Some(Self {
            title,
            url,
            description,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Key used by the seen-set.
    pub fn dedupe_key(&self) -> String {
        normalize_url_for_dedupe(&self.url)
    }
}

/// Resolve an href found on a card against the portal URL.
///
/// Returns `None` for empty, fragment-only and `javascript:` references.
pub fn resolve_card_url(reference: &str, base: Option<&Url>) -> Option<Url> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with('#') || lower.starts_with("javascript:") {
        return None;
    }
    if let Ok(url) = Url::parse(trimmed) {
        return Some(url);
    }
    base.and_then(|base| base.join(trimmed).ok())
}

/// Normalise a url for duplicate detection.
///
/// Scheme and host are lowercased by the parser, the fragment is dropped and a
/// single trailing slash is removed from non-root paths. Unparseable input is
/// only trimmed.
pub fn normalize_url_for_dedupe(raw: &str) -> String {
    let trimmed = raw.trim();
    let Ok(mut url) = Url::parse(trimmed) else {
        return trimmed.to_string();
    };
    url.set_fragment(None);
    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(&path[..path.len() - 1]);
    }
    url.into()
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}
