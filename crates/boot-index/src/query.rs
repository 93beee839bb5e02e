use boot_cache::Symbol;

/// Restricts a query to symbols whose location URI starts with the given prefix.
pub const LOCATION_PREFIX_PARAM: &str = "locationPrefix:";

/// A parsed workspace-symbol query.
///
/// Grammar: `[locationPrefix:<uri-prefix>[?]]<text>`. A leading `*` in the text lifts
/// the configured result limit. Text matches case-insensitively anywhere in the name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SymbolQuery {
    location_prefix: String,
    /// Lowercased.
    text: String,
    unlimited: bool,
}

impl SymbolQuery {
    pub fn parse(query: &str) -> Self {
        let (location_prefix, text) = match query.strip_prefix(LOCATION_PREFIX_PARAM) {
            Some(rest) => match rest.split_once('?') {
                Some((prefix, text)) => (prefix, text),
                None => (rest, ""),
            },
            None => ("", query),
        };
        let (text, unlimited) = match text.strip_prefix('*') {
            Some(text) => (text, true),
            None => (text, false),
        };
        Self {
            location_prefix: location_prefix.to_string(),
            text: text.to_lowercase(),
            unlimited,
        }
    }

    pub fn location_prefix(&self) -> &str {
        &self.location_prefix
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// True for the empty query, which returns every symbol.
    pub fn is_match_all(&self) -> bool {
        self.location_prefix.is_empty() && self.text.is_empty()
    }

    pub fn matches(&self, symbol: &Symbol) -> bool {
        symbol.location.uri.starts_with(&self.location_prefix)
            && (self.text.is_empty() || symbol.name.to_lowercase().contains(&self.text))
    }

    /// The effective result limit given the configured one.
    pub fn limit(&self, configured: Option<usize>) -> Option<usize> {
        if self.unlimited || self.is_match_all() {
            None
        } else {
            configured
        }
    }
}
