use std::fmt;
use std::fmt::Write as _;

use tracing::debug;

/// Separator placed between the answer text and the citation list.
pub const SOURCES_SEPARATOR: &str = "\n\nSOURCES:\n";

/// Backend-supplied source reference for a generated answer.
///
/// `order` is the display rank assigned by the backend. It is neither
/// guaranteed to be contiguous nor unique.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Citation {
    pub order: i64,
    pub name: String,
    pub url: String,
}

impl Citation {
    /// Creates a citation.
    pub fn new(order: i64, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            order,
            name: name.into(),
            url: url.into(),
        }
    }
}

impl fmt::Display for Citation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}: {}", self.order, self.name, self.url)
    }
}

/// Parses a JSON citation array, dropping entries without an integer
/// `order` and string `name`/`url`.
pub(crate) fn parse_citations(values: &[serde_json::Value]) -> Vec<Citation> {
    values
        .iter()
        .filter_map(|value| match serde_json::from_value::<Citation>(value.clone()) {
            Ok(citation) => Some(citation),
            Err(e) => {
                debug!(error = %e, "dropping malformed citation entry");
                None
            }
        })
        .collect()
}

/// Appends the `SOURCES:` block to `text`, one line per citation in the
/// order given. An empty slice leaves `text` untouched.
pub fn append_sources(text: &mut String, citations: &[Citation]) {
    if citations.is_empty() {
        return;
    }
    text.push_str(SOURCES_SEPARATOR);
    for citation in citations {
        // Writing into a String cannot fail.
        let _ = writeln!(text, "{citation}");
    }
}
