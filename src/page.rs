//! Canonical page titles.
//!
//! A page is identified by its title with whitespace runs collapsed to `_`.
//! The same rule is applied to user input and to link targets scraped from
//! page HTML, so both sides of a comparison agree on identity.

/// Separator used in canonical titles.
pub const TITLE_SEPARATOR: char = '_';

/// Trim `raw` and join its whitespace-separated words with `_`.
///
/// Existing underscores are treated as whitespace so that `"New_York"` and
/// `"New York"` normalize to the same title.
pub fn normalize_title(raw: &str) -> String {
    raw.split(|c: char| c.is_whitespace() || c == TITLE_SEPARATOR)
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Human-readable form of a canonical title, used as embedding input.
pub fn display_title(title: &str) -> String {
    title.replace(TITLE_SEPARATOR, " ")
}
