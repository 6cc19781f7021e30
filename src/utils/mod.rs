//! Utility functions and helpers.

pub mod http;
pub mod report;

use unicode_segmentation::UnicodeSegmentation;
use url::Url;

use crate::error::{AppError, Result};

/// Append one path segment (percent-encoded) to a base URL.
pub fn push_segment(base: &str, segment: &str) -> Result<Url> {
    let mut url = Url::parse(base)?;
    url.path_segments_mut()
        .map_err(|_| AppError::config(format!("{base} cannot be used as a base URL")))?
        .pop_if_empty()
        .push(segment);
    Ok(url)
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cut a string to at most `max` grapheme clusters.
pub fn truncate_graphemes(s: &str, max: usize) -> &str {
    match s.grapheme_indices(true).nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
