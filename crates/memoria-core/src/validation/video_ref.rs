//! External video reference normalization.
//!
//! Operators paste either a bare 11-character YouTube id or a full watch /
//! embed / short URL; only the id is stored.

use regex::Regex;

fn id_pattern() -> Option<Regex> {
    Regex::new(r"^[a-zA-Z0-9_-]{11}$").ok()
}

fn url_pattern() -> Option<Regex> {
    Regex::new(r"(?:youtube\.com/(?:watch\?v=|embed/)|youtu\.be/)([a-zA-Z0-9_-]{11})").ok()
}

/// Extract the video id from a URL or bare id.
pub fn extract_youtube_id(input: &str) -> Option<String> {
    if id_pattern()?.is_match(input) {
        return Some(input.to_string());
    }
    url_pattern()?
        .captures(input)
        .map(|caps| caps[1].to_string())
}

/// Normalize an operator-supplied reference: empty input clears the field,
/// a recognized URL collapses to its id, anything else is stored as given.
pub fn normalize_video_ref(input: Option<&str>) -> Option<String> {
    let input = input.map(str::trim).filter(|s| !s.is_empty())?;
    Some(extract_youtube_id(input).unwrap_or_else(|| input.to_string()))
}
