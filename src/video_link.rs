//! YouTube link resolution. Pure: accepted inputs are the `watch?v=`,
//! `youtu.be/` and `embed/` URL forms plus a bare 11-character video id;
//! anything else resolves to None, which callers treat as "no embeddable
//! video", never as a failure.

use regex::Regex;

/// Extracts the canonical 11-character video id, or None if the input
/// matches none of the accepted forms.
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let url_pattern =
        Regex::new(r"(?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/)([A-Za-z0-9_-]{11})")
            .expect("hardcoded regex must compile");
    if let Some(captures) = url_pattern.captures(input) {
        return Some(captures[1].to_string());
    }

    let bare_id_pattern = Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("hardcoded regex must compile");
    if bare_id_pattern.is_match(input) {
        return Some(input.to_string());
    }

    None
}

/// Maps any accepted input form to an embeddable player URL.
pub fn embed_url(input: &str) -> Option<String> {
    extract_video_id(input).map(|id| format!("https://www.youtube.com/embed/{}", id))
}
