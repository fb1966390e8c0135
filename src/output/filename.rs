//! File names derived from statute titles

use sha2::{Digest, Sha256};

/// Longest file stem we produce, in bytes
pub const MAX_STEM_BYTES: usize = 200;

const RESERVED: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Turns a title into a safe file stem
///
/// Removes control characters and characters reserved on common file systems,
/// trims surrounding whitespace and dots, and caps the result at
/// [`MAX_STEM_BYTES`] without splitting a character. May return an empty
/// string.
pub fn sanitize_title(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !c.is_control() && !RESERVED.contains(c))
        .collect();
    let trimmed = cleaned.trim_matches(|c: char| c.is_whitespace() || c == '.');

    let mut end = trimmed.len().min(MAX_STEM_BYTES);
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    trimmed[..end]
        .trim_end_matches(|c: char| c.is_whitespace() || c == '.')
        .to_string()
}

/// JSON file name for a record with the given title
///
/// Falls back to `law_<8 hex chars of SHA-256(title)>.json` when nothing of
/// the title survives sanitizing.
pub fn file_name_for(title: &str) -> String {
    let stem = sanitize_title(title);
    if stem.is_empty() {
        let digest = Sha256::digest(title.as_bytes());
        format!("law_{}.json", &hex::encode(digest)[..8])
    } else {
        format!("{}.json", stem)
    }
}
