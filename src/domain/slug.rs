//! Deterministic slug derivation and file-name sanitization.
//!
//! Slugs and derived file names are restricted to the portable character set
//! `[0-9A-Za-z._-]`: diacritics are stripped, disallowed characters removed,
//! and slugs are additionally case-folded to lowercase.

use slug::slugify;

/// Derive a URL-safe slug from a human-readable title.
///
/// `"Héllo, World!"` becomes `"hello-world"`: lowercased, diacritics
/// stripped, whitespace collapsed to single hyphens, punctuation removed.
pub fn derive_slug(title: &str) -> String {
    slugify(title)
}

/// Sanitize a single file-name component for the uploaded-files area.
///
/// Unlike slugs, file names keep their case. Whitespace becomes a hyphen;
/// anything outside the portable set is removed.
pub fn sanitize_file_component(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '0'..='9' | 'A'..='Z' | 'a'..='z' | '.' | '_' | '-' => output.push(ch),
            ch if ch.is_whitespace() => {
                if !output.ends_with('-') {
                    output.push('-');
                }
            }
            _ => {}
        }
    }
    output.trim_matches('-').to_string()
}
