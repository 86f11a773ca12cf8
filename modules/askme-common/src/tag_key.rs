//! Canonical tag keys and display labels.
//!
//! A key is the identity of a tag: every raw string that normalizes to the
//! same key must resolve to the same tag. Labels are the human-facing form
//! derived from a raw string on first sight.

/// Convert a raw tag to its kebab-case key.
///
/// Lowercases, maps spaces and underscores to hyphens, drops everything outside
/// `[a-z0-9-]`, collapses hyphen runs and trims hyphens at both ends.
///
/// `"Career Change"` -> `"career-change"`, `"backend_dev!"` -> `"backend-dev"`.
pub fn to_tag_key(raw: &str) -> String {
    let mut key = String::with_capacity(raw.len());
    for c in raw.to_lowercase().chars() {
        let c = if c == ' ' || c == '_' { '-' } else { c };
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            key.push(c);
        } else if c == '-' && !key.ends_with('-') {
            key.push('-');
        }
    }
    key.trim_matches('-').to_string()
}

/// Convert a raw tag to a title-cased display label.
///
/// `"career-change"` -> `"Career Change"`, `"backend dev"` -> `"Backend Dev"`.
pub fn to_tag_label(raw: &str) -> String {
    raw.replace(['-', '_'], " ")
        .split_whitespace()
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
