//! Filesystem-safe filename derivation from provider-reported titles

/// Maximum sanitized title length in characters
const MAX_TITLE_LEN: usize = 200;

/// Characters illegal on common filesystems (Windows superset)
const ILLEGAL: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Derive a filesystem-safe base name from a media title.
///
/// Strips characters illegal on common filesystems, collapses whitespace
/// runs to single spaces, trims, and caps the length. May return an
/// empty string when the title contains nothing usable; callers supply
/// their own fallback in that case.
pub fn sanitize_filename(title: &str) -> String {
    let stripped: String = title.chars().filter(|c| !ILLEGAL.contains(c)).collect();
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(MAX_TITLE_LEN).collect()
}
