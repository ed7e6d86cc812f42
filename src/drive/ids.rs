//! Drive resource ID extraction from raw IDs and share links.

use regex::Regex;
use std::sync::LazyLock;

static BARE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{10,}$").expect("valid bare id pattern"));

/// Patterns tried in order for file links
static FILE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"/file/d/([A-Za-z0-9_-]{10,})",       // https://drive.google.com/file/d/<id>/view
        r"[?&]id=([A-Za-z0-9_-]{10,})",        // https://drive.google.com/open?id=<id>
        r"/uc\?id=([A-Za-z0-9_-]{10,})",       // https://drive.google.com/uc?id=<id>&export=download
        r"/drive/folders/([A-Za-z0-9_-]{10,})", // folder link, accepted for completeness
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid file id pattern"))
    .collect()
});

/// Patterns tried in order for folder links
static FOLDER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"/drive/folders/([A-Za-z0-9_-]{10,})",
        r"/folders/([A-Za-z0-9_-]{10,})",
        r"[?&]id=([A-Za-z0-9_-]{10,})",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid folder id pattern"))
    .collect()
});

/// Extract a Drive file ID from a raw ID or a common Drive file URL
pub fn parse_file_id(input: &str) -> Option<String> {
    parse_with(input, &FILE_PATTERNS)
}

/// Extract a Drive folder ID from a raw ID or a Drive folder URL
///
/// A bare ID is returned as-is; whether it names a file or a folder is
/// decided by the caller.
pub fn parse_folder_id(input: &str) -> Option<String> {
    parse_with(input, &FOLDER_PATTERNS)
}

fn parse_with(input: &str, patterns: &[Regex]) -> Option<String> {
    let input = input.trim();

    if !input.contains('/') && BARE_ID.is_match(input) {
        return Some(input.to_string());
    }

    patterns
        .iter()
        .find_map(|pattern| pattern.captures(input))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
