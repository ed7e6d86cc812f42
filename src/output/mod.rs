use std::path::{Path, PathBuf};

use crate::drive::RemoteMetadata;
use crate::Result;

pub mod srt;

pub use srt::{format_timestamp, read_header, to_subtitle_text, write_subtitle_file};

/// Header key carrying the Drive owner display name
pub const OWNER_KEY: &str = "Owner";

/// Header key carrying the Drive modification time
pub const MODIFIED_KEY: &str = "Modified";

/// Build provenance header lines (without the `# ` prefix) from Drive metadata
///
/// Blank values are omitted.
pub fn build_header_lines(meta: &RemoteMetadata) -> Vec<String> {
    [
        (OWNER_KEY, meta.owner_display_name.trim()),
        (MODIFIED_KEY, meta.modified_time.trim()),
    ]
    .into_iter()
    .filter(|(_, value)| !value.is_empty())
    .map(|(key, value)| format!("{}: {}", key, value))
    .collect()
}

/// Save a plain-text transcript, trimmed, with a single trailing newline
pub fn write_transcript(text: &str, path: &Path) -> Result<()> {
    fs_err::write(path, format!("{}\n", text.trim()))?;
    Ok(())
}

/// Path of the sibling file sharing `media_path`'s basename
pub fn sibling_path(media_path: &Path, extension: &str) -> PathBuf {
    media_path.with_extension(extension)
}
