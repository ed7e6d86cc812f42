//! SRT subtitle writing and provenance header parsing.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::transcribe::TranscriptSegment;
use crate::Result;

/// Prefix marking a provenance header line
pub const HEADER_PREFIX: &str = "# ";

/// Format seconds as an SRT timestamp (`HH:MM:SS,mmm`)
///
/// Negative and non-finite input clamps to zero. Milliseconds are rounded on
/// the whole value, so a rounded-up 1000 ms carries into the seconds field and
/// from there into minutes and hours.
pub fn format_timestamp(seconds: f64) -> String {
    let seconds = if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.0
    };

    let total_millis = (seconds * 1000.0).round() as u64;
    let hours = total_millis / 3_600_000;
    let minutes = (total_millis % 3_600_000) / 60_000;
    let secs = (total_millis % 60_000) / 1000;
    let millis = total_millis % 1000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// Render segments as numbered SRT blocks
pub fn to_subtitle_text(segments: &[TranscriptSegment]) -> String {
    let mut out = String::new();

    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = writeln!(out, "{}", i + 1);
        let _ = writeln!(
            out,
            "{} --> {}",
            format_timestamp(segment.start),
            format_timestamp(segment.end)
        );
        let _ = writeln!(out, "{}", segment.text.trim());
    }

    out
}

/// Render the comment block that precedes the subtitle body
fn render_header(header_lines: &[String]) -> String {
    let lines: Vec<&str> = header_lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    if lines.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    for line in lines {
        out.push_str(HEADER_PREFIX);
        out.push_str(line);
        out.push('\n');
    }
    out.push('\n');
    out
}

/// Write an SRT file, optionally preceded by `# key: value` header lines
pub fn write_subtitle_file(
    segments: &[TranscriptSegment],
    path: &Path,
    header_lines: &[String],
) -> Result<()> {
    let mut content = render_header(header_lines);
    content.push_str(&to_subtitle_text(segments));

    fs_err::write(path, content)?;
    Ok(())
}

/// Read the leading `# key: value` block of a subtitle file
///
/// Parsing stops at the first blank or non-comment line. Comment lines
/// without a `:` are ignored. Any I/O failure yields an empty map.
pub fn read_header(path: &Path) -> BTreeMap<String, String> {
    let file = match fs_err::File::open(path) {
        Ok(file) => file,
        Err(e) => {
            tracing::debug!("could not open subtitle header: {}", e);
            return BTreeMap::new();
        }
    };

    let mut info = BTreeMap::new();
    for line in BufReader::new(file).lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::debug!(path = %path.display(), "subtitle header unreadable: {}", e);
                return BTreeMap::new();
            }
        };

        let line = line.trim_end_matches('\r');
        let Some(payload) = line.strip_prefix(HEADER_PREFIX) else {
            break;
        };

        if let Some((key, value)) = payload.trim().split_once(':') {
            info.insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    info
}
