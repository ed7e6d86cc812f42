use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::utils::check_command_available;
use crate::{DriveScribeError, Result};

/// Sample rate Whisper models expect
pub const WHISPER_SAMPLE_RATE: u32 = 16_000;

const FFMPEG: &str = "ffmpeg";

/// Fail with `DependencyMissing` unless ffmpeg can be executed
pub async fn ensure_ffmpeg() -> Result<()> {
    if check_command_available(FFMPEG, "-version").await {
        Ok(())
    } else {
        Err(DriveScribeError::DependencyMissing {
            dependency: FFMPEG.to_string(),
            hint: "Please install ffmpeg and make sure it is on PATH.".to_string(),
        })
    }
}

/// Decode any media file to 16 kHz mono f32 PCM using ffmpeg
pub async fn decode_to_pcm(media_path: &Path) -> Result<Vec<f32>> {
    tracing::debug!("Decoding audio from {}", media_path.display());

    let output = Command::new(FFMPEG)
        .arg("-nostdin")
        .args(["-v", "error"])
        .arg("-i")
        .arg(media_path)
        .args(["-vn", "-ac", "1"])
        .args(["-ar", &WHISPER_SAMPLE_RATE.to_string()])
        .args(["-f", "f32le", "-"])
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| DriveScribeError::transcription(media_path, format!("failed to run ffmpeg: {e}")))?;

    if !output.status.success() {
        let error = String::from_utf8_lossy(&output.stderr);
        return Err(DriveScribeError::transcription(
            media_path,
            format!("ffmpeg could not decode audio: {}", error.trim()),
        ));
    }

    let samples = pcm_from_f32le(&output.stdout);
    if samples.is_empty() {
        return Err(DriveScribeError::transcription(media_path, "no audio stream found"));
    }

    Ok(samples)
}

/// Reinterpret little-endian f32 bytes as samples, dropping a trailing partial sample
fn pcm_from_f32le(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}
