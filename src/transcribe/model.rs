use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::{DriveScribeError, Result};

const MODEL_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// Maps model names to their whisper.cpp filenames
fn model_filename(model_name: &str) -> String {
    format!("ggml-{}.bin", model_name)
}

/// Default directory for downloaded models
pub fn default_model_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("drive-scribe")
        .join("models")
}

/// Resolve a model name (`small`, `base.en`, ...) or an explicit file path
pub fn resolve_model_path(model: &str, model_dir: &Path) -> PathBuf {
    let as_path = Path::new(model);
    if as_path.is_file() {
        return as_path.to_path_buf();
    }
    model_dir.join(model_filename(model))
}

fn looks_like_path(model: &str) -> bool {
    model.contains(std::path::MAIN_SEPARATOR) || model.contains('/') || model.ends_with(".bin")
}

/// Make sure the model file exists locally, downloading it on first use
///
/// Returns true if the model had to be downloaded.
pub async fn ensure_model(model: &str, model_path: &Path, show_progress: bool) -> Result<bool> {
    if model_path.exists() {
        tracing::debug!(path = %model_path.display(), "model already present");
        return Ok(false);
    }

    // A path cannot be fetched by name
    if looks_like_path(model) {
        return Err(DriveScribeError::DependencyMissing {
            dependency: format!("Whisper model '{}'", model),
            hint: "Check the path or pass a model name such as 'small'.".to_string(),
        });
    }

    tracing::info!(
        model,
        path = %model_path.display(),
        "model not found, starting download"
    );

    download_model(model, model_path, show_progress).await?;
    Ok(true)
}

async fn download_model(model: &str, model_path: &Path, show_progress: bool) -> Result<()> {
    let url = format!("{}/{}", MODEL_BASE_URL, model_filename(model));
    let load_error = |reason: String| DriveScribeError::transcription(model_path, format!("Whisper model '{model}': {reason}"));

    if let Some(parent) = model_path.parent() {
        fs_err::create_dir_all(parent)?;
    }

    let mut response = reqwest::get(&url)
        .await
        .map_err(|e| load_error(format!("failed to download {url}: {e}")))?;

    if !response.status().is_success() {
        return Err(load_error(format!("download failed with HTTP {}: {}", response.status(), url)));
    }

    let progress = if show_progress {
        ProgressBar::new(response.content_length().unwrap_or(0))
    } else {
        ProgressBar::hidden()
    };
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    progress.set_message(format!("Downloading model {model}..."));

    // Renamed into place only once complete
    let temp_path = model_path.with_extension("part");
    let mut file = fs_err::File::create(&temp_path)?;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| load_error(format!("model download interrupted: {e}")))?
    {
        file.write_all(&chunk)?;
        progress.inc(chunk.len() as u64);
    }
    file.flush()?;
    drop(file);

    fs_err::rename(&temp_path, model_path)?;
    progress.finish_with_message("Model ready");

    tracing::info!(path = %model_path.display(), "model downloaded successfully");
    Ok(())
}
