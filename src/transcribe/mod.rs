use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, WhisperState};

use crate::{DriveScribeError, Result};

pub mod audio;
pub mod model;

/// Transcription result with timed segments
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscriptionResult {
    /// The transcribed text
    pub text: String,

    /// Segments in chronological order
    pub segments: Vec<TranscriptSegment>,

    /// Language code used or detected
    pub language: Option<String>,
}

/// Individual transcript segment with timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Start time in seconds
    pub start: f64,

    /// End time in seconds
    pub end: f64,

    /// Segment text
    pub text: String,
}

/// Language selection for a transcription run
#[derive(Debug, Clone, Default)]
pub struct LanguageOptions {
    /// Explicit language code, bypasses detection
    pub language: Option<String>,

    /// Restrict detection to these codes (empty = unrestricted)
    pub allowed_languages: Vec<String>,
}

/// Speech-to-text over a media file on disk
#[async_trait]
pub trait SpeechToText: Send {
    /// Name of the model in use
    fn model_name(&self) -> &str;

    /// Transcribe the media file at `media_path`
    async fn transcribe(&mut self, media_path: &Path, languages: &LanguageOptions) -> Result<TranscriptionResult>;
}

/// Settings for the Whisper engine
#[derive(Debug, Clone)]
pub struct WhisperSettings {
    /// Model name or path to a ggml model file
    pub model: String,

    /// Directory holding downloaded models
    pub model_dir: PathBuf,

    /// Number of CPU threads for inference
    pub threads: usize,

    /// Show a progress bar while fetching a model
    pub show_progress: bool,
}

/// Local Whisper transcriber
///
/// The model is loaded on first use and kept for the lifetime of the value,
/// so one instance should serve a whole batch.
pub struct WhisperTranscriber {
    settings: WhisperSettings,
    context: Option<WhisperContext>,
}

impl WhisperTranscriber {
    pub fn new(settings: WhisperSettings) -> Self {
        Self {
            settings,
            context: None,
        }
    }

    /// Whether the model has been loaded yet
    pub fn is_loaded(&self) -> bool {
        self.context.is_some()
    }

    fn model_error(&self, model_path: &Path, reason: impl std::fmt::Display) -> DriveScribeError {
        DriveScribeError::transcription(model_path, format!("Whisper model '{}': {}", self.settings.model, reason))
    }

    /// Load the model once; later calls are no-ops
    async fn load_context(&mut self) -> Result<()> {
        if self.context.is_some() {
            return Ok(());
        }

        let model_path = model::resolve_model_path(&self.settings.model, &self.settings.model_dir);
        model::ensure_model(&self.settings.model, &model_path, self.settings.show_progress).await?;

        tracing::info!(path = %model_path.display(), "loading whisper model");

        let path_str = model_path
            .to_str()
            .ok_or_else(|| self.model_error(&model_path, "model path contains invalid UTF-8"))?;

        let ctx = WhisperContext::new_with_params(path_str, WhisperContextParameters::default())
            .map_err(|e| self.model_error(&model_path, format!("failed to load: {e:?}")))?;

        tracing::info!("whisper model loaded successfully");
        self.context = Some(ctx);
        Ok(())
    }

    fn threads(&self) -> i32 {
        i32::try_from(self.settings.threads.max(1)).unwrap_or(i32::MAX)
    }
}

/// Pick the most probable language among `allowed`
///
/// `probabilities` is indexed by Whisper language id.
fn pick_allowed_language(probabilities: &[f32], allowed: &[String]) -> Option<String> {
    allowed
        .iter()
        .filter_map(|code| {
            let code = code.trim().to_lowercase();
            let id = whisper_rs::get_lang_id(&code)?;
            let prob = *probabilities.get(usize::try_from(id).ok()?)?;
            Some((code, prob))
        })
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(code, _)| code)
}

/// Run Whisper language detection over the first 30 seconds and restrict it to `allowed`
fn detect_allowed_language(state: &mut WhisperState, samples: &[f32], allowed: &[String], threads: usize) -> Option<String> {
    let result = state
        .pcm_to_mel(samples, threads)
        .and_then(|_| state.lang_detect(0, threads));

    match result {
        Ok((_, probabilities)) => pick_allowed_language(&probabilities, allowed),
        Err(e) => {
            tracing::warn!("language detection failed, falling back to auto-detect: {:?}", e);
            None
        }
    }
}

/// Convert Whisper centisecond timestamps to seconds
fn centis_to_seconds(t: i64) -> f64 {
    t as f64 / 100.0
}

/// Add one decoded segment to the running transcript
fn append_segment(text: &mut String, segments: &mut Vec<TranscriptSegment>, seg_text: &str, start: i64, end: i64) {
    text.push_str(seg_text);
    segments.push(TranscriptSegment {
        start: centis_to_seconds(start),
        end: centis_to_seconds(end),
        text: seg_text.trim().to_string(),
    });
}

fn run_inference(
    ctx: &WhisperContext,
    media_path: &Path,
    samples: &[f32],
    languages: &LanguageOptions,
    threads: i32,
) -> Result<TranscriptionResult> {
    let mut state = ctx
        .create_state()
        .map_err(|e| DriveScribeError::transcription(media_path, format!("failed to create whisper state: {e:?}")))?;

    let language = match languages.language.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
        Some(explicit) => Some(explicit.to_lowercase()),
        None if !languages.allowed_languages.is_empty() => {
            let detected = detect_allowed_language(
                &mut state,
                samples,
                &languages.allowed_languages,
                threads.max(1) as usize,
            );
            if let Some(code) = &detected {
                tracing::info!(language = %code, "detected language within allowed set");
            }
            detected
        }
        None => None,
    };

    let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
    params.set_n_threads(threads);
    params.set_print_special(false);
    params.set_print_progress(false);
    params.set_print_realtime(false);
    params.set_print_timestamps(false);
    params.set_translate(false);
    params.set_language(Some(language.as_deref().unwrap_or("auto")));

    let start = std::time::Instant::now();
    state
        .full(params, samples)
        .map_err(|e| DriveScribeError::transcription(media_path, format!("whisper inference failed: {e:?}")))?;

    let mut text = String::new();
    let mut segments = Vec::new();
    for (index, segment) in state.as_iter().enumerate() {
        // Tokens can split a multibyte character; keep the segment with U+FFFD
        let seg_text = segment.to_str_lossy().map_err(|e| {
            DriveScribeError::transcription(media_path, format!("unreadable text in segment {index}: {e:?}"))
        })?;
        append_segment(
            &mut text,
            &mut segments,
            &seg_text,
            segment.start_timestamp(),
            segment.end_timestamp(),
        );
    }

    let language = language.or_else(|| whisper_rs::get_lang_str(state.full_lang_id_from_state()).map(str::to_string));

    tracing::info!(
        segments = segments.len(),
        language = ?language,
        inference_ms = start.elapsed().as_millis(),
        "transcription completed"
    );

    Ok(TranscriptionResult {
        text: text.trim().to_string(),
        segments,
        language,
    })
}

#[async_trait]
impl SpeechToText for WhisperTranscriber {
    fn model_name(&self) -> &str {
        &self.settings.model
    }

    async fn transcribe(&mut self, media_path: &Path, languages: &LanguageOptions) -> Result<TranscriptionResult> {
        if !media_path.exists() {
            return Err(DriveScribeError::MediaNotFound {
                path: media_path.to_path_buf(),
            });
        }

        audio::ensure_ffmpeg().await?;

        self.load_context().await?;

        let samples = audio::decode_to_pcm(media_path).await?;
        tracing::debug!(
            duration = %crate::utils::format_duration(samples.len() as f64 / f64::from(audio::WHISPER_SAMPLE_RATE)),
            "decoded audio"
        );

        let threads = self.threads();
        let ctx = self
            .context
            .as_ref()
            .ok_or_else(|| self.model_error(&self.settings.model_dir, "model failed to initialize"))?;
        tokio::task::block_in_place(|| run_inference(ctx, media_path, &samples, languages, threads))
    }
}
