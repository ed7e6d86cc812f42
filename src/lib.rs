//! Drive Scribe - A Rust CLI tool for downloading and transcribing Google Drive videos
//!
//! This library resolves Drive file and folder links, downloads video content in
//! ranged chunks, and transcribes it locally with a Whisper model, writing plain
//! text transcripts and SRT subtitles with a provenance header.

pub mod cache;
pub mod cli;
pub mod config;
pub mod download;
pub mod drive;
pub mod output;
pub mod pipeline;
pub mod transcribe;
pub mod utils;

use std::path::PathBuf;

pub use cli::{Cli, Commands, DownloadArgs};
pub use config::Config;
pub use drive::{DriveApi, DriveClient, RemoteFileRef, RemoteMetadata};
pub use pipeline::{BatchSummary, FileOutcome, Pipeline, RunOptions};
pub use transcribe::{SpeechToText, TranscriptSegment, TranscriptionResult, WhisperTranscriber};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, DriveScribeError>;

/// Error types specific to drive-scribe
#[derive(thiserror::Error, Debug)]
pub enum DriveScribeError {
    #[error("Could not parse a valid Drive ID from input: {input}")]
    IdentifierParse { input: String },

    #[error("Drive lookup failed for {id}: {reason}")]
    RemoteLookup { id: String, reason: String },

    #[error("Refusing to overwrite existing file: {}. Use --force to overwrite.", path.display())]
    OverwriteRefused { path: PathBuf },

    #[error("{dependency} not found. {hint}")]
    DependencyMissing { dependency: String, hint: String },

    #[error("Media file not found: {}", path.display())]
    MediaNotFound { path: PathBuf },

    #[error("Transcription failed for {}: {reason}", path.display())]
    Transcription { path: PathBuf, reason: String },

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("File operation failed: {0}")]
    Io(#[from] std::io::Error),
}

impl DriveScribeError {
    pub(crate) fn remote(id: &str, reason: impl std::fmt::Display) -> Self {
        Self::RemoteLookup {
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn transcription(path: &std::path::Path, reason: impl std::fmt::Display) -> Self {
        Self::Transcription {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}
