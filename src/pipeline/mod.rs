use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::{self, SkipDecision};
use crate::download;
use crate::drive::{self, DriveApi, RemoteFileRef};
use crate::output::{self, build_header_lines, sibling_path};
use crate::transcribe::{LanguageOptions, SpeechToText};
use crate::utils::sanitize_filename;
use crate::{DriveScribeError, Result};

/// Everything the orchestrator needs to know about one invocation
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Explicit destination for single-file mode (a directory keeps the Drive name)
    pub output: Option<PathBuf>,

    /// Directory for downloads without an explicit destination
    pub output_dir: PathBuf,

    /// Overwrite existing files
    pub force: bool,

    /// Write a `.txt` transcript
    pub transcribe: bool,

    /// Write an `.srt` subtitle file
    pub srt: bool,

    /// Transcript path override (single-file mode)
    pub transcript_output: Option<PathBuf>,

    /// Subtitle path override (single-file mode)
    pub srt_output: Option<PathBuf>,

    /// Language selection passed to the transcriber
    pub languages: LanguageOptions,

    /// Bytes per ranged download request
    pub chunk_size: u64,

    /// Show progress bars
    pub show_progress: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            output: None,
            output_dir: PathBuf::from("out"),
            force: false,
            transcribe: false,
            srt: false,
            transcript_output: None,
            srt_output: None,
            languages: LanguageOptions::default(),
            chunk_size: download::DEFAULT_CHUNK_SIZE,
            show_progress: true,
        }
    }
}

impl RunOptions {
    fn wants_transcription(&self) -> bool {
        self.transcribe || self.srt
    }
}

/// Result of processing one video
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// A matching subtitle file was already present
    Skipped {
        video_path: PathBuf,
        subtitle_path: PathBuf,
    },
    /// The video was downloaded (and transcribed if requested)
    Completed {
        video_path: PathBuf,
        transcript_path: Option<PathBuf>,
        subtitle_path: Option<PathBuf>,
    },
}

/// Counts for a folder run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Per-file output path overrides, only honored in single-file mode
#[derive(Debug, Default)]
struct OutputPaths {
    transcript: Option<PathBuf>,
    subtitle: Option<PathBuf>,
}

/// Download and transcription workflow over a Drive API and a speech model
///
/// The transcriber lives as long as the pipeline, so a folder run loads the
/// model at most once.
pub struct Pipeline<D, T> {
    drive: D,
    transcriber: T,
    options: RunOptions,
}

impl<D: DriveApi, T: SpeechToText> Pipeline<D, T> {
    pub fn new(drive: D, transcriber: T, options: RunOptions) -> Self {
        Self {
            drive,
            transcriber,
            options,
        }
    }

    pub fn transcriber(&self) -> &T {
        &self.transcriber
    }

    /// Process a single file given by ID or URL
    pub async fn run_file(&mut self, input: &str) -> Result<FileOutcome> {
        let id = drive::parse_file_id(input).ok_or_else(|| DriveScribeError::IdentifierParse {
            input: input.to_string(),
        })?;

        let file = drive::resolve_name(&self.drive, &id).await?;
        if !drive::is_video_mime(&file.mime_type) {
            tracing::warn!("File mimeType '{}' does not look like a video.", file.mime_type);
        }

        let target = match &self.options.output {
            Some(output) if output.is_dir() => output.join(sanitize_filename(&file.name)),
            Some(output) => output.clone(),
            None => self.options.output_dir.join(sanitize_filename(&file.name)),
        };

        let paths = OutputPaths {
            transcript: self.options.transcript_output.clone(),
            subtitle: self.options.srt_output.clone(),
        };

        self.process(&file, target, paths).await
    }

    /// Process every video in a folder given by ID or URL
    ///
    /// Per-item failures are logged and counted; only an unparseable folder
    /// or a failed listing aborts the run.
    pub async fn run_folder(&mut self, input: &str) -> Result<BatchSummary> {
        let folder_id = drive::parse_folder_id(input).ok_or_else(|| DriveScribeError::IdentifierParse {
            input: input.to_string(),
        })?;

        let videos = drive::list_videos(&self.drive, &folder_id).await?;
        let mut summary = BatchSummary {
            total: videos.len(),
            ..Default::default()
        };

        if videos.is_empty() {
            tracing::warn!(folder = %folder_id, "No video files found in folder");
            return Ok(summary);
        }

        tracing::info!(folder = %folder_id, count = videos.len(), "Processing folder");

        for (index, video) in videos.iter().enumerate() {
            tracing::info!("[{}/{}] {}", index + 1, videos.len(), video.name);

            let target = self.options.output_dir.join(sanitize_filename(&video.name));
            match self.process(video, target, OutputPaths::default()).await {
                Ok(FileOutcome::Skipped { .. }) => summary.skipped += 1,
                Ok(FileOutcome::Completed { .. }) => summary.completed += 1,
                Err(e) => {
                    tracing::error!(id = %video.id, name = %video.name, "Failed: {}", e);
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    async fn process(&mut self, file: &RemoteFileRef, target: PathBuf, paths: OutputPaths) -> Result<FileOutcome> {
        if self.options.wants_transcription() {
            if let SkipDecision::Skip { subtitle_path } = cache::should_skip(&target, &file.id, &self.drive).await {
                tracing::info!(
                    "Skipping download/transcription for '{}' (matching SRT found).",
                    file.name
                );
                return Ok(FileOutcome::Skipped {
                    video_path: target,
                    subtitle_path,
                });
            }
        }

        if target.exists() && !self.options.force {
            return Err(DriveScribeError::OverwriteRefused { path: target });
        }

        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs_err::create_dir_all(parent)?;
        }

        self.download_to(file, &target).await?;
        tracing::info!("Downloaded to: {}", target.display());

        if !self.options.wants_transcription() {
            return Ok(FileOutcome::Completed {
                video_path: target,
                transcript_path: None,
                subtitle_path: None,
            });
        }

        let (transcript_path, subtitle_path) = self.write_outputs(file, &target, paths).await?;

        Ok(FileOutcome::Completed {
            video_path: target,
            transcript_path,
            subtitle_path,
        })
    }

    async fn download_to(&self, file: &RemoteFileRef, target: &Path) -> Result<()> {
        let progress = self.progress_bar(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        progress.set_message(format!("Downloading {}...", file.name));

        let result = download::download(
            &self.drive,
            &file.id,
            target,
            self.options.chunk_size,
            |pct, downloaded, total| {
                progress.set_position(downloaded);
                match total {
                    Some(total) => {
                        progress.set_length(total);
                        progress.set_message(format!("Downloading {}... {}%", file.name, pct));
                    }
                    None => progress.set_message(format!("Downloading {}...", file.name)),
                }
            },
        )
        .await;

        match &result {
            Ok(_) => progress.finish_with_message("Download complete"),
            Err(_) => progress.abandon_with_message("Download failed"),
        }

        result.map(|_| ())
    }

    async fn write_outputs(
        &mut self,
        file: &RemoteFileRef,
        video_path: &Path,
        paths: OutputPaths,
    ) -> Result<(Option<PathBuf>, Option<PathBuf>)> {
        let spinner = self.progress_bar(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(format!(
            "Transcribing '{}' with Whisper model '{}'...",
            file.name,
            self.transcriber.model_name()
        ));
        spinner.enable_steady_tick(Duration::from_millis(120));

        let result = self.transcriber.transcribe(video_path, &self.options.languages).await;
        spinner.finish_and_clear();
        let result = result?;

        let transcript_path = if self.options.transcribe {
            let path = paths.transcript.unwrap_or_else(|| sibling_path(video_path, "txt"));
            output::write_transcript(&result.text, &path)?;
            tracing::info!("Transcript saved to {}", path.display());
            Some(path)
        } else {
            None
        };

        let subtitle_path = if self.options.srt {
            if result.segments.is_empty() {
                return Err(DriveScribeError::transcription(video_path, "No segments found to write SRT."));
            }

            let header = match self.drive.get_metadata(&file.id).await {
                Ok(meta) => build_header_lines(&meta),
                Err(e) => {
                    tracing::debug!(id = %file.id, "writing SRT without provenance header: {}", e);
                    Vec::new()
                }
            };

            let path = paths.subtitle.unwrap_or_else(|| sibling_path(video_path, "srt"));
            output::write_subtitle_file(&result.segments, &path, &header)?;
            tracing::info!("SRT saved to {}", path.display());
            Some(path)
        } else {
            None
        };

        Ok((transcript_path, subtitle_path))
    }

    fn progress_bar(&self, style: ProgressStyle) -> ProgressBar {
        if !self.options.show_progress {
            return ProgressBar::hidden();
        }

        let bar = ProgressBar::new(0);
        bar.set_style(style);
        bar
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::{FilePage, MediaChunk, MockDriveApi, RemoteMetadata};
    use crate::transcribe::{TranscriptSegment, TranscriptionResult};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const OWNER: &str = "Jane Doe";
    const MODIFIED: &str = "2025-01-16T08:06:53.000Z";

    /// In-memory Drive with a single folder
    #[derive(Default)]
    struct FakeDrive {
        files: Vec<(RemoteFileRef, Vec<u8>)>,
        failing: HashSet<String>,
        media_calls: AtomicUsize,
    }

    impl FakeDrive {
        fn with_videos(names: &[(&str, &str)]) -> Self {
            Self {
                files: names
                    .iter()
                    .map(|(id, name)| {
                        (
                            RemoteFileRef {
                                id: id.to_string(),
                                name: name.to_string(),
                                mime_type: "video/mp4".to_string(),
                            },
                            format!("bytes of {name}").into_bytes(),
                        )
                    })
                    .collect(),
                ..Default::default()
            }
        }

        fn find(&self, id: &str) -> Result<&(RemoteFileRef, Vec<u8>)> {
            self.files
                .iter()
                .find(|(f, _)| f.id == id)
                .ok_or_else(|| DriveScribeError::remote(id, "HTTP 404: File not found"))
        }
    }

    #[async_trait]
    impl DriveApi for FakeDrive {
        async fn get_metadata(&self, id: &str) -> Result<RemoteMetadata> {
            let (file, _) = self.find(id)?;
            Ok(RemoteMetadata {
                name: file.name.clone(),
                mime_type: file.mime_type.clone(),
                owner_display_name: OWNER.to_string(),
                modified_time: MODIFIED.to_string(),
            })
        }

        async fn get_media_range(&self, id: &str, offset: u64, len: u64) -> Result<MediaChunk> {
            self.media_calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.contains(id) {
                return Err(DriveScribeError::remote(id, "connection reset by peer"));
            }
            let (_, content) = self.find(id)?;
            let start = (offset as usize).min(content.len());
            let end = (start + len as usize).min(content.len());
            Ok(MediaChunk {
                bytes: content[start..end].to_vec(),
                total_size: Some(content.len() as u64),
            })
        }

        async fn list_children(&self, _folder_id: &str, _page_token: Option<String>) -> Result<FilePage> {
            Ok(FilePage {
                files: self.files.iter().map(|(f, _)| f.clone()).collect(),
                next_page_token: None,
            })
        }
    }

    /// Transcriber that records calls and returns canned segments
    #[derive(Default)]
    struct FakeTranscriber {
        calls: Vec<PathBuf>,
        segments: Vec<TranscriptSegment>,
    }

    impl FakeTranscriber {
        fn speaking() -> Self {
            Self {
                calls: Vec::new(),
                segments: vec![
                    TranscriptSegment {
                        start: 0.0,
                        end: 1.5,
                        text: " Hello.".to_string(),
                    },
                    TranscriptSegment {
                        start: 1.5,
                        end: 3.0,
                        text: " Goodbye.".to_string(),
                    },
                ],
            }
        }
    }

    #[async_trait]
    impl SpeechToText for FakeTranscriber {
        fn model_name(&self) -> &str {
            "fake"
        }

        async fn transcribe(&mut self, media_path: &Path, _languages: &LanguageOptions) -> Result<TranscriptionResult> {
            if !media_path.exists() {
                return Err(DriveScribeError::MediaNotFound {
                    path: media_path.to_path_buf(),
                });
            }
            self.calls.push(media_path.to_path_buf());
            Ok(TranscriptionResult {
                text: " Hello. Goodbye. ".to_string(),
                segments: self.segments.clone(),
                language: Some("en".to_string()),
            })
        }
    }

    fn options(dir: &Path) -> RunOptions {
        RunOptions {
            output_dir: dir.to_path_buf(),
            chunk_size: 4,
            show_progress: false,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_folder_failure_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let mut drive = FakeDrive::with_videos(&[("VID0000001", "one.mp4"), ("VID0000002", "two.mp4"), ("VID0000003", "three.mp4")]);
        drive.failing.insert("VID0000002".to_string());

        let mut pipeline = Pipeline::new(drive, FakeTranscriber::speaking(), options(dir.path()));
        let summary = pipeline.run_folder("https://drive.google.com/drive/folders/F0lderId12345").await.unwrap();

        assert_eq!(
            summary,
            BatchSummary {
                total: 3,
                completed: 2,
                skipped: 0,
                failed: 1
            }
        );
        assert!(summary.has_failures());
        assert_eq!(std::fs::read(dir.path().join("one.mp4")).unwrap(), b"bytes of one.mp4");
        assert_eq!(std::fs::read(dir.path().join("three.mp4")).unwrap(), b"bytes of three.mp4");
    }

    #[tokio::test]
    async fn test_folder_reuses_one_transcriber() {
        let dir = tempfile::tempdir().unwrap();
        let drive = FakeDrive::with_videos(&[("VID0000001", "one.mp4"), ("VID0000002", "two.mp4")]);
        let mut opts = options(dir.path());
        opts.srt = true;

        let mut pipeline = Pipeline::new(drive, FakeTranscriber::speaking(), opts);
        let summary = pipeline.run_folder("F0lderId12345").await.unwrap();

        assert_eq!(summary.completed, 2);
        assert_eq!(pipeline.transcriber().calls.len(), 2);
        assert!(dir.path().join("one.srt").exists());
        assert!(dir.path().join("two.srt").exists());
    }

    #[tokio::test]
    async fn test_single_file_writes_transcript_and_subtitles() {
        let dir = tempfile::tempdir().unwrap();
        let drive = FakeDrive::with_videos(&[("ABCDEFGHIJ1234", "Weekly Sync.mp4")]);
        let mut opts = options(dir.path());
        opts.transcribe = true;
        opts.srt = true;

        let mut pipeline = Pipeline::new(drive, FakeTranscriber::speaking(), opts);
        let outcome = pipeline
            .run_file("https://drive.google.com/file/d/ABCDEFGHIJ1234/view?usp=sharing")
            .await
            .unwrap();

        let video = dir.path().join("Weekly Sync.mp4");
        assert_eq!(
            outcome,
            FileOutcome::Completed {
                video_path: video.clone(),
                transcript_path: Some(dir.path().join("Weekly Sync.txt")),
                subtitle_path: Some(dir.path().join("Weekly Sync.srt")),
            }
        );
        assert_eq!(
            std::fs::read_to_string(dir.path().join("Weekly Sync.txt")).unwrap(),
            "Hello. Goodbye.\n"
        );
        assert_eq!(
            std::fs::read_to_string(dir.path().join("Weekly Sync.srt")).unwrap(),
            "# Owner: Jane Doe\n# Modified: 2025-01-16T08:06:53.000Z\n\n\
             1\n00:00:00,000 --> 00:00:01,500\nHello.\n\n\
             2\n00:00:01,500 --> 00:00:03,000\nGoodbye.\n"
        );
    }

    #[tokio::test]
    async fn test_second_run_skips_with_matching_subtitle() {
        let dir = tempfile::tempdir().unwrap();
        let drive = FakeDrive::with_videos(&[("ABCDEFGHIJ1234", "talk.mp4")]);
        let mut opts = options(dir.path());
        opts.srt = true;

        let mut pipeline = Pipeline::new(drive, FakeTranscriber::speaking(), opts);
        pipeline.run_file("ABCDEFGHIJ1234").await.unwrap();
        let calls_after_first = pipeline.drive.media_calls.load(Ordering::SeqCst);

        let outcome = pipeline.run_file("ABCDEFGHIJ1234").await.unwrap();

        assert_eq!(
            outcome,
            FileOutcome::Skipped {
                video_path: dir.path().join("talk.mp4"),
                subtitle_path: dir.path().join("talk.srt"),
            }
        );
        assert_eq!(pipeline.drive.media_calls.load(Ordering::SeqCst), calls_after_first);
        assert_eq!(pipeline.transcriber().calls.len(), 1);
    }

    #[tokio::test]
    async fn test_existing_destination_refused_before_content_request() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("talk.mp4"), b"already here").unwrap();

        let mut drive = MockDriveApi::new();
        drive.expect_get_metadata().returning(|_| {
            Ok(RemoteMetadata {
                name: "talk.mp4".to_string(),
                mime_type: "video/mp4".to_string(),
                owner_display_name: OWNER.to_string(),
                modified_time: MODIFIED.to_string(),
            })
        });
        drive.expect_get_media_range().times(0);

        let mut pipeline = Pipeline::new(drive, FakeTranscriber::speaking(), options(dir.path()));
        let err = pipeline.run_file("ABCDEFGHIJ1234").await.unwrap_err();

        assert!(matches!(err, DriveScribeError::OverwriteRefused { .. }));
        assert_eq!(std::fs::read(dir.path().join("talk.mp4")).unwrap(), b"already here");
    }

    #[tokio::test]
    async fn test_force_overwrites_existing_destination() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("talk.mp4"), b"old").unwrap();
        let drive = FakeDrive::with_videos(&[("ABCDEFGHIJ1234", "talk.mp4")]);
        let mut opts = options(dir.path());
        opts.force = true;

        let mut pipeline = Pipeline::new(drive, FakeTranscriber::default(), opts);
        pipeline.run_file("ABCDEFGHIJ1234").await.unwrap();

        assert_eq!(std::fs::read(dir.path().join("talk.mp4")).unwrap(), b"bytes of talk.mp4");
    }

    #[tokio::test]
    async fn test_output_directory_keeps_remote_name() {
        let dir = tempfile::tempdir().unwrap();
        let custom = dir.path().join("custom");
        std::fs::create_dir(&custom).unwrap();
        let drive = FakeDrive::with_videos(&[("ABCDEFGHIJ1234", "talk.mp4")]);
        let mut opts = options(dir.path());
        opts.output = Some(custom.clone());

        let mut pipeline = Pipeline::new(drive, FakeTranscriber::default(), opts);
        let outcome = pipeline.run_file("ABCDEFGHIJ1234").await.unwrap();

        assert_eq!(
            outcome,
            FileOutcome::Completed {
                video_path: custom.join("talk.mp4"),
                transcript_path: None,
                subtitle_path: None,
            }
        );
    }

    #[tokio::test]
    async fn test_srt_without_segments_fails() {
        let dir = tempfile::tempdir().unwrap();
        let drive = FakeDrive::with_videos(&[("ABCDEFGHIJ1234", "silent.mp4")]);
        let mut opts = options(dir.path());
        opts.srt = true;

        let mut pipeline = Pipeline::new(drive, FakeTranscriber::default(), opts);
        let err = pipeline.run_file("ABCDEFGHIJ1234").await.unwrap_err();

        assert!(matches!(err, DriveScribeError::Transcription { .. }));
        assert!(!dir.path().join("silent.srt").exists());
    }

    #[tokio::test]
    async fn test_unparseable_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = Pipeline::new(FakeDrive::default(), FakeTranscriber::default(), options(dir.path()));

        let err = pipeline.run_file("not a valid id").await.unwrap_err();
        assert!(matches!(err, DriveScribeError::IdentifierParse { .. }));

        let err = pipeline.run_folder("https://example.com/nothing").await.unwrap_err();
        assert!(matches!(err, DriveScribeError::IdentifierParse { .. }));
    }

    #[tokio::test]
    async fn test_missing_remote_file_is_lookup_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = Pipeline::new(FakeDrive::default(), FakeTranscriber::default(), options(dir.path()));

        let err = pipeline.run_file("ABCDEFGHIJ1234").await.unwrap_err();
        assert!(matches!(err, DriveScribeError::RemoteLookup { .. }));
    }
}
