use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "drive-scribe",
    about = "Drive Scribe - Download Google Drive videos and transcribe them locally with Whisper",
    version,
    long_about = "A CLI tool for downloading videos from Google Drive (single files or whole folders) and optionally producing transcripts and SRT subtitles with a local Whisper model."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download a Drive video or every video in a folder
    Download(DownloadArgs),

    /// Show or initialize the configuration file
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,

        /// Write a default configuration file
        #[arg(long, conflicts_with = "show")]
        init: bool,
    },
}

#[derive(Args, Debug, Clone)]
#[command(group(
    clap::ArgGroup::new("source")
        .required(true)
        .args(["file_id", "url", "folder_id", "folder_url"])
))]
pub struct DownloadArgs {
    /// Drive file ID of the video
    #[arg(long, value_name = "ID")]
    pub file_id: Option<String>,

    /// Full Google Drive URL of the video
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,

    /// Drive folder ID to process all video files inside
    #[arg(long, value_name = "ID")]
    pub folder_id: Option<String>,

    /// Full Google Drive folder URL to process all video files inside
    #[arg(long, value_name = "URL")]
    pub folder_url: Option<String>,

    /// Output file path (single-file mode; a directory keeps the Drive filename)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Directory to save downloads (default: config app.output_dir, ./out)
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Overwrite output file(s) if they exist
    #[arg(long)]
    pub force: bool,

    /// Transcribe the downloaded media with Whisper and write a .txt transcript
    #[arg(long)]
    pub transcribe: bool,

    /// Also write an .srt subtitle file from the Whisper segments
    #[arg(long)]
    pub srt: bool,

    /// Whisper model name (tiny/base/small/medium/large-v3) or path to a ggml model
    #[arg(long, value_name = "NAME")]
    pub model: Option<String>,

    /// Language code for transcription (auto-detect if not specified)
    #[arg(short, long, value_name = "LANG")]
    pub language: Option<String>,

    /// Restrict language auto-detection to these codes (comma separated)
    #[arg(long, value_name = "LANGS", value_delimiter = ',')]
    pub allowed_languages: Vec<String>,

    /// Path to write the transcript .txt (single-file mode only)
    #[arg(long, value_name = "FILE")]
    pub transcript_output: Option<PathBuf>,

    /// Path to write the .srt (single-file mode only)
    #[arg(long, value_name = "FILE")]
    pub srt_output: Option<PathBuf>,

    /// OAuth token file holding the Drive access token
    #[arg(long, value_name = "FILE", env = "GOOGLE_OAUTH_TOKEN")]
    pub token: Option<PathBuf>,
}

/// Where the videos come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    File(String),
    Folder(String),
}

impl DownloadArgs {
    /// The selected source, file or folder
    pub fn source(&self) -> Option<Source> {
        if let Some(input) = self.file_id.as_ref().or(self.url.as_ref()) {
            return Some(Source::File(input.clone()));
        }
        self.folder_id
            .as_ref()
            .or(self.folder_url.as_ref())
            .map(|input| Source::Folder(input.clone()))
    }

    /// Whether any transcription output was requested
    pub fn wants_transcription(&self) -> bool {
        self.transcribe || self.srt
    }
}
