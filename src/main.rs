use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use drive_scribe::cli::Source;
use drive_scribe::drive::{self, auth};
use drive_scribe::transcribe::{LanguageOptions, WhisperSettings};
use drive_scribe::{utils, BatchSummary, Cli, Commands, Config, DownloadArgs, DriveClient, FileOutcome, Pipeline, RunOptions, WhisperTranscriber};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "drive_scribe=debug" } else { "drive_scribe=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;

    match cli.command {
        Commands::Download(args) => run_download(args, config, !cli.quiet).await,
        Commands::Config { show, init } => {
            if init {
                let path = config.save()?;
                println!("Configuration written to: {}", path.display());
            } else if show {
                config.display();
            } else {
                println!("Config file: {}", Config::config_path()?.display());
                println!("Use --show to print it or --init to write the defaults.");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_download(args: DownloadArgs, config: Config, show_progress: bool) -> Result<ExitCode> {
    // Fail on a bad link before touching credentials
    let source = args.source().context("No source given")?;
    match &source {
        Source::File(input) => {
            drive::parse_file_id(input).with_context(|| format!("Could not parse a valid Drive ID from input: {input}"))?;
        }
        Source::Folder(input) => {
            drive::parse_folder_id(input).with_context(|| format!("Could not parse a valid Drive ID from input: {input}"))?;
        }
    }

    let missing_deps = utils::check_dependencies(args.wants_transcription()).await;
    if !missing_deps.is_empty() {
        eprintln!("⚠️  Dependency check warnings:");
        for dep in missing_deps {
            eprintln!("   • {}", dep);
        }
    }

    if matches!(source, Source::Folder(_)) && (args.transcript_output.is_some() || args.srt_output.is_some()) {
        tracing::warn!("--transcript-output and --srt-output are ignored in folder mode");
    }

    let token_path = args.token.clone().unwrap_or_else(|| config.drive.token_path.clone());
    let token = auth::load_access_token(&token_path)?;
    let client = DriveClient::new(config.drive.api_base_url.clone(), token);

    let transcriber = WhisperTranscriber::new(WhisperSettings {
        model: args.model.clone().unwrap_or_else(|| config.transcription.model.clone()),
        model_dir: config.model_dir(),
        threads: config.transcription.threads,
        show_progress,
    });

    let options = run_options(&args, &config, show_progress);
    let mut pipeline = Pipeline::new(client, transcriber, options);

    match source {
        Source::File(input) => {
            let outcome = pipeline.run_file(&input).await?;
            print_outcome(&outcome);
            Ok(ExitCode::SUCCESS)
        }
        Source::Folder(input) => {
            let summary = pipeline.run_folder(&input).await?;
            print_summary(&summary);
            Ok(if summary.has_failures() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
    }
}

/// Merge CLI flags over config values
fn run_options(args: &DownloadArgs, config: &Config, show_progress: bool) -> RunOptions {
    let allowed_languages = if args.allowed_languages.is_empty() {
        config.transcription.allowed_languages.clone()
    } else {
        args.allowed_languages.clone()
    };

    RunOptions {
        output: args.output.clone(),
        output_dir: args.output_dir.clone().unwrap_or_else(|| config.app.output_dir.clone()),
        force: args.force,
        transcribe: args.transcribe,
        srt: args.srt,
        transcript_output: args.transcript_output.clone(),
        srt_output: args.srt_output.clone(),
        languages: LanguageOptions {
            language: args.language.clone().or_else(|| config.transcription.language.clone()),
            allowed_languages,
        },
        chunk_size: config.chunk_size_bytes(),
        show_progress,
    }
}

fn print_outcome(outcome: &FileOutcome) {
    match outcome {
        FileOutcome::Skipped { video_path, subtitle_path } => {
            println!(
                "{} {} (matching subtitles at {})",
                style("Skipped").yellow().bold(),
                video_path.display(),
                subtitle_path.display()
            );
        }
        FileOutcome::Completed {
            video_path,
            transcript_path,
            subtitle_path,
        } => {
            println!("{} {}", style("Downloaded").green().bold(), video_path.display());
            if let Some(path) = transcript_path {
                println!("  Transcript: {}", path.display());
            }
            if let Some(path) = subtitle_path {
                println!("  Subtitles:  {}", path.display());
            }
        }
    }
}

fn print_summary(summary: &BatchSummary) {
    println!();
    println!("{}", style("Folder summary").bold());
    println!("  Videos:    {}", summary.total);
    println!("  Completed: {}", style(summary.completed).green());
    println!("  Skipped:   {}", style(summary.skipped).yellow());
    if summary.has_failures() {
        println!("  Failed:    {}", style(summary.failed).red().bold());
    } else {
        println!("  Failed:    0");
    }
}
