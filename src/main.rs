//! mediafetch - download and transcode orchestration
//!
//! Command-line entry point over the orchestrator: fetch metadata, download
//! with a progress bar, update the downloader, and run transcoder jobs.

use anyhow::{anyhow, bail, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tracing::{info, warn, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mediafetch::cli::{Args, Commands};
use mediafetch::config::Config;
use mediafetch::item::{DownloadOptions, DownloadableItem};
use mediafetch::orchestrator::{Invocation, Orchestrator};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.verbose)?;

    // Load configuration
    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if std::path::Path::new("mediafetch.toml").exists() {
                info!("Found mediafetch.toml in current directory, loading...");
                Config::from_file("mediafetch.toml")?
            } else {
                Config::default()
            }
        }
    };

    let orchestrator = Orchestrator::system(config.tools.clone());
    let work_dir = orchestrator.work_dir().to_path_buf();

    match args.command {
        Commands::Info { url } => {
            for item in fetch_items(&orchestrator, &url).await? {
                println!("{}", serde_json::to_string_pretty(&item)?);
            }
        }
        Commands::Download {
            url,
            audio,
            video_format,
            audio_format,
            output_dir,
            max_height,
            max_abr,
            compat,
        } => {
            let mut options = config.download.clone();
            if let Some(format) = video_format {
                options.video_format = format;
            }
            if let Some(format) = audio_format {
                options.audio_format = format;
            }
            if let Some(dir) = output_dir {
                options.download_location = dir;
            }
            options.compatibility_mode |= compat;

            let items = fetch_items(&orchestrator, &url).await?;
            if items.is_empty() {
                bail!("No downloadable item found for {}", url);
            }

            for mut item in items {
                item.is_chosen = true;
                item.is_audio_chosen = audio;
                if let Some(height) = max_height {
                    item.formats.choose_video_at_most(height);
                }
                if let Some(abr) = max_abr {
                    item.formats.choose_audio_at_most(abr);
                }
                download_item(&orchestrator, &item, &options).await?;
            }
        }
        Commands::Update => {
            let invocation = orchestrator.update_tool(&work_dir, |message| println!("{}", message))?;
            settle(&orchestrator, invocation, "update").await?;
        }
        Commands::Check => {
            match orchestrator.probe_version().await {
                Some(found) => println!(
                    "Downloader: {} {} ({})",
                    found.binary,
                    found.version,
                    found.path.display()
                ),
                None => println!(
                    "Downloader: not found (tried {})",
                    config.tools.downloader_candidates.join(", ")
                ),
            }
            match orchestrator.probe_transcoder().await {
                Some(found) => println!(
                    "Transcoder: {} ({})",
                    found.version.lines().next().unwrap_or_default(),
                    found.path.display()
                ),
                None => println!("Transcoder: {} not found", config.tools.transcoder),
            }
        }
        Commands::Merge {
            url,
            output,
            video_format,
            audio_format,
        } => {
            let invocation = orchestrator
                .merge_streams(&url, &video_format, &audio_format, &output, &work_dir)
                .await?;
            settle(&orchestrator, invocation, &output.to_string_lossy()).await?;
            println!("{}", output.display());
        }
        Commands::Gif { input, output } => {
            let invocation = orchestrator.convert_to_gif(&input, &output, &work_dir)?;
            settle(&orchestrator, invocation, &output.to_string_lossy()).await?;
            println!("{}", output.display());
        }
    }

    Ok(())
}

/// Collect every full item the downloader reports for `url`
async fn fetch_items(orchestrator: &Orchestrator, url: &str) -> Result<Vec<DownloadableItem>> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let invocation = orchestrator.fetch_info(url, orchestrator.work_dir(), move |item| {
        let _ = tx.send(item);
    })?;
    settle(orchestrator, invocation, url).await?;

    let mut items = Vec::new();
    while let Some(item) = rx.recv().await {
        items.push(item);
    }
    Ok(items)
}

async fn download_item(
    orchestrator: &Orchestrator,
    item: &DownloadableItem,
    options: &DownloadOptions,
) -> Result<()> {
    info!("Downloading {} ({})", item.info.title, item.url());

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos:>3}% {msg}")?
            .progress_chars("#>-"),
    );
    pb.set_message(item.info.title.clone());

    let bar = pb.clone();
    let invocation = orchestrator.download(item, options, orchestrator.work_dir(), move |event| {
        if let Some(progress) = &event.progress {
            bar.set_position(progress.value.clamp(0.0, 100.0) as u64);
            if let (Some(speed), Some(eta)) = (&progress.speed, &progress.eta) {
                bar.set_message(format!("{} ETA {}", speed, eta));
            }
        }
        if let Some(path) = &event.filepath {
            bar.println(format!("-> {}", path));
        }
    })?;

    let result = settle(orchestrator, invocation, item.url()).await;
    pb.finish_and_clear();
    result
}

/// Wait for an invocation, pausing it on Ctrl-C
async fn settle(orchestrator: &Orchestrator, invocation: Invocation, id: &str) -> Result<()> {
    let Some(completion) = invocation.completion() else {
        warn!("{} is already running", id);
        return Err(anyhow!("{} is already running", id));
    };

    let wait = completion.wait();
    tokio::pin!(wait);
    tokio::select! {
        result = &mut wait => result?,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, stopping {}", id);
            orchestrator.pause(id);
            wait.await?;
        }
    }
    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".mediafetch").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "mediafetch.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Console output goes to stderr so stdout stays clean for JSON
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}",
          log_level, log_dir.join("mediafetch.log").display());

    Ok(())
}
