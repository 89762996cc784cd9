//! m4l CLI - manga chapter downloader.

use anyhow::{Context, Result};
use clap::Parser;
use m4l::config::Config;
use m4l::console::Console;
use m4l::history::HistoryLedger;
use m4l::naming::{Title, expand_chapter_list};
use m4l::pipeline::{BatchOutcome, Downloader};
use m4l::source::ReqwestSource;
use std::path::PathBuf;
use std::sync::Arc;

/// Manga chapter downloader.
#[derive(Parser, Debug)]
#[command(name = "m4l")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Name of the manga to download.
    #[arg(short, long, value_name = "MANGA_NAME")]
    download: Option<String>,

    /// Chapters to download, e.g. 1,2-5,10.5 (prompted for when omitted).
    #[arg(short, long, value_name = "CHAPTERS")]
    chapters: Option<String>,

    /// Show download history.
    #[arg(long)]
    history: bool,

    /// Format manga name to uppercase.
    #[arg(short, long)]
    uppercase: bool,

    /// Use the manga name exactly as typed instead of formatting it.
    #[arg(short, long)]
    edit: bool,

    /// Maximum concurrent page downloads.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    max_connections: Option<u32>,

    /// Skip the confirmation prompt.
    #[arg(short = 'y', long)]
    yes: bool,

    /// Use this config file instead of the default location.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Show debug logging.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    m4l::logging::init(args.verbose)?;
    let console = Console::new();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;

    if let Some(max_connections) = args.max_connections {
        config.download.max_connections = max_connections as usize;
    }
    config.validate().context("Invalid configuration")?;

    if args.history {
        return show_history(&console, &config).await;
    }

    let Some(name) = args.download.as_deref() else {
        anyhow::bail!("Invalid arguments. Use -h for help.");
    };

    let input = match &args.chapters {
        Some(chapters) => chapters.clone(),
        None => console
            .prompt("Enter chapter numbers to download, separated by commas: ")
            .context("Failed to read chapter list")?,
    };
    let chapters = expand_chapter_list(&input).context("Invalid chapter list")?;
    if chapters.is_empty() {
        anyhow::bail!("No chapters given");
    }

    let source = ReqwestSource::new(&config.source, config.download.max_connections)
        .context("Failed to create HTTP client")?;
    let downloader = Downloader::new(
        Title::new(name, args.uppercase, args.edit),
        Arc::new(source),
        config.source.host.clone(),
        config.download.clone(),
    );
    console.section(&format!("m4l - {}", downloader.title()));

    console.step(&format!("Counting pages in {} chapters...", chapters.len()));
    let gate = console.gate(args.yes);
    match downloader.run(&chapters, gate.as_ref(), &console).await {
        BatchOutcome::Aborted(_) => console.info("Download canceled by user."),
        BatchOutcome::Completed(report) => {
            // Move past the progress bar line.
            println!();
            console.show_report(&report);
            console.section("Done!");
        }
    }

    Ok(())
}

/// Prints the download history ledger.
async fn show_history(console: &Console, config: &Config) -> Result<()> {
    let ledger = HistoryLedger::new(config.download.history_file.clone());

    match ledger.read().await.context("Failed to read download history")? {
        None => console.info("No history file found."),
        Some(titles) if titles.is_empty() => console.info("No download history found."),
        Some(titles) => {
            console.section("Download History:");
            for title in titles {
                println!("{}", title);
            }
        }
    }

    Ok(())
}
