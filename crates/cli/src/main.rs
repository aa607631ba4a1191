use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cli::{output, render};
use genre_core::config::{self, AppConfig};
use genre_core::export;
use genre_core::pipeline;
use genre_core::{HistoryError, HistoryManager, MediaFile};
use std::path::{Path, PathBuf};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref())?;
    let history = pipeline::open_history(&cfg).await?;

    match cli.command {
        Commands::Classify { file, json } => run_classify(&history, &file, json).await,
        Commands::History { json } => run_history(&history, json).await,
        Commands::Show { id, save, json } => run_show(&history, &id, save.as_deref(), json).await,
        Commands::Delete { id } => {
            if history.delete(&id).await? {
                println!("deleted {}", id);
            } else {
                println!("no record {}", id);
            }
            Ok(())
        }
        Commands::Clear => {
            history.clear_all().await?;
            println!("history cleared");
            Ok(())
        }
        Commands::Usage => {
            println!(
                "{} used by {} of {} records",
                history.storage_footprint().await?,
                history.len().await,
                history.capacity().await
            );
            Ok(())
        }
        Commands::Export { out } => run_export(&cfg, &history, out, false).await,
        Commands::Bundle { out } => run_export(&cfg, &history, out, true).await,
    }
}

#[derive(Parser)]
#[command(name = "genre-history")]
#[command(about = "Classify media genres and keep a local history of results", long_about = None)]
struct Cli {
    /// Path to config TOML
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a media file for genre classification
    Classify {
        file: PathBuf,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// List stored classifications, most recent first
    History {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one record and its original file
    Show {
        id: String,
        /// Write the original upload to this path
        #[arg(long)]
        save: Option<PathBuf>,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a record and its stored file
    Delete { id: String },
    /// Delete every record and stored file
    Clear,
    /// Report the space taken by stored files
    Usage,
    /// Write the history metadata as JSON
    Export {
        /// Output directory (defaults to export.output_dir)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Write a zip bundle of originals, per-record metadata and a summary report
    Bundle {
        /// Output directory (defaults to export.output_dir)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

async fn run_classify(history: &HistoryManager, path: &Path, json: bool) -> Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());

    let outcome = match history.submit(MediaFile::new(filename, bytes)).await {
        Ok(outcome) => outcome,
        Err(HistoryError::Remote(e)) => anyhow::bail!("{}", e),
        Err(e) => return Err(e.into()),
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&render::outcome_json(&outcome))?);
    } else {
        println!("{}", render::outcome_line(&outcome));
    }
    Ok(())
}

async fn run_history(history: &HistoryManager, json: bool) -> Result<()> {
    let records = history.records().await;
    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }
    if records.is_empty() {
        println!("history is empty");
    }
    for record in &records {
        println!("{}", render::record_line(record));
    }
    println!("storage: {}", history.storage_footprint().await?);
    Ok(())
}

async fn run_show(
    history: &HistoryManager,
    id: &str,
    save: Option<&Path>,
    json: bool,
) -> Result<()> {
    let selection = history.select(id).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&render::selection_json(&selection))?);
    } else {
        println!("{}", render::selection_text(&selection));
    }
    if let Some(dest) = save {
        match selection.original.bytes() {
            Some(bytes) => {
                tokio::fs::write(dest, bytes)
                    .await
                    .with_context(|| format!("write {}", dest.display()))?;
                println!("saved original to {}", dest.display());
            }
            None => eprintln!("original file is missing; nothing saved"),
        }
    }
    Ok(())
}

async fn run_export(
    cfg: &AppConfig,
    history: &HistoryManager,
    out: Option<PathBuf>,
    bundle: bool,
) -> Result<()> {
    let dir = out.unwrap_or_else(|| PathBuf::from(&cfg.export.output_dir));
    let millis = chrono::Utc::now().timestamp_millis();
    let artifact = if bundle {
        export::export_bundle(history)
            .await?
            .map(|bytes| (output::bundle_file_name(millis), bytes))
    } else {
        export::export_metadata(history)
            .await?
            .map(|doc| (output::metadata_file_name(millis), doc.into_bytes()))
    };
    match artifact {
        Some((name, bytes)) => {
            let path = output::write_artifact(&dir, &name, &bytes)?;
            println!("wrote {}", path.display());
        }
        None => println!("nothing to export"),
    }
    Ok(())
}
