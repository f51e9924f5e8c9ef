mod config;
mod db;
mod error;
mod gateway;
mod model;
mod parser;
mod pipeline;
mod provider;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use crate::config::Settings;
use crate::db::SqliteStore;
use crate::gateway::Gateway;
use crate::pipeline::Pipeline;
use crate::provider::PlainTextProvider;

#[derive(Parser)]
#[command(name = "pid_parser", about = "Extract lines, tags and test packages from P&ID page text")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema
    Init,
    /// Register a text dump (pages separated by form feeds) as a pending upload
    Ingest {
        /// Project the upload belongs to (created if new)
        #[arg(short, long)]
        project: String,
        path: PathBuf,
    },
    /// Run the extraction pipeline for an upload
    Run { upload_id: i64 },
    /// Show an upload's status record
    Status { upload_id: i64 },
    /// Record counts for a project
    Stats {
        #[arg(short, long)]
        project: String,
    },
}

fn init_tracing(settings: &Settings) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter)),
        )
        .init();
}

fn open_store(settings: &Settings) -> anyhow::Result<SqliteStore> {
    let conn = db::connect(&settings.database_path)?;
    db::init_schema(&conn)?;
    Ok(SqliteStore::new(conn))
}

fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    init_tracing(&settings);

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => {
            open_store(&settings)?;
            println!("Schema ready at {:?}", settings.database_path);
            Ok(())
        }
        Commands::Ingest { project, path } => {
            let store = open_store(&settings)?;
            let path = path
                .canonicalize()
                .with_context(|| format!("Cannot read {:?}", path))?;
            let filename = path
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_default();
            let project_id = db::ensure_project(store.conn(), &project)?;
            let upload_id =
                db::insert_upload(store.conn(), project_id, &filename, &path.to_string_lossy())?;
            println!("Upload {} registered for project {:?}", upload_id, project);
            Ok(())
        }
        Commands::Run { upload_id } => {
            let store = open_store(&settings)?;
            let provider = PlainTextProvider;
            let report = Pipeline::new(&store, &provider, &settings)
                .with_progress_bar(progress_bar())
                .run(upload_id)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::Status { upload_id } => {
            let store = open_store(&settings)?;
            match store.load_upload(upload_id)? {
                Some(upload) => {
                    println!("{}", serde_json::to_string_pretty(&upload)?);
                    Ok(())
                }
                None => Err(anyhow::anyhow!("upload {} not found", upload_id)),
            }
        }
        Commands::Stats { project } => {
            let store = open_store(&settings)?;
            let Some(project_id) = db::find_project(store.conn(), &project)? else {
                println!("No project named {:?}.", project);
                return Ok(());
            };
            let s = db::get_stats(store.conn(), project_id)?;
            println!("Uploads:       {}", s.uploads);
            println!("Pages:         {}", s.pages);
            println!("Units:         {}", s.units);
            println!("Drawings:      {}", s.drawings);
            println!("Lines:         {}", s.lines);
            println!("Equipment:     {}", s.equipment);
            println!("Instruments:   {}", s.instruments);
            println!("Test packages: {}", s.packages);
            println!("Golden joints: {}", s.golden_joints);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}
