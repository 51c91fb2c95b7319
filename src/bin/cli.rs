//! Alternate front door to the same core: a clap CLI for scripted ingest,
//! identify, and catalogue inspection, usable against Postgres or, with
//! `--offline`, an in-process memory store for quick experimentation.

use clap::{Parser, Subcommand};
use echoid::config::ServiceConfig;
use echoid::ingest::NewRecording;
use echoid::store::memory::MemoryStore;
use echoid::store::postgres::PostgresStore;
use echoid::store::FingerprintStore;
use echoid::AppContext;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "echoid-cli", about = "Acoustic fingerprint catalogue CLI")]
struct Args {
    /// Use an in-process, non-persistent store instead of Postgres.
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fingerprint an audio file and add it to the catalogue.
    Ingest {
        path: PathBuf,
        #[arg(long)]
        title: String,
        #[arg(long)]
        artist: String,
        #[arg(long)]
        album: Option<String>,
    },
    /// Identify an audio clip against the catalogue.
    Identify { path: PathBuf },
    /// List catalogued recordings.
    List,
    /// Remove a recording from the catalogue.
    Delete { id: i64 },
    /// Print catalogue statistics.
    Stats,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = ServiceConfig::load()?;

    let store: Arc<dyn FingerprintStore> = if args.offline {
        Arc::new(MemoryStore::default())
    } else {
        let database_url = std::env::var("DATABASE_URL")?;
        Arc::new(PostgresStore::connect(&database_url)?)
    };
    let ctx = AppContext::new(config, store);

    match args.command {
        Command::Ingest {
            path,
            title,
            artist,
            album,
        } => {
            let bytes = std::fs::read(&path)?;
            let filename_hint = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("upload")
                .to_string();
            let outcome = ctx.ingest(NewRecording {
                title,
                artist,
                album,
                filename_hint,
                bytes,
            })?;
            println!("{outcome:?}");
        }
        Command::Identify { path } => {
            let bytes = std::fs::read(&path)?;
            let filename_hint = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("query")
                .to_string();
            let outcome = ctx.identify(&bytes, &filename_hint)?;
            println!("{outcome:?}");
        }
        Command::List => {
            for recording in ctx.list_recordings()? {
                println!(
                    "{}\t{} - {}",
                    recording.id, recording.artist, recording.title
                );
            }
        }
        Command::Delete { id } => {
            ctx.delete_recording(id)?;
            println!("deleted {id}");
        }
        Command::Stats => {
            let stats = ctx.stats()?;
            println!(
                "recordings={} tuples={}",
                stats.recording_count, stats.tuple_count
            );
        }
    }

    Ok(())
}
