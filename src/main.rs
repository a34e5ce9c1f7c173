//! Transform jobs from the command line.
//!
//! Reads one JSON job description per line (`{"inputUrl": ..., "outputUrl": ...,
//! "requestId": ...}`) from `--jobs` or stdin, runs the jobs strictly one at a time against
//! a filesystem object store rooted at `--storage-root`, and prints each response as a JSON
//! line on stdout. Logs go to stderr; set `RUST_LOG` to change the level.
//!
//! Usage:
//!   csv-transformer --storage-root /srv/objects --jobs jobs.jsonl
//!   echo '{"inputUrl":"s3://in/a.csv","outputUrl":"s3://out/a.csv"}' | csv-transformer -s /srv/objects

use anyhow::{Context, Result};
use clap::Parser;
use csv_transformer::consumer::process_message;
use csv_transformer::hierarchy::HttpHierarchySource;
use csv_transformer::io::cloud::LocalObjectIO;
use csv_transformer::{Config, JobHandler, Transformer};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Denormalize dimension CSV files.
#[derive(Parser, Debug)]
#[command(name = "csv-transformer", version)]
struct Args {
    /// Directory holding one subdirectory per bucket
    #[arg(short = 's', long, env = "STORAGE_ROOT")]
    storage_root: PathBuf,

    /// File with one JSON job description per line (default: stdin)
    #[arg(short, long)]
    jobs: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::from_env().context("invalid configuration")?;
    info!(
        hierarchy_endpoint = %config.hierarchy_endpoint,
        hierarchy_timeout_secs = config.hierarchy_timeout.as_secs(),
        use_gzip = config.use_gzip,
        temp_dir = %config.temp_dir.display(),
        consumer_queue = %config.consumer_queue,
        storage_root = %args.storage_root.display(),
        "configuration loaded"
    );

    let hierarchies =
        HttpHierarchySource::from_config(&config).context("failed to set up hierarchy client")?;
    let handler = JobHandler::new(
        config,
        Arc::new(LocalObjectIO::new(&args.storage_root)),
        Arc::new(hierarchies),
        Arc::new(Transformer::new()),
    );

    let jobs: Box<dyn BufRead> = match &args.jobs {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("open {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };

    let mut stdout = io::stdout().lock();
    let mut processed = 0usize;
    for (idx, line) in jobs.lines().enumerate() {
        let line = line.with_context(|| format!("read job line {}", idx + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let response = process_message(line.as_bytes(), &handler);
        serde_json::to_writer(&mut stdout, &response).context("write response")?;
        stdout.write_all(b"\n")?;
        stdout.flush()?;
        processed += 1;
    }
    info!(processed, "all jobs done");
    Ok(())
}
