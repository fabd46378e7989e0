use anyhow::{Context, Result};
use clap::Parser;
use shorts_compiler::config::Config;
use shorts_compiler::init;
use shorts_compiler::pipeline::{RunOptions, run_pipeline};
use shorts_compiler::{PipelineLogHook, set_log_hook};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

/// Builds a vertical compilation short from recent clips and uploads it
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the JSON config file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Search query (overrides search.query from the config)
    #[arg(short, long)]
    query: Option<String>,

    /// Seed for clip selection and title templates
    #[arg(long)]
    seed: Option<u64>,

    /// Render only; skip the upload step
    #[arg(long)]
    no_upload: bool,

    /// Also append every pipeline log line to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn file_log_hook(path: &PathBuf) -> Result<PipelineLogHook> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;
    let file = Mutex::new(file);
    Ok(Arc::new(Mutex::new(move |line: &str| {
        if let Ok(mut f) = file.lock() {
            let _ = writeln!(f, "{}", line);
        }
    })))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    if let Some(path) = &cli.log_file {
        set_log_hook(Some(file_log_hook(path)?));
    }

    init::ensure_directories().await?;
    if !init::check_tools().await {
        anyhow::bail!("Required tools missing (ffmpeg, ffprobe, yt-dlp)");
    }

    let cfg = Config::load_or_default(&cli.config).await?;
    let opts = RunOptions {
        query: cli.query,
        seed: cli.seed,
        upload: !cli.no_upload,
    };

    let code = run_pipeline(&cfg, &opts).await?;
    set_log_hook(None);
    std::process::exit(code);
}
