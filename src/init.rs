use crate::{logi, logw};
use anyhow::Result;
use std::path::Path;
use tokio::fs;

pub const DOWNLOAD_DIR: &str = "downloads";
pub const OUTPUT_DIR: &str = "output";
pub const CONFIG_DIR: &str = "config";

const REQUIRED_DIRS: &[&str] = &[DOWNLOAD_DIR, OUTPUT_DIR, CONFIG_DIR];

pub async fn ensure_directories() -> Result<()> {
    for dir in REQUIRED_DIRS {
        if !Path::new(dir).exists() {
            fs::create_dir_all(dir).await?;
            logi(format!("Created directory: {}", dir));
        }
    }
    Ok(())
}

async fn tool_available(program: &str, version_flag: &str) -> bool {
    match tokio::process::Command::new(program)
        .arg(version_flag)
        .output()
        .await
    {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}

pub async fn check_ffmpeg() -> bool {
    tool_available("ffmpeg", "-version").await && tool_available("ffprobe", "-version").await
}

pub async fn check_ytdlp() -> bool {
    tool_available("yt-dlp", "--version").await
}

/// Logs a warning for each missing tool and reports whether all are present.
pub async fn check_tools() -> bool {
    let mut ok = true;
    if !check_ffmpeg().await {
        logw("FFmpeg/ffprobe not found in PATH. Please install FFmpeg.");
        ok = false;
    }
    if !check_ytdlp().await {
        logw("yt-dlp not found in PATH. Please install yt-dlp.");
        ok = false;
    }
    ok
}
