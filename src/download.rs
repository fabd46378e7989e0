use crate::logi;
use anyhow::{Context, Result};
use rand::Rng;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::process::Command;

fn unique_prefix<R: Rng + ?Sized>(filename_prefix: &str, rng: &mut R) -> String {
    let token: u64 = rng.r#gen();
    format!("{}_{:016x}", filename_prefix, token)
}

async fn find_with_prefix(dir: &Path, prefix: &str) -> Result<Option<PathBuf>> {
    let mut entries = fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to list {}", dir.display()))?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        // yt-dlp leaves .part files behind on interrupted downloads
        if name.starts_with(prefix) && !name.ends_with(".part") {
            return Ok(Some(entry.path()));
        }
    }
    Ok(None)
}

/// Downloads `url` with yt-dlp into `dir` and returns the produced file.
pub async fn download_with_ytdlp<R: Rng + ?Sized>(
    url: &str,
    dir: &Path,
    filename_prefix: &str,
    rng: &mut R,
) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create dir {}", dir.display()))?;

    let prefix = unique_prefix(filename_prefix, rng);
    let template = dir.join(format!("{}.%(ext)s", prefix));
    logi(format!("Running: yt-dlp -f best -o {} {}", template.display(), url));

    let status = Command::new("yt-dlp")
        .arg("-f")
        .arg("best")
        .arg("--no-playlist")
        .arg("-o")
        .arg(template.as_os_str())
        .arg(url)
        .status()
        .await
        .context("yt-dlp execution failed")?;

    if !status.success() {
        anyhow::bail!("yt-dlp failed for {}", url);
    }

    find_with_prefix(dir, &prefix)
        .await?
        .with_context(|| format!("Downloaded file not found for {}", url))
}

pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or("clip")
        .to_string()
}
