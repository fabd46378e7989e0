use crate::api::openai::{self, ClipContext, LabelGenerator, OpenAiLabels, SourceTitleLabels};
use crate::api::youtube::{SearchProvider, UploadRequest, YoutubeAuth, YoutubeSearch, YoutubeUploader};
use crate::candidate::{SearchResult, Selection};
use crate::compose::{self, ClipInput};
use crate::config::Config;
use crate::download;
use crate::error::SelectionError;
use crate::ffmpeg;
use crate::filter::{Clock, SystemClock};
use crate::init::{CONFIG_DIR, DOWNLOAD_DIR, OUTPUT_DIR};
use crate::selector;
use crate::title::{assemble_title, clamp_title};
use crate::{logi, logok, logw};
use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;
use walkdir::WalkDir;

pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_INFEASIBLE: i32 = 2;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub query: Option<String>,
    pub seed: Option<u64>,
    pub upload: bool,
}

fn now_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

async fn clear_directory_contents(dir_path: &Path) -> Result<()> {
    if fs::metadata(dir_path).await.map(|m| m.is_dir()).unwrap_or(false) {
        for entry in WalkDir::new(dir_path).min_depth(1).contents_first(true) {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                fs::remove_dir(path).await.ok();
            } else {
                fs::remove_file(path).await.ok();
            }
        }
    }
    Ok(())
}

/// Filter and select in one step: the pure part of a run.
pub fn plan_selection<R: Rng + ?Sized>(
    cfg: &Config,
    results: &[SearchResult],
    clock: &dyn Clock,
    rng: &mut R,
) -> Result<Selection, SelectionError> {
    let criteria = cfg.criteria()?;
    let candidates = cfg.candidate_filter().apply(results, &criteria, clock);
    logi(format!(
        "{} of {} search results passed filtering",
        candidates.len(),
        results.len()
    ));
    selector::select(&candidates, &criteria, rng)
}

async fn download_selection<R: Rng + ?Sized>(
    selection: &Selection,
    dir: &Path,
    rng: &mut R,
) -> Vec<(usize, PathBuf)> {
    let mut out = Vec::new();
    for (idx, clip) in selection.iter().enumerate() {
        match download::download_with_ytdlp(&clip.url, dir, "clip", rng).await {
            Ok(path) => {
                logok(format!("Downloaded {} -> {}", clip.url, path.display()));
                out.push((idx, path));
            }
            Err(err) => logw(format!("Download failed for {}: {:#}", clip.url, err)),
        }
    }
    out
}

async fn transcribe_clip(client: &reqwest::Client, cfg: &Config, video: &Path) -> Option<String> {
    if cfg.openai_api_key.is_empty() {
        return None;
    }
    let audio = video.with_extension("mp3");
    match ffmpeg::ffmpeg_extract_audio(video, &audio).await {
        Ok(true) => {}
        Ok(false) => return None,
        Err(err) => {
            logw(format!("Audio extraction error for {}: {:#}", video.display(), err));
            return None;
        }
    }
    match openai::openai_transcribe(client, &cfg.openai_api_key, &audio).await {
        Ok(text) => text,
        Err(err) => {
            logw(format!("Transcription failed for {}: {:#}", video.display(), err));
            None
        }
    }
}

async fn label_clips(generator: &dyn LabelGenerator, contexts: &[ClipContext]) -> Vec<String> {
    match generator.labels(contexts).await {
        Ok(labels) if labels.len() == contexts.len() => labels,
        Ok(labels) => {
            logw(format!(
                "Label generator returned {} labels for {} clips; using source titles",
                labels.len(),
                contexts.len()
            ));
            openai::merge_labels(contexts, Some(labels))
        }
        Err(err) => {
            logw(format!("Label generation failed: {:#}", err));
            openai::merge_labels(contexts, None)
        }
    }
}

pub async fn run_pipeline(cfg: &Config, opts: &RunOptions) -> Result<i32> {
    let client = reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .context("Failed to build HTTP client")?;

    let download_dir = Path::new(DOWNLOAD_DIR);
    logi("Clearing downloads/ folder...");
    clear_directory_contents(download_dir).await?;
    fs::create_dir_all(download_dir).await?;
    fs::create_dir_all(OUTPUT_DIR).await?;

    let seed = opts.seed.unwrap_or_else(now_seed);
    logi(format!("Random seed: {}", seed));
    let mut rng = StdRng::seed_from_u64(seed);

    let query = opts.query.as_deref().unwrap_or(&cfg.search.query);
    let search: Box<dyn SearchProvider> = Box::new(YoutubeSearch::new(client.clone(), cfg));
    let results = search.search(query, cfg.search.max_results).await?;

    let selection = match plan_selection(cfg, &results, &SystemClock, &mut rng) {
        Ok(selection) => selection,
        Err(err @ SelectionError::InvalidCriteria(_)) => return Err(err.into()),
        Err(err) => {
            logw(format!("Aborting run: {}", err));
            return Ok(EXIT_INFEASIBLE);
        }
    };
    logok(format!(
        "Selected {} clips ({}s of source)",
        selection.len(),
        selection.total_secs()
    ));
    for plan in cfg.trim_policy().plan(&selection) {
        logi(format!(
            "  {} -> {}s{}",
            plan.candidate_id,
            plan.allowed_secs,
            if plan.truncated { " (trimmed)" } else { "" }
        ));
    }

    let downloaded = download_selection(&selection, download_dir, &mut rng).await;
    if downloaded.is_empty() {
        logw("No clips could be downloaded");
        return Ok(EXIT_FAILED);
    }

    let mut contexts = Vec::with_capacity(downloaded.len());
    for (idx, path) in &downloaded {
        let clip = &selection.clips()[*idx];
        logi(format!("Transcribing clip {}: {}", idx + 1, clip.title));
        contexts.push(ClipContext {
            source_title: clip.title.clone(),
            transcript: transcribe_clip(&client, cfg, path).await,
        });
    }

    let generator: Box<dyn LabelGenerator> = if cfg.openai_api_key.is_empty() {
        Box::new(SourceTitleLabels)
    } else {
        Box::new(OpenAiLabels::new(client.clone(), cfg))
    };
    let labels = label_clips(generator.as_ref(), &contexts).await;

    let inputs: Vec<ClipInput> = downloaded
        .iter()
        .zip(labels)
        .map(|((idx, path), label)| ClipInput {
            candidate: selection.clips()[*idx].clone(),
            path: path.clone(),
            label,
        })
        .collect();

    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let output = Path::new(OUTPUT_DIR).join(format!("short_{}.mp4", stamp));
    let composed = compose::compose_short(
        &inputs,
        &cfg.trim_policy(),
        &cfg.render,
        &download_dir.join("render"),
        &output,
    )
    .await?;

    let labels = composed.labels();
    let title = clamp_title(&assemble_title(labels.as_slice(), Some(&mut rng)));
    logok(format!("Title: {} ({}s)", title, composed.total_secs()));

    if !opts.upload {
        logi(format!("Upload disabled; video left at {}", composed.path.display()));
        return Ok(EXIT_OK);
    }
    if !cfg.can_upload() {
        logw("YouTube OAuth credentials missing; skipping upload.");
        return Ok(EXIT_OK);
    }

    let auth = YoutubeAuth::new(
        client.clone(),
        cfg,
        Path::new(CONFIG_DIR).join("youtube_token.json"),
    );
    let uploader = YoutubeUploader::new(client, auth);
    uploader
        .upload(&composed.path, &UploadRequest::from_config(cfg, title))
        .await?;

    Ok(EXIT_OK)
}
