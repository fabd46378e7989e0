use crate::candidate::Candidate;
use crate::config::RenderConfig;
use crate::download::file_stem;
use crate::ffmpeg::{self, FrameFit};
use crate::trim::TrimPolicy;
use crate::{logi, logok, logw};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// A downloaded clip ready for rendering.
#[derive(Debug, Clone)]
pub struct ClipInput {
    pub candidate: Candidate,
    pub path: PathBuf,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedClip {
    pub candidate_id: String,
    pub label: String,
    pub used_secs: u32,
    pub truncated: bool,
}

#[derive(Debug, Clone)]
pub struct ComposeOutput {
    pub path: PathBuf,
    pub clips: Vec<ComposedClip>,
}

impl ComposeOutput {
    pub fn labels(&self) -> Vec<String> {
        self.clips.iter().map(|c| c.label.clone()).collect()
    }

    pub fn total_secs(&self) -> u32 {
        self.clips.iter().map(|c| c.used_secs).sum()
    }
}

/// Seconds the clip occupies and the cut point to apply, given its probed
/// length and the allowance for this slot. Partial seconds round up so the
/// running total never undercounts.
fn clip_cut(actual_secs: f64, allowance: u32) -> (u32, Option<u32>) {
    let whole = (actual_secs.ceil() as u32).max(1);
    if whole > allowance {
        (allowance, Some(allowance))
    } else {
        (whole, None)
    }
}

/// Trims, reframes and labels every clip in order, then concatenates them
/// into `output`. Rendering stops once the trim policy's budget is spent; a
/// clip that fails to render is skipped.
pub async fn compose_short(
    inputs: &[ClipInput],
    policy: &TrimPolicy,
    render: &RenderConfig,
    work_dir: &Path,
    output: &Path,
) -> Result<ComposeOutput> {
    fs::create_dir_all(work_dir)
        .await
        .with_context(|| format!("Failed to create dir {}", work_dir.display()))?;

    let mut running = 0u32;
    let mut rendered: Vec<PathBuf> = Vec::new();
    let mut clips: Vec<ComposedClip> = Vec::new();

    for (idx, input) in inputs.iter().enumerate() {
        let Some(allowance) = policy.allowance(running) else {
            logi(format!("Duration budget spent after {} clips", clips.len()));
            break;
        };

        let actual = match ffmpeg::ffprobe_duration_seconds(&input.path).await {
            Ok(v) => v,
            Err(err) => {
                logw(format!("Error processing clip {}: {}", input.path.display(), err));
                continue;
            }
        };
        let fit = match ffmpeg::ffprobe_video_dimensions(&input.path).await {
            Ok(source) => {
                let fit = ffmpeg::frame_fit(source, render);
                debug!(clip = %input.candidate.id, w = source.0, h = source.1, ?fit, "source frame");
                fit
            }
            Err(err) => {
                logw(format!("No frame size for {} ({}); padding", input.path.display(), err));
                FrameFit::Pad
            }
        };

        let (used, cut) = clip_cut(actual, allowance);
        let label_file = work_dir.join(format!("label_{:02}.txt", idx + 1));
        fs::write(&label_file, input.label.as_bytes()).await?;

        let out_clip = work_dir.join(format!("{:02}_{}_vertical.mp4", idx + 1, file_stem(&input.path)));
        logi(format!(
            "Rendering clip {} ({:.2}s source, using {}s) -> {}",
            idx + 1,
            actual,
            used,
            out_clip.display()
        ));
        if !ffmpeg::ffmpeg_render_vertical_clip(&input.path, cut, fit, Some(label_file.as_path()), render, &out_clip)
            .await?
        {
            logw(format!("Skipping clip {} (render failed)", idx + 1));
            continue;
        }

        running += used;
        let out_clip = fs::canonicalize(&out_clip)
            .await
            .unwrap_or_else(|_| out_clip.clone());
        rendered.push(out_clip);
        clips.push(ComposedClip {
            candidate_id: input.candidate.id.clone(),
            label: input.label.clone(),
            used_secs: used,
            truncated: cut.is_some(),
        });
    }

    if rendered.is_empty() {
        anyhow::bail!("No clips to compose");
    }

    let mut list = tempfile::Builder::new()
        .prefix("concat_")
        .suffix(".txt")
        .tempfile_in(work_dir)
        .context("Failed to create concat list")?;
    list.write_all(ffmpeg::concat_list(&rendered).as_bytes())?;
    list.flush()?;

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).await.ok();
    }
    logi(format!("Concatenating {} clips -> {}", rendered.len(), output.display()));
    if !ffmpeg::ffmpeg_concat_videos(list.path(), render.fps, output).await? {
        anyhow::bail!("Concat produced no output at {}", output.display());
    }
    logok(format!("Composed {} clips ({}s) -> {}", clips.len(), running, output.display()));

    Ok(ComposeOutput {
        path: output.to_path_buf(),
        clips,
    })
}
