use crate::config::{LabelCorner, RenderConfig};
use crate::logw;
use anyhow::{Context, Result};
use std::path::Path;
use tokio::process::Command;

const LABEL_MARGIN: u32 = 20;

async fn run_cmd(args: &[String]) -> Result<()> {
    if args.is_empty() {
        return Ok(());
    }

    let mut cmd = Command::new(&args[0]);
    if args.len() > 1 {
        cmd.args(&args[1..]);
    }

    let status = cmd.status().await.context("Command execution failed")?;
    if !status.success() {
        return Err(anyhow::anyhow!("Command failed: {:?}", args));
    }

    Ok(())
}

fn ffmpeg_base_args() -> Vec<String> {
    ["ffmpeg", "-y", "-hide_banner", "-loglevel", "error"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Width and height of the first video stream.
pub async fn ffprobe_video_dimensions(path: &Path) -> Result<(u32, u32)> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "csv=s=x:p=0",
        ])
        .arg(path)
        .output()
        .await
        .context("ffprobe dimensions failed")?;

    if !output.status.success() {
        return Err(anyhow::anyhow!("ffprobe failed"));
    }

    let text = String::from_utf8_lossy(&output.stdout);
    parse_dimensions(text.trim()).context("Invalid dimensions")
}

fn parse_dimensions(text: &str) -> Option<(u32, u32)> {
    let (w, h) = text.split_once('x')?;
    let w = w.trim().parse::<u32>().ok()?;
    let h = h.trim().parse::<u32>().ok()?;
    (w > 0 && h > 0).then_some((w, h))
}

pub async fn ffprobe_duration_seconds(path: &Path) -> Result<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .await
        .context("ffprobe duration failed")?;

    if !output.status.success() {
        return Err(anyhow::anyhow!("ffprobe failed"));
    }

    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let duration = text.parse::<f64>().unwrap_or(-1.0);
    if duration <= 0.1 {
        return Err(anyhow::anyhow!("Invalid duration"));
    }
    Ok(duration)
}

fn escape_filter_path(path: &Path) -> String {
    path.display()
        .to_string()
        .replace('\\', "/")
        .replace(':', "\\:")
        .replace('\'', "\\'")
}

fn label_position(corner: LabelCorner) -> (String, String) {
    let m = LABEL_MARGIN;
    match corner {
        LabelCorner::TopLeft => (m.to_string(), m.to_string()),
        LabelCorner::TopRight => (format!("w-tw-{m}"), m.to_string()),
        LabelCorner::BottomLeft => (m.to_string(), format!("h-th-{m}")),
        LabelCorner::BottomRight => (format!("w-tw-{m}"), format!("h-th-{m}")),
    }
}

/// How a source frame is placed on the portrait canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFit {
    /// Scaled to fit inside the canvas, black bars fill the rest.
    Pad,
    /// Scaled to cover the canvas width, overflowing height cut at the center.
    Crop,
}

/// Crop only when the source, scaled to the canvas width, is taller than the
/// canvas and cropping is allowed. Everything else is padded.
pub fn frame_fit(source: (u32, u32), render: &RenderConfig) -> FrameFit {
    let (src_w, src_h) = source;
    let scaled_h = u64::from(src_h) * u64::from(render.width) / u64::from(src_w.max(1));
    if render.allow_cropping && scaled_h > u64::from(render.height) {
        FrameFit::Crop
    } else {
        FrameFit::Pad
    }
}

/// Filter chain that places a clip on the portrait canvas and optionally
/// burns in the label read from `label_file`.
pub fn vertical_filter(render: &RenderConfig, fit: FrameFit, label_file: Option<&Path>) -> String {
    let (w, h) = (render.width, render.height);
    let mut filter = match fit {
        FrameFit::Crop => format!(
            "scale={w}:{h}:force_original_aspect_ratio=increase:force_divisible_by=2,crop={w}:{h}"
        ),
        FrameFit::Pad => format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease:force_divisible_by=2,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:black"
        ),
    };
    filter.push_str(&format!(",setsar=1,fps={}", render.fps));

    if let Some(file) = label_file {
        let (x, y) = label_position(render.label_corner);
        // labels are literal text, `%` must not start an expansion
        filter.push_str(&format!(
            ",drawtext=textfile={}:expansion=none:fontsize={}:fontcolor=white:borderw=3:bordercolor=black:x={}:y={}",
            escape_filter_path(file),
            render.label_font_size,
            x,
            y
        ));
    }
    filter
}

/// Renders one portrait clip, cut to `max_secs` when given.
pub async fn ffmpeg_render_vertical_clip(
    in_video: &Path,
    max_secs: Option<u32>,
    fit: FrameFit,
    label_file: Option<&Path>,
    render: &RenderConfig,
    out_mp4: &Path,
) -> Result<bool> {
    let mut args = ffmpeg_base_args();
    args.push("-i".to_string());
    args.push(in_video.display().to_string());
    if let Some(secs) = max_secs {
        args.push("-t".to_string());
        args.push(secs.to_string());
    }
    args.extend(
        [
            "-vf".to_string(),
            vertical_filter(render, fit, label_file),
            "-map".to_string(),
            "0:v:0".to_string(),
            "-map".to_string(),
            "0:a?".to_string(),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-preset".to_string(),
            "veryfast".to_string(),
            "-crf".to_string(),
            "22".to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-ar".to_string(),
            "44100".to_string(),
            "-ac".to_string(),
            "2".to_string(),
            "-b:a".to_string(),
            "192k".to_string(),
            out_mp4.display().to_string(),
        ],
    );

    if let Err(err) = run_cmd(&args).await {
        logw(format!("Vertical render failed: {}", err));
        return Ok(false);
    }

    Ok(out_mp4.exists())
}

/// Mono 16 kHz mp3, small enough for the transcription upload limit.
pub async fn ffmpeg_extract_audio(in_video: &Path, out_mp3: &Path) -> Result<bool> {
    let mut args = ffmpeg_base_args();
    args.extend(
        [
            "-i".to_string(),
            in_video.display().to_string(),
            "-vn".to_string(),
            "-ac".to_string(),
            "1".to_string(),
            "-ar".to_string(),
            "16000".to_string(),
            "-c:a".to_string(),
            "libmp3lame".to_string(),
            "-b:a".to_string(),
            "64k".to_string(),
            out_mp3.display().to_string(),
        ],
    );

    if let Err(err) = run_cmd(&args).await {
        logw(format!("Audio extraction failed: {}", err));
        return Ok(false);
    }
    Ok(out_mp3.exists())
}

pub async fn ffmpeg_concat_videos(list_txt: &Path, fps: u32, out_mp4: &Path) -> Result<bool> {
    let mut args = ffmpeg_base_args();
    args.extend(
        [
            "-f".to_string(),
            "concat".to_string(),
            "-safe".to_string(),
            "0".to_string(),
            "-i".to_string(),
            list_txt.display().to_string(),
            "-r".to_string(),
            fps.to_string(),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-preset".to_string(),
            "medium".to_string(),
            "-crf".to_string(),
            "22".to_string(),
            "-threads".to_string(),
            "4".to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            "192k".to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
            out_mp4.display().to_string(),
        ],
    );
    run_cmd(&args).await?;
    Ok(out_mp4.exists())
}

/// Body of an ffmpeg concat demuxer list.
pub fn concat_list<P: AsRef<Path>>(paths: &[P]) -> String {
    let mut out = String::new();
    for path in paths {
        let escaped = path.as_ref().display().to_string().replace('\'', "'\\''");
        out.push_str(&format!("file '{}'\n", escaped));
    }
    out
}
