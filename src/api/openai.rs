use crate::config::Config;
use crate::{logi, logw};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use tokio::fs;

const MAX_TRANSCRIPT_CHARS: usize = 4_000;
const LABEL_MODEL: &str = "gpt-4o-mini";
const TRANSCRIBE_MODEL: &str = "whisper-1";

/// What the label generator knows about one clip.
#[derive(Debug, Clone)]
pub struct ClipContext {
    pub source_title: String,
    pub transcript: Option<String>,
}

/// Produces one short on-screen label per clip, in the order given.
#[async_trait]
pub trait LabelGenerator: Send + Sync {
    async fn labels(&self, clips: &[ClipContext]) -> Result<Vec<String>>;
}

/// Uses the source video titles as labels. Never fails.
pub struct SourceTitleLabels;

#[async_trait]
impl LabelGenerator for SourceTitleLabels {
    async fn labels(&self, clips: &[ClipContext]) -> Result<Vec<String>> {
        Ok(clips.iter().map(|c| c.source_title.clone()).collect())
    }
}

pub struct OpenAiLabels {
    client: Client,
    api_key: String,
}

impl OpenAiLabels {
    pub fn new(client: Client, cfg: &Config) -> Self {
        Self {
            client,
            api_key: cfg.openai_api_key.clone(),
        }
    }
}

#[async_trait]
impl LabelGenerator for OpenAiLabels {
    async fn labels(&self, clips: &[ClipContext]) -> Result<Vec<String>> {
        let generated = openai_make_labels(&self.client, &self.api_key, clips).await?;
        Ok(merge_labels(clips, generated))
    }
}

/// Fills gaps in the generated list with source titles so every clip ends
/// up with exactly one non-empty label.
pub fn merge_labels(clips: &[ClipContext], generated: Option<Vec<String>>) -> Vec<String> {
    let generated = generated.unwrap_or_default();
    clips
        .iter()
        .enumerate()
        .map(|(i, clip)| {
            generated
                .get(i)
                .map(|l| l.trim())
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| clip.source_title.clone())
        })
        .collect()
}

fn trim_copy_utf8_safe(input: &str, max_bytes: usize) -> String {
    if input.len() <= max_bytes {
        return input.to_string();
    }

    let mut cut = max_bytes.min(input.len());
    while cut > 0 && !input.is_char_boundary(cut) {
        cut -= 1;
    }
    input[..cut].to_string()
}

fn openai_extract_output_text(resp_json: &str) -> Option<String> {
    let root: serde_json::Value = serde_json::from_str(resp_json).ok()?;

    if let Some(err) = root.get("error").filter(|e| !e.is_null()) {
        if let Some(msg) = err.get("message").and_then(|v| v.as_str()) {
            logw(format!("OpenAI error message: {}", msg));
        }
        if let Some(code) = err.get("code").and_then(|v| v.as_str()) {
            logw(format!("OpenAI error code: {}", code));
        }
        return None;
    }

    let output = root.get("output")?.as_array()?;
    for item in output {
        let Some(content) = item.get("content").and_then(|v| v.as_array()) else {
            continue;
        };
        for entry in content {
            let typ = entry.get("type").and_then(|v| v.as_str());
            let text = entry.get("text").and_then(|v| v.as_str());
            if typ == Some("output_text") {
                if let Some(text) = text {
                    return Some(text.to_string());
                }
            }
        }
    }

    None
}

#[derive(Debug, Deserialize)]
struct LabelsRoot {
    labels: Vec<String>,
}

fn parse_labels(text: &str) -> Result<Vec<String>> {
    let root: LabelsRoot =
        serde_json::from_str(text).with_context(|| "Failed to parse labels JSON")?;
    Ok(root.labels)
}

fn labels_prompt(clips: &[ClipContext]) -> String {
    let mut listing = String::new();
    for (i, clip) in clips.iter().enumerate() {
        let transcript = clip
            .transcript
            .as_deref()
            .map(|t| trim_copy_utf8_safe(t, MAX_TRANSCRIPT_CHARS))
            .unwrap_or_default();
        listing.push_str(&format!(
            "CLIP {}\nTitle: {}\nTranscript: {}\n\n",
            i + 1,
            clip.source_title,
            if transcript.is_empty() { "(none)" } else { transcript.as_str() }
        ));
    }

    format!(
        "You are labelling clips for a short vertical compilation video.\n\n{}TASK:\n- Write exactly {} labels, one per clip, in the same order.\n- Each label is a punchy on-screen caption of at most 4 words.\n- No hashtags, no emojis, no quotes.\n- Return STRICT JSON with this shape ONLY:\n  {{\"labels\":[\"...\", ...]}}\n",
        listing,
        clips.len()
    )
}

/// `Ok(None)` means the service answered but produced nothing usable.
pub async fn openai_make_labels(
    client: &Client,
    api_key: &str,
    clips: &[ClipContext],
) -> Result<Option<Vec<String>>> {
    if clips.is_empty() {
        return Ok(Some(Vec::new()));
    }
    if api_key.is_empty() {
        logw("OpenAI key missing; falling back to source titles for labels.");
        return Ok(None);
    }

    let body = json!({
        "model": LABEL_MODEL,
        "input": [
            {"role": "system", "content": "You are a helpful assistant designed to output JSON."},
            {"role": "user", "content": labels_prompt(clips)},
        ],
        "text": {"format": {"type": "json_object"}},
    });

    let resp = client
        .post("https://api.openai.com/v1/responses")
        .bearer_auth(api_key)
        .json(&body)
        .timeout(std::time::Duration::from_secs(300))
        .send()
        .await
        .context("OpenAI request failed")?;

    let status = resp.status();
    let raw = resp.text().await.unwrap_or_default();

    if !status.is_success() {
        logw(format!("OpenAI HTTP {}", status.as_u16()));
        if !raw.is_empty() {
            let snippet = raw.chars().take(800).collect::<String>();
            logw(format!("OpenAI raw body: {}", snippet));
        }
        return Ok(None);
    }

    let Some(out_text) = openai_extract_output_text(&raw) else {
        logw("OpenAI response parse failed.");
        return Ok(None);
    };

    match parse_labels(&out_text) {
        Ok(labels) => {
            logi(format!("OpenAI labels received: {}", labels.len()));
            Ok(Some(labels))
        }
        Err(err) => {
            logw(format!("OpenAI labels unusable: {:#}", err));
            Ok(None)
        }
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

pub async fn openai_transcribe(
    client: &Client,
    api_key: &str,
    audio_path: &Path,
) -> Result<Option<String>> {
    if api_key.is_empty() {
        return Ok(None);
    }

    let bytes = fs::read(audio_path)
        .await
        .with_context(|| format!("Failed to read audio {}", audio_path.display()))?;
    let file_name = audio_path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned();
    let part = Part::bytes(bytes)
        .file_name(file_name)
        .mime_str("audio/mpeg")
        .context("Invalid audio mime type")?;
    let form = Form::new()
        .text("model", TRANSCRIBE_MODEL)
        .text("response_format", "json")
        .part("file", part);

    let resp = client
        .post("https://api.openai.com/v1/audio/transcriptions")
        .bearer_auth(api_key)
        .multipart(form)
        .timeout(std::time::Duration::from_secs(300))
        .send()
        .await
        .context("OpenAI transcription request failed")?;

    if !resp.status().is_success() {
        logw(format!("OpenAI transcription HTTP {}", resp.status().as_u16()));
        return Ok(None);
    }

    let parsed: TranscriptionResponse = resp
        .json()
        .await
        .context("OpenAI transcription response parse failed")?;
    let text = parsed.text.trim().to_string();
    Ok(if text.is_empty() { None } else { Some(text) })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(title: &str) -> ClipContext {
        ClipContext {
            source_title: title.to_string(),
            transcript: None,
        }
    }

    #[test]
    fn extracts_output_text() {
        let raw = r#"{"output":[{"type":"reasoning"},{"content":[{"type":"output_text","text":"{\"labels\":[\"A\"]}"}]}]}"#;
        assert_eq!(
            openai_extract_output_text(raw).as_deref(),
            Some(r#"{"labels":["A"]}"#)
        );
    }

    #[test]
    fn error_body_yields_nothing() {
        let raw = r#"{"error":{"message":"bad","code":"invalid_json"}}"#;
        assert!(openai_extract_output_text(raw).is_none());
        assert!(openai_extract_output_text("not json").is_none());
    }

    #[test]
    fn parses_labels_payload() {
        assert_eq!(
            parse_labels(r#"{"labels":["Cat Chaos","Big Oops"]}"#).unwrap(),
            vec!["Cat Chaos", "Big Oops"]
        );
        assert!(parse_labels(r#"{"clips":[]}"#).is_err());
    }

    #[test]
    fn merge_fills_missing_and_blank_labels() {
        let clips = [ctx("one"), ctx("two"), ctx("three")];
        let merged = merge_labels(&clips, Some(vec!["First".into(), "  ".into()]));
        assert_eq!(merged, vec!["First", "two", "three"]);
        assert_eq!(merge_labels(&clips, None), vec!["one", "two", "three"]);
    }

    #[test]
    fn prompt_lists_every_clip() {
        let clips = [
            ClipContext {
                source_title: "Dog steals pizza".into(),
                transcript: Some("no no no".into()),
            },
            ctx("Skater falls"),
        ];
        let prompt = labels_prompt(&clips);
        assert!(prompt.contains("CLIP 1\nTitle: Dog steals pizza\nTranscript: no no no"));
        assert!(prompt.contains("CLIP 2\nTitle: Skater falls\nTranscript: (none)"));
        assert!(prompt.contains("exactly 2 labels"));
    }

    #[test]
    fn utf8_trim_keeps_char_boundary() {
        assert_eq!(trim_copy_utf8_safe("héllo", 2), "h");
        assert_eq!(trim_copy_utf8_safe("abc", 10), "abc");
    }

    #[tokio::test]
    async fn source_title_labels_pass_through() {
        let labels = SourceTitleLabels.labels(&[ctx("x"), ctx("y")]).await.unwrap();
        assert_eq!(labels, vec!["x", "y"]);
    }
}
