use crate::candidate::SelectionCriteria;
use crate::filter::{CandidateFilter, DEFAULT_LOOKBACK_DAYS};
use crate::trim::{DEFAULT_PER_CLIP_CEILING_SECS, TrimPolicy};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub openai_api_key: String,
    #[serde(default)]
    pub youtube_api_key: String,
    #[serde(default)]
    pub youtube_client_id: String,
    #[serde(default)]
    pub youtube_client_secret: String,
    #[serde(default)]
    pub youtube_refresh_token: String,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_query")]
    pub query: String,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            query: default_query(),
            max_results: default_max_results(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    #[serde(default = "default_min_clips")]
    pub min_clips: usize,
    #[serde(default = "default_max_clips")]
    pub max_clips: usize,
    #[serde(default = "default_max_total_duration")]
    pub max_total_duration_secs: u32,
    #[serde(default = "default_per_clip_ceiling")]
    pub per_clip_ceiling_secs: u32,
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            min_clips: default_min_clips(),
            max_clips: default_max_clips(),
            max_total_duration_secs: default_max_total_duration(),
            per_clip_ceiling_secs: default_per_clip_ceiling(),
            lookback_days: default_lookback_days(),
            keywords: default_keywords(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    Public,
    Private,
    Unlisted,
}

impl Privacy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Privacy::Public => "public",
            Privacy::Private => "private",
            Privacy::Unlisted => "unlisted",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_privacy")]
    pub privacy: Privacy,
    #[serde(default = "default_tags")]
    pub tags: Vec<String>,
    #[serde(default = "default_category_id")]
    pub category_id: String,
    #[serde(default)]
    pub description: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            privacy: default_privacy(),
            tags: default_tags(),
            category_id: default_category_id(),
            description: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LabelCorner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_true")]
    pub allow_cropping: bool,
    #[serde(default = "default_label_font_size")]
    pub label_font_size: u32,
    #[serde(default = "default_label_corner")]
    pub label_corner: LabelCorner,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            allow_cropping: true,
            label_font_size: default_label_font_size(),
            label_corner: default_label_corner(),
        }
    }
}

fn default_query() -> String {
    "funny cringe short".to_string()
}

fn default_max_results() -> u32 {
    25
}

fn default_min_clips() -> usize {
    4
}

fn default_max_clips() -> usize {
    8
}

fn default_max_total_duration() -> u32 {
    58
}

fn default_per_clip_ceiling() -> u32 {
    DEFAULT_PER_CLIP_CEILING_SECS
}

fn default_lookback_days() -> i64 {
    DEFAULT_LOOKBACK_DAYS
}

fn default_keywords() -> Vec<String> {
    ["funny", "cringe", "fail", "prank"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_privacy() -> Privacy {
    Privacy::Public
}

fn default_tags() -> Vec<String> {
    ["shorts", "funny", "viral"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_category_id() -> String {
    "23".to_string()
}

fn default_width() -> u32 {
    1080
}

fn default_height() -> u32 {
    1920
}

fn default_fps() -> u32 {
    24
}

fn default_true() -> bool {
    true
}

fn default_label_font_size() -> u32 {
    40
}

fn default_label_corner() -> LabelCorner {
    LabelCorner::TopLeft
}

fn env_fallback(value: &mut String, key: &str) {
    if !value.is_empty() {
        return;
    }
    if let Ok(v) = std::env::var(key) {
        *value = v.trim().to_string();
    }
}

impl Config {
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
        let config = Self::from_json(&content)?;
        Ok(config.with_env_fallbacks())
    }

    /// Missing file is not an error; everything falls back to defaults and
    /// the environment.
    pub async fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if fs::metadata(&path).await.is_ok() {
            return Self::load(path).await;
        }
        let config = Self::default().with_env_fallbacks();
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(text).context("Failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    fn with_env_fallbacks(mut self) -> Self {
        env_fallback(&mut self.openai_api_key, "OPENAI_API_KEY");
        env_fallback(&mut self.youtube_api_key, "YOUTUBE_API_KEY");
        env_fallback(&mut self.youtube_client_id, "YOUTUBE_CLIENT_ID");
        env_fallback(&mut self.youtube_client_secret, "YOUTUBE_CLIENT_SECRET");
        env_fallback(&mut self.youtube_refresh_token, "YOUTUBE_REFRESH_TOKEN");
        self
    }

    pub fn validate(&self) -> Result<()> {
        let sel = &self.selection;
        self.criteria().context("config.json: invalid selection limits")?;
        if sel.per_clip_ceiling_secs == 0 {
            anyhow::bail!("config.json: selection.per_clip_ceiling_secs must be > 0");
        }
        if sel.lookback_days <= 0 {
            anyhow::bail!("config.json: selection.lookback_days must be > 0");
        }
        if self.render.width == 0 || self.render.height == 0 || self.render.fps == 0 {
            anyhow::bail!("config.json: render width/height/fps must be > 0");
        }
        Ok(())
    }

    pub fn criteria(&self) -> Result<SelectionCriteria, crate::error::CriteriaError> {
        SelectionCriteria::new(
            self.selection.min_clips,
            self.selection.max_clips,
            self.selection.max_total_duration_secs,
            self.selection.keywords.iter().cloned(),
        )
    }

    pub fn candidate_filter(&self) -> CandidateFilter {
        CandidateFilter::with_lookback_days(self.selection.lookback_days)
    }

    pub fn trim_policy(&self) -> TrimPolicy {
        TrimPolicy::new(
            self.selection.max_total_duration_secs,
            self.selection.per_clip_ceiling_secs,
        )
    }

    pub fn can_upload(&self) -> bool {
        !self.youtube_client_id.is_empty()
            && !self.youtube_client_secret.is_empty()
            && !self.youtube_refresh_token.is_empty()
    }
}
