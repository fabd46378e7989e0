use crate::candidate::{SearchResult, SourceTag};
use crate::config::{Config, Privacy};
use crate::{logi, logok, logw};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::debug;

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";
const UPLOAD_URL: &str = "https://www.googleapis.com/upload/youtube/v3/videos";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const UPLOAD_CHUNK_BYTES: u64 = 8 * 1024 * 1024;
const UPLOAD_ATTEMPTS: u32 = 3;
const RETRY_PAUSE_SECS: u64 = 5;
const TOKEN_EXPIRY_SLACK_SECS: i64 = 60;
/// Consecutive 308 replies without progress before the session is abandoned.
const MAX_STALLED_CHUNKS: u32 = 3;

#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<SearchResult>>;
}

pub struct YoutubeSearch {
    client: Client,
    api_key: String,
}

impl YoutubeSearch {
    pub fn new(client: Client, cfg: &Config) -> Self {
        Self {
            client,
            api_key: cfg.youtube_api_key.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchListResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    id: String,
    snippet: VideoSnippet,
    #[serde(rename = "contentDetails")]
    content_details: ContentDetails,
}

#[derive(Debug, Deserialize)]
struct VideoSnippet {
    title: String,
    #[serde(rename = "publishedAt")]
    published_at: DateTime<Utc>,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    #[serde(default)]
    duration: String,
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

/// Joins search hits with their video details, keeping search order.
fn merge_video_details(ids: &[String], details: VideoListResponse) -> Vec<SearchResult> {
    let mut by_id: HashMap<String, VideoItem> = details
        .items
        .into_iter()
        .map(|item| (item.id.clone(), item))
        .collect();

    ids.iter()
        .filter_map(|id| by_id.remove(id))
        .map(|item| SearchResult {
            url: watch_url(&item.id),
            id: item.id,
            title: item.snippet.title,
            duration: item.content_details.duration,
            published_at: item.snippet.published_at,
            tags: item.snippet.tags,
            source: SourceTag::Youtube,
        })
        .collect()
}

#[async_trait]
impl SearchProvider for YoutubeSearch {
    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<SearchResult>> {
        if self.api_key.is_empty() {
            logw("YouTube API key missing; search returns no results.");
            return Ok(Vec::new());
        }

        let max_results = max_results.clamp(1, 50).to_string();
        let resp = self
            .client
            .get(format!("{API_BASE}/search"))
            .query(&[
                ("part", "snippet"),
                ("q", query),
                ("type", "video"),
                ("videoDuration", "short"),
                ("maxResults", max_results.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .context("YouTube search request failed")?;

        if !resp.status().is_success() {
            logw(format!("YouTube search HTTP {}", resp.status().as_u16()));
            return Ok(Vec::new());
        }

        let list: SearchListResponse = resp.json().await.context("YouTube search parse failed")?;
        let ids: Vec<String> = list
            .items
            .into_iter()
            .filter_map(|item| item.id.video_id)
            .collect();
        debug!(count = ids.len(), "search hits");
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let joined = ids.join(",");
        let resp = self
            .client
            .get(format!("{API_BASE}/videos"))
            .query(&[
                ("part", "snippet,contentDetails"),
                ("id", joined.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .context("YouTube videos request failed")?;

        if !resp.status().is_success() {
            logw(format!("YouTube videos HTTP {}", resp.status().as_u16()));
            return Ok(Vec::new());
        }

        let details: VideoListResponse =
            resp.json().await.context("YouTube videos parse failed")?;
        let results = merge_video_details(&ids, details);
        logi(format!("YouTube search '{}' returned {} videos", query, results.len()));
        Ok(results)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(TOKEN_EXPIRY_SLACK_SECS) > now
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

pub struct YoutubeAuth {
    client: Client,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    cache_path: PathBuf,
}

impl YoutubeAuth {
    pub fn new(client: Client, cfg: &Config, cache_path: impl Into<PathBuf>) -> Self {
        Self {
            client,
            client_id: cfg.youtube_client_id.clone(),
            client_secret: cfg.youtube_client_secret.clone(),
            refresh_token: cfg.youtube_refresh_token.clone(),
            cache_path: cache_path.into(),
        }
    }

    async fn load_cached(&self) -> Option<CachedToken> {
        let text = fs::read_to_string(&self.cache_path).await.ok()?;
        serde_json::from_str(&text).ok()
    }

    pub async fn access_token(&self) -> Result<String> {
        if let Some(cached) = self.load_cached().await {
            if cached.is_fresh(Utc::now()) {
                return Ok(cached.access_token);
            }
        }

        if self.refresh_token.is_empty() {
            anyhow::bail!("No YouTube refresh token configured; cannot authorize upload");
        }

        logi("Refreshing YouTube credentials...");
        let resp = self
            .client
            .post(TOKEN_URL)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", self.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .context("OAuth token request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("OAuth token refresh HTTP {}: {}", status.as_u16(), body);
        }

        let token: TokenResponse = resp.json().await.context("OAuth token parse failed")?;
        let cached = CachedToken {
            access_token: token.access_token,
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
        };

        if let Some(parent) = self.cache_path.parent() {
            fs::create_dir_all(parent).await.ok();
        }
        let json = serde_json::to_vec_pretty(&cached)?;
        if let Err(err) = fs::write(&self.cache_path, json).await {
            logw(format!("Failed to cache YouTube token: {}", err));
        }

        Ok(cached.access_token)
    }
}

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category_id: String,
    pub privacy: Privacy,
}

impl UploadRequest {
    pub fn from_config(cfg: &Config, title: String) -> Self {
        Self {
            title,
            description: cfg.upload.description.clone(),
            tags: cfg.upload.tags.clone(),
            category_id: cfg.upload.category_id.clone(),
            privacy: cfg.upload.privacy,
        }
    }

    fn metadata(&self) -> serde_json::Value {
        json!({
            "snippet": {
                "title": self.title,
                "description": self.description,
                "tags": self.tags,
                "categoryId": self.category_id,
            },
            "status": {
                "privacyStatus": self.privacy.as_str(),
            },
        })
    }
}

enum ChunkedOutcome {
    Done(String),
    ServerError(u16),
}

fn is_retryable(status: StatusCode) -> bool {
    matches!(status.as_u16(), 500 | 502 | 503 | 504)
}

fn content_range(start: u64, len: u64, total: u64) -> String {
    format!("bytes {}-{}/{}", start, start + len - 1, total)
}

/// Next byte offset from a `Range: bytes=0-N` header of a 308 response.
fn next_offset(range_header: Option<&str>) -> u64 {
    range_header
        .and_then(|r| r.strip_prefix("bytes="))
        .and_then(|r| r.split('-').nth(1))
        .and_then(|end| end.trim().parse::<u64>().ok())
        .map(|end| end + 1)
        .unwrap_or(0)
}

/// Tracks whether 308 replies keep moving the committed offset forward.
#[derive(Debug, Default)]
struct StallGuard {
    stalled: u32,
}

impl StallGuard {
    /// Returns false once the server has stalled too many times in a row.
    fn record(&mut self, before: u64, after: u64) -> bool {
        if after > before {
            self.stalled = 0;
        } else {
            self.stalled += 1;
        }
        self.stalled < MAX_STALLED_CHUNKS
    }
}

pub struct YoutubeUploader {
    client: Client,
    auth: YoutubeAuth,
}

impl YoutubeUploader {
    pub fn new(client: Client, auth: YoutubeAuth) -> Self {
        Self { client, auth }
    }

    /// Uploads the file and returns the new video id.
    pub async fn upload(&self, path: &Path, request: &UploadRequest) -> Result<String> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            logi(format!("Starting upload: {} (attempt {})", request.title, attempt));
            match self.upload_once(path, request).await? {
                ChunkedOutcome::Done(id) => {
                    logok(format!("Upload complete! Video ID: {}", id));
                    logok(format!("Watch here: {}", watch_url(&id)));
                    return Ok(id);
                }
                ChunkedOutcome::ServerError(code) if attempt < UPLOAD_ATTEMPTS => {
                    logw(format!("HTTP {} during upload; retrying...", code));
                    tokio::time::sleep(std::time::Duration::from_secs(RETRY_PAUSE_SECS)).await;
                }
                ChunkedOutcome::ServerError(code) => {
                    anyhow::bail!("Upload failed after {} attempts (HTTP {})", attempt, code);
                }
            }
        }
    }

    async fn upload_once(&self, path: &Path, request: &UploadRequest) -> Result<ChunkedOutcome> {
        let token = self.auth.access_token().await?;
        let total = fs::metadata(path)
            .await
            .with_context(|| format!("Failed to stat {}", path.display()))?
            .len();
        if total == 0 {
            anyhow::bail!("Refusing to upload empty file {}", path.display());
        }

        let resp = self
            .client
            .post(UPLOAD_URL)
            .query(&[("uploadType", "resumable"), ("part", "snippet,status")])
            .bearer_auth(&token)
            .header("X-Upload-Content-Type", "video/mp4")
            .header("X-Upload-Content-Length", total.to_string())
            .json(&request.metadata())
            .send()
            .await
            .context("Upload session request failed")?;

        let status = resp.status();
        if is_retryable(status) {
            return Ok(ChunkedOutcome::ServerError(status.as_u16()));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Upload session HTTP {}: {}", status.as_u16(), body);
        }
        let session_url = resp
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .context("Upload session response has no Location header")?;

        let mut file = fs::File::open(path)
            .await
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let mut offset = 0u64;
        let mut guard = StallGuard::default();
        loop {
            let len = UPLOAD_CHUNK_BYTES.min(total - offset);
            file.seek(std::io::SeekFrom::Start(offset)).await?;
            let mut chunk = Vec::with_capacity(len as usize);
            (&mut file).take(len).read_to_end(&mut chunk).await?;

            let resp = self
                .client
                .put(&session_url)
                .bearer_auth(&token)
                .header(reqwest::header::CONTENT_LENGTH, len.to_string())
                .header(reqwest::header::CONTENT_RANGE, content_range(offset, len, total))
                .body(chunk)
                .send()
                .await
                .context("Upload chunk request failed")?;

            let status = resp.status();
            if status.as_u16() == 308 {
                let range = resp
                    .headers()
                    .get(reqwest::header::RANGE)
                    .and_then(|v| v.to_str().ok());
                let next = next_offset(range);
                if !guard.record(offset, next) {
                    logw(format!("Upload stalled at byte {} of {}", offset, total));
                    return Ok(ChunkedOutcome::ServerError(308));
                }
                offset = next;
                logi(format!("Upload progress: {}%", offset * 100 / total));
                if offset >= total {
                    anyhow::bail!("Upload session acknowledged all bytes without completing");
                }
                continue;
            }
            if is_retryable(status) {
                return Ok(ChunkedOutcome::ServerError(status.as_u16()));
            }
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                anyhow::bail!("Upload HTTP {}: {}", status.as_u16(), body);
            }

            let body: serde_json::Value = resp.json().await.context("Upload response parse failed")?;
            let id = body
                .get("id")
                .and_then(|v| v.as_str())
                .context("Upload response has no video id")?;
            return Ok(ChunkedOutcome::Done(id.to_string()));
        }
    }
}
