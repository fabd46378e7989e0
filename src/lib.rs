use once_cell::sync::Lazy;
use std::sync::{Arc, Mutex};

pub mod api;
pub mod candidate;
pub mod compose;
pub mod config;
pub mod download;
pub mod duration;
pub mod error;
pub mod ffmpeg;
pub mod filter;
pub mod init;
pub mod pipeline;
pub mod selector;
pub mod title;
pub mod trim;

pub use candidate::{Candidate, SearchResult, Selection, SelectionCriteria, SourceTag, TrimPlan};
pub use error::{CriteriaError, SelectionError};

pub type PipelineLogHook = Arc<Mutex<dyn Fn(&str) + Send + Sync + 'static>>;

static LOG_HOOK: Lazy<Mutex<Option<PipelineLogHook>>> = Lazy::new(|| Mutex::new(None));

pub fn set_log_hook(hook: Option<PipelineLogHook>) {
    if let Ok(mut guard) = LOG_HOOK.lock() {
        *guard = hook;
    }
}

pub(crate) fn logv(tag: &str, message: &str) {
    match tag {
        "WARN" => tracing::warn!("{}", message),
        _ => tracing::info!("[{}] {}", tag, message),
    }

    if let Ok(guard) = LOG_HOOK.lock() {
        if let Some(hook) = guard.as_ref() {
            if let Ok(callback) = hook.lock() {
                let line = format!("[{}] {}", tag, message);
                callback(&line);
            }
        }
    }
}

pub(crate) fn logi(message: impl AsRef<str>) {
    logv("INFO", message.as_ref());
}

pub(crate) fn logok(message: impl AsRef<str>) {
    logv("OK", message.as_ref());
}

pub(crate) fn logw(message: impl AsRef<str>) {
    logv("WARN", message.as_ref());
}
