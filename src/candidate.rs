use crate::error::CriteriaError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTag {
    Youtube,
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceTag::Youtube => "youtube",
        };
        f.write_str(name)
    }
}

/// One record as handed over by a search provider, before any filtering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    pub url: String,
    /// Compound duration string, e.g. `PT1M5S`.
    pub duration: String,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub source: SourceTag,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub title: String,
    pub url: String,
    pub duration_secs: u32,
    pub published_at: DateTime<Utc>,
    pub source: SourceTag,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionCriteria {
    pub min_clips: usize,
    pub max_clips: usize,
    pub max_total_secs: u32,
    #[serde(default)]
    pub keywords: BTreeSet<String>,
}

impl SelectionCriteria {
    pub fn new<I, S>(
        min_clips: usize,
        max_clips: usize,
        max_total_secs: u32,
        keywords: I,
    ) -> Result<Self, CriteriaError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let criteria = Self {
            min_clips,
            max_clips,
            max_total_secs,
            keywords: keywords.into_iter().map(Into::into).collect(),
        };
        criteria.validate()?;
        Ok(criteria)
    }

    pub fn validate(&self) -> Result<(), CriteriaError> {
        if self.min_clips == 0 {
            return Err(CriteriaError::ZeroMinClips);
        }
        if self.min_clips > self.max_clips {
            return Err(CriteriaError::MinAboveMax {
                min: self.min_clips,
                max: self.max_clips,
            });
        }
        if self.max_total_secs == 0 {
            return Err(CriteriaError::ZeroBudget);
        }
        Ok(())
    }
}

/// Ordered clips chosen for one compilation. Only the selector builds these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    clips: Vec<Candidate>,
}

impl Selection {
    pub(crate) fn new(clips: Vec<Candidate>) -> Self {
        Self { clips }
    }

    pub fn clips(&self) -> &[Candidate] {
        &self.clips
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn total_secs(&self) -> u32 {
        self.clips.iter().map(|c| c.duration_secs).sum()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candidate> {
        self.clips.iter()
    }
}

impl<'a> IntoIterator for &'a Selection {
    type Item = &'a Candidate;
    type IntoIter = std::slice::Iter<'a, Candidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.clips.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrimPlan {
    pub candidate_id: String,
    pub allowed_secs: u32,
    pub truncated: bool,
}
