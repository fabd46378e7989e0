use crate::candidate::{Candidate, SearchResult, SelectionCriteria};
use crate::duration::parse_duration_secs;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

pub const DEFAULT_LOOKBACK_DAYS: i64 = 30;

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Turns raw search results into candidates. A result survives only if its
/// duration fits the budget, it is recent enough and it mentions one of the
/// required keywords. Survivors keep their input order.
#[derive(Debug, Clone, Copy)]
pub struct CandidateFilter {
    pub lookback: Duration,
}

impl Default for CandidateFilter {
    fn default() -> Self {
        Self {
            lookback: Duration::days(DEFAULT_LOOKBACK_DAYS),
        }
    }
}

impl CandidateFilter {
    pub fn with_lookback_days(days: i64) -> Self {
        Self {
            lookback: Duration::days(days),
        }
    }

    pub fn apply(
        &self,
        results: &[SearchResult],
        criteria: &SelectionCriteria,
        clock: &dyn Clock,
    ) -> Vec<Candidate> {
        let now = clock.now();
        let keywords: Vec<String> = criteria
            .keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();

        let mut out = Vec::new();
        for result in results {
            let duration_secs = parse_duration_secs(&result.duration);
            if duration_secs == 0 || duration_secs > criteria.max_total_secs {
                debug!(id = %result.id, duration = %result.duration, "dropped: duration out of bounds");
                continue;
            }

            if now.signed_duration_since(result.published_at) > self.lookback {
                debug!(id = %result.id, published = %result.published_at, "dropped: too old");
                continue;
            }

            if !matches_keywords(result, &keywords) {
                debug!(id = %result.id, title = %result.title, "dropped: no keyword match");
                continue;
            }

            out.push(Candidate {
                id: result.id.clone(),
                title: result.title.clone(),
                url: result.url.clone(),
                duration_secs,
                published_at: result.published_at,
                source: result.source,
            });
        }
        out
    }
}

// Empty keyword set disables the relevance check.
fn matches_keywords(result: &SearchResult, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return true;
    }
    let title = result.title.to_lowercase();
    let tags: Vec<String> = result.tags.iter().map(|t| t.to_lowercase()).collect();
    keywords
        .iter()
        .any(|k| title.contains(k.as_str()) || tags.iter().any(|t| t.contains(k.as_str())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::SourceTag;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn result(id: &str, title: &str, duration: &str, age_days: i64, tags: &[&str]) -> SearchResult {
        SearchResult {
            id: id.to_string(),
            title: title.to_string(),
            url: format!("https://www.youtube.com/watch?v={id}"),
            duration: duration.to_string(),
            published_at: now() - Duration::days(age_days),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            source: SourceTag::Youtube,
        }
    }

    fn criteria(max_total_secs: u32) -> SelectionCriteria {
        SelectionCriteria::new(1, 4, max_total_secs, ["prank", "FAIL"]).unwrap()
    }

    #[test]
    fn keeps_matching_results_in_order() {
        let results = vec![
            result("b", "Prank on dad", "PT20S", 1, &[]),
            result("a", "Epic fail compilation", "PT10S", 2, &[]),
            result("c", "Cooking show", "PT5S", 1, &["Prank"]),
        ];
        let out = CandidateFilter::default().apply(&results, &criteria(58), &FixedClock(now()));
        let ids: Vec<&str> = out.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["b", "a", "c"]);
        assert_eq!(out[0].duration_secs, 20);
    }

    #[test]
    fn drops_unknown_zero_and_over_budget_durations() {
        let results = vec![
            result("zero", "prank", "PT0S", 1, &[]),
            result("bad", "prank", "ninety seconds", 1, &[]),
            result("long", "prank", "PT59S", 1, &[]),
            result("edge", "prank", "PT58S", 1, &[]),
        ];
        let out = CandidateFilter::default().apply(&results, &criteria(58), &FixedClock(now()));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "edge");
    }

    #[test]
    fn drops_results_outside_lookback() {
        let results = vec![
            result("fresh", "prank", "PT5S", 30, &[]),
            result("stale", "prank", "PT5S", 31, &[]),
        ];
        let out = CandidateFilter::default().apply(&results, &criteria(58), &FixedClock(now()));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "fresh");

        let out = CandidateFilter::with_lookback_days(60).apply(
            &results,
            &criteria(58),
            &FixedClock(now()),
        );
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn keyword_match_is_case_insensitive_over_title_and_tags() {
        let results = vec![
            result("t", "HUGE PRANK", "PT5S", 1, &[]),
            result("g", "Untitled", "PT5S", 1, &["epicFail"]),
            result("n", "Untitled", "PT5S", 1, &["cooking"]),
        ];
        let out = CandidateFilter::default().apply(&results, &criteria(58), &FixedClock(now()));
        let ids: Vec<&str> = out.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["t", "g"]);
    }

    #[test]
    fn empty_keyword_set_accepts_everything() {
        let results = vec![result("x", "anything", "PT5S", 1, &[])];
        let open = SelectionCriteria::new(1, 2, 58, Vec::<String>::new()).unwrap();
        let out = CandidateFilter::default().apply(&results, &open, &FixedClock(now()));
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn raising_budget_never_removes_candidates() {
        let results = vec![
            result("a", "prank", "PT12S", 1, &[]),
            result("b", "prank", "PT40S", 1, &[]),
            result("c", "prank", "PT1M10S", 1, &[]),
            result("d", "prank", "PT3S", 1, &[]),
        ];
        let filter = CandidateFilter::default();
        let mut previous: Vec<String> = Vec::new();
        for budget in [5, 15, 45, 58, 90, 600] {
            let ids: Vec<String> = filter
                .apply(&results, &criteria(budget), &FixedClock(now()))
                .into_iter()
                .map(|c| c.id)
                .collect();
            for id in &previous {
                assert!(ids.contains(id), "budget {budget} dropped {id}");
            }
            previous = ids;
        }
        assert_eq!(previous.len(), 4);
    }
}
