use crate::candidate::{Candidate, TrimPlan};

pub const DEFAULT_PER_CLIP_CEILING_SECS: u32 = 15;

/// Decides how many seconds of each selected clip make it into the final
/// video. Clips are capped at a per-clip ceiling and at whatever is left of
/// the total budget; once the budget is spent no further clips are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimPolicy {
    pub max_total_secs: u32,
    pub per_clip_ceiling_secs: u32,
}

impl TrimPolicy {
    pub fn new(max_total_secs: u32, per_clip_ceiling_secs: u32) -> Self {
        Self {
            max_total_secs,
            per_clip_ceiling_secs,
        }
    }

    /// Seconds the next clip may use, or `None` when the budget is exhausted.
    pub fn allowance(&self, running_total_secs: u32) -> Option<u32> {
        let remaining = self.max_total_secs.checked_sub(running_total_secs)?;
        if remaining == 0 {
            return None;
        }
        Some(self.per_clip_ceiling_secs.min(remaining))
    }

    pub fn plan<'a, I>(&self, clips: I) -> Vec<TrimPlan>
    where
        I: IntoIterator<Item = &'a Candidate>,
    {
        self.plan_from(clips, 0)
    }

    pub fn plan_from<'a, I>(&self, clips: I, committed_secs: u32) -> Vec<TrimPlan>
    where
        I: IntoIterator<Item = &'a Candidate>,
    {
        let mut running = committed_secs;
        let mut out = Vec::new();
        for clip in clips {
            let Some(allowed) = self.allowance(running) else {
                break;
            };
            let used = clip.duration_secs.min(allowed);
            out.push(TrimPlan {
                candidate_id: clip.id.clone(),
                allowed_secs: used,
                truncated: clip.duration_secs > allowed,
            });
            running += used;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::SourceTag;
    use chrono::{TimeZone, Utc};

    fn clip(id: &str, secs: u32) -> Candidate {
        Candidate {
            id: id.to_string(),
            title: id.to_string(),
            url: String::new(),
            duration_secs: secs,
            published_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            source: SourceTag::Youtube,
        }
    }

    #[test]
    fn truncates_long_clip_and_keeps_short_ones() {
        let clips = [clip("a", 20), clip("b", 5), clip("c", 10)];
        let plan = TrimPolicy::new(58, 15).plan(&clips);
        let allowed: Vec<u32> = plan.iter().map(|p| p.allowed_secs).collect();
        assert_eq!(allowed, [15, 5, 10]);
        assert!(plan[0].truncated);
        assert!(!plan[1].truncated);
        assert!(allowed.iter().sum::<u32>() <= 58);
    }

    #[test]
    fn last_clip_is_cut_to_remaining_budget() {
        let clips = [clip("a", 15), clip("b", 15), clip("c", 15)];
        let plan = TrimPolicy::new(40, 15).plan(&clips);
        let allowed: Vec<u32> = plan.iter().map(|p| p.allowed_secs).collect();
        assert_eq!(allowed, [15, 15, 10]);
        assert!(plan[2].truncated);
    }

    #[test]
    fn stops_emitting_once_budget_is_spent() {
        let clips = [clip("a", 15), clip("b", 15), clip("c", 15)];
        let plan = TrimPolicy::new(30, 15).plan(&clips);
        assert_eq!(plan.len(), 2);
    }

    #[test]
    fn committed_seconds_count_against_budget() {
        let clips = [clip("a", 10), clip("b", 10)];
        let plan = TrimPolicy::new(58, 15).plan_from(&clips, 50);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].allowed_secs, 8);

        assert!(TrimPolicy::new(58, 15).plan_from(&clips, 70).is_empty());
    }

    #[test]
    fn allowance_edges() {
        let policy = TrimPolicy::new(58, 15);
        assert_eq!(policy.allowance(0), Some(15));
        assert_eq!(policy.allowance(50), Some(8));
        assert_eq!(policy.allowance(58), None);
        assert_eq!(policy.allowance(90), None);
    }
}
