use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CriteriaError {
    #[error("min clip count must be greater than zero")]
    ZeroMinClips,
    #[error("min clip count {min} exceeds max clip count {max}")]
    MinAboveMax { min: usize, max: usize },
    #[error("total duration budget must be greater than zero")]
    ZeroBudget,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("no candidates to select from")]
    NoCandidates,
    #[error(
        "no feasible selection: {candidates} candidates, need {min_clips}..={max_clips} clips within {max_total_secs}s"
    )]
    Infeasible {
        candidates: usize,
        min_clips: usize,
        max_clips: usize,
        max_total_secs: u32,
    },
    #[error("invalid selection criteria: {0}")]
    InvalidCriteria(#[from] CriteriaError),
}
