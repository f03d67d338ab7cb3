//! Scoring strategies applied to an agent's accumulated results.

use sagaflow_protocols::{Scores, Values};

/// Computes confidence and quality from the final results map.
///
/// Implementations may overshoot; [`Scores::new`] clamps.
pub trait Scorer: Send + Sync {
    fn score(&self, results: &Values) -> Scores;
}

impl<F> Scorer for F
where
    F: Fn(&Values) -> Scores + Send + Sync,
{
    fn score(&self, results: &Values) -> Scores {
        self(results)
    }
}

/// Scorer returning the same scores for every run.
#[derive(Debug, Clone, Copy)]
pub struct FixedScorer(pub Scores);

impl Scorer for FixedScorer {
    fn score(&self, _results: &Values) -> Scores {
        self.0
    }
}
