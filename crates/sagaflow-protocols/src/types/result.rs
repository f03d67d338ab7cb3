//! Agent run results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Values;

/// Upper bound of the confidence score.
pub const MAX_CONFIDENCE: f64 = 1.0;
/// Upper bound of the quality score.
pub const MAX_QUALITY: f64 = 10.0;

/// Kind of payload an agent produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    Findings,
    PocResults,
    Documentation,
    Validation,
}

impl ResultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Findings => "findings",
            Self::PocResults => "poc_results",
            Self::Documentation => "documentation",
            Self::Validation => "validation",
        }
    }
}

impl std::fmt::Display for ResultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResultKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "findings" => Ok(Self::Findings),
            "poc_results" => Ok(Self::PocResults),
            "documentation" => Ok(Self::Documentation),
            "validation" => Ok(Self::Validation),
            other => Err(format!("unknown result kind: {}", other)),
        }
    }
}

/// Confidence and quality scores of a result.
///
/// Always within `[0, 1]` and `[0, 10]`; construction and deserialization
/// both clamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawScores")]
pub struct Scores {
    confidence: f64,
    quality: f64,
}

#[derive(Deserialize)]
struct RawScores {
    confidence: f64,
    quality: f64,
}

impl From<RawScores> for Scores {
    fn from(raw: RawScores) -> Self {
        Self::new(raw.confidence, raw.quality)
    }
}

fn clamp_score(value: f64, max: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, max)
}

impl Scores {
    pub fn new(confidence: f64, quality: f64) -> Self {
        Self {
            confidence: clamp_score(confidence, MAX_CONFIDENCE),
            quality: clamp_score(quality, MAX_QUALITY),
        }
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn quality(&self) -> f64 {
        self.quality
    }
}

impl Default for Scores {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Terminal output of an agent run. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResult {
    pub id: String,
    pub workflow_id: String,
    pub agent_type: String,
    pub result_kind: ResultKind,
    /// Accumulated results of all steps.
    pub data: Values,
    pub scores: Scores,
    pub execution_time_ms: u64,
    #[serde(default)]
    pub artifacts: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl AgentResult {
    pub fn new(
        workflow_id: impl Into<String>,
        agent_type: impl Into<String>,
        result_kind: ResultKind,
        data: Values,
        scores: Scores,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            workflow_id: workflow_id.into(),
            agent_type: agent_type.into(),
            result_kind,
            data,
            scores,
            execution_time_ms: 0,
            artifacts: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_execution_time_ms(mut self, ms: u64) -> Self {
        self.execution_time_ms = ms;
        self
    }

    pub fn with_artifacts(mut self, artifacts: Vec<String>) -> Self {
        self.artifacts = artifacts;
        self
    }

    pub fn confidence_score(&self) -> f64 {
        self.scores.confidence()
    }

    pub fn quality_score(&self) -> f64 {
        self.scores.quality()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scores_clamp_overshoot() {
        let scores = Scores::new(1.35, 12.5);
        assert_eq!(scores.confidence(), 1.0);
        assert_eq!(scores.quality(), 10.0);
    }

    #[test]
    fn test_scores_clamp_negative_and_nan() {
        let scores = Scores::new(-0.2, f64::NAN);
        assert_eq!(scores.confidence(), 0.0);
        assert_eq!(scores.quality(), 0.0);
    }

    #[test]
    fn test_scores_deserialize_clamps() {
        let scores: Scores =
            serde_json::from_value(json!({"confidence": 3.0, "quality": -1.0})).unwrap();
        assert_eq!(scores.confidence(), 1.0);
        assert_eq!(scores.quality(), 0.0);
    }

    #[test]
    fn test_result_kind_names() {
        assert_eq!(ResultKind::PocResults.as_str(), "poc_results");
        assert_eq!(
            serde_json::to_value(ResultKind::Findings).unwrap(),
            json!("findings")
        );
        assert_eq!("validation".parse::<ResultKind>().unwrap(), ResultKind::Validation);
    }

    #[test]
    fn test_agent_result_builder() {
        let result = AgentResult::new(
            "wf-1",
            "poc",
            ResultKind::PocResults,
            Values::new(),
            Scores::new(0.9, 9.0),
        )
        .with_execution_time_ms(1500)
        .with_artifacts(vec!["test_report.json".to_string()]);

        assert_eq!(result.workflow_id, "wf-1");
        assert_eq!(result.execution_time_ms, 1500);
        assert_eq!(result.confidence_score(), 0.9);
        assert_eq!(result.artifacts, vec!["test_report.json"]);
    }

    #[test]
    fn test_agent_result_json_round_trip() {
        let mut data = Values::new();
        data.insert("findings".to_string(), json!([{"name": "tokio"}]));
        let result = AgentResult::new("wf-2", "research", ResultKind::Findings, data, Scores::new(0.8, 8.0));

        let json = serde_json::to_string(&result).unwrap();
        let back: AgentResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }
}
