//! Result records returned to the caller of a judge request

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::verdict::Verdict;
use crate::languages::Language;

/// Result of one test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseReport {
    pub name: String,
    /// Trimmed stdout, with stderr appended on a runtime error
    pub actual_output: String,
    pub expected_output: Option<String>,
    #[serde(flatten)]
    pub verdict: Verdict,
    pub timed_out: bool,
    pub exit_code: Option<i32>,
    pub elapsed_secs: f64,
}

/// Aggregate over all test cases of one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeSummary {
    pub success_count: usize,
    pub total_count: usize,
    /// Percentage in `0.0..=100.0`, `0.0` when there are no test cases
    pub success_rate: f64,
    pub language: Language,
    /// Advisory only, never enforced
    pub memory_limit_mb: u32,
    pub timestamp: DateTime<Utc>,
}

impl JudgeSummary {
    pub fn new(
        success_count: usize,
        total_count: usize,
        language: Language,
        memory_limit_mb: u32,
    ) -> Self {
        Self {
            success_count,
            total_count,
            success_rate: success_rate(success_count, total_count),
            language,
            memory_limit_mb,
            timestamp: Utc::now(),
        }
    }
}

fn success_rate(success_count: usize, total_count: usize) -> f64 {
    if total_count == 0 {
        return 0.0;
    }
    let rate = success_count as f64 / total_count as f64 * 100.0;
    (rate * 100.0).round() / 100.0
}

/// Request-wide compile failure; no test case was run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildFailure {
    pub message: String,
    pub timed_out: bool,
    pub language: Language,
    pub timestamp: DateTime<Utc>,
}

impl BuildFailure {
    pub fn verdict(&self) -> Verdict {
        Verdict::CompileError {
            message: self.message.clone(),
        }
    }
}

/// Response of a judge request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JudgeOutcome {
    Graded {
        results: BTreeMap<String, CaseReport>,
        summary: JudgeSummary,
    },
    BuildFailed(BuildFailure),
}

impl JudgeOutcome {
    pub fn summary(&self) -> Option<&JudgeSummary> {
        match self {
            JudgeOutcome::Graded { summary, .. } => Some(summary),
            JudgeOutcome::BuildFailed(_) => None,
        }
    }

    pub fn results(&self) -> Option<&BTreeMap<String, CaseReport>> {
        match self {
            JudgeOutcome::Graded { results, .. } => Some(results),
            JudgeOutcome::BuildFailed(_) => None,
        }
    }

    pub fn is_build_failure(&self) -> bool {
        matches!(self, JudgeOutcome::BuildFailed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_rate() {
        assert_eq!(success_rate(0, 0), 0.0);
        assert_eq!(success_rate(1, 1), 100.0);
        assert_eq!(success_rate(1, 3), 33.33);
        assert_eq!(success_rate(2, 3), 66.67);
    }

    #[test]
    fn test_summary_new() {
        let summary = JudgeSummary::new(3, 4, Language::Python, 256);
        assert_eq!(summary.success_count, 3);
        assert_eq!(summary.total_count, 4);
        assert_eq!(summary.success_rate, 75.0);
    }

    #[test]
    fn test_outcome_serialization() {
        let failure = JudgeOutcome::BuildFailed(BuildFailure {
            message: "main.cpp:1: error".into(),
            timed_out: false,
            language: Language::Cpp,
            timestamp: Utc::now(),
        });
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["status"], "build_failed");
        assert_eq!(json["language"], "cpp");
        assert!(json.get("results").is_none());

        let mut results = BTreeMap::new();
        results.insert(
            "t1".to_string(),
            CaseReport {
                name: "t1".into(),
                actual_output: "Hello".into(),
                expected_output: Some("Hello".into()),
                verdict: Verdict::Passed,
                timed_out: false,
                exit_code: Some(0),
                elapsed_secs: 0.01,
            },
        );
        let graded = JudgeOutcome::Graded {
            results,
            summary: JudgeSummary::new(1, 1, Language::Python, 256),
        };
        let json = serde_json::to_value(&graded).unwrap();
        assert_eq!(json["status"], "graded");
        assert_eq!(json["results"]["t1"]["verdict"], "passed");
        assert_eq!(json["summary"]["success_rate"], 100.0);
    }
}
