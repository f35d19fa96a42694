use serde::{Deserialize, Serialize};
use std::fmt;

/// Graded outcome of one test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Passed,
    Failed { reason: String },
    NoExpectedOutput,
    CompileError { message: String },
    RuntimeError { message: String },
    Timeout,
}

impl Verdict {
    pub fn is_passed(&self) -> bool {
        matches!(self, Verdict::Passed)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Passed => "passed",
            Verdict::Failed { .. } => "failed",
            Verdict::NoExpectedOutput => "no_expected_output",
            Verdict::CompileError { .. } => "compile_error",
            Verdict::RuntimeError { .. } => "runtime_error",
            Verdict::Timeout => "timeout",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_display() {
        assert_eq!(Verdict::Passed.to_string(), "passed");
        assert_eq!(
            Verdict::Failed {
                reason: "line 1 differs".into()
            }
            .to_string(),
            "failed"
        );
        assert_eq!(Verdict::NoExpectedOutput.to_string(), "no_expected_output");
        assert_eq!(Verdict::Timeout.to_string(), "timeout");
    }

    #[test]
    fn test_verdict_serialization() {
        let json = serde_json::to_value(Verdict::RuntimeError {
            message: "boom".into(),
        })
        .unwrap();
        assert_eq!(json["verdict"], "runtime_error");
        assert_eq!(json["message"], "boom");

        let json = serde_json::to_value(Verdict::Timeout).unwrap();
        assert_eq!(json, serde_json::json!({ "verdict": "timeout" }));
    }
}
