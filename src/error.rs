//! Engine error taxonomy
//!
//! Only faults that abort a whole judge request live here. Compile failures,
//! timeouts, runtime errors and mismatches are graded outcomes, not errors
//! (see `core::verdict` and `core::report::JudgeOutcome`).

use thiserror::Error;

/// Request-level failure returned by the grading engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// Client error: the language id is not in the registry
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// Client error: the supplied limits cannot be honored
    #[error("Invalid execution limits: {0}")]
    InvalidLimits(String),

    /// Client error: two test cases share a name
    #[error("Duplicate testcase name: {0}")]
    DuplicateTestCase(String),

    /// Client error: a test case name is not a valid identifier
    #[error("Invalid testcase name: {0:?}")]
    InvalidTestCaseName(String),

    /// Workspace creation, source write or process spawn failed
    #[error("Workspace error: {0}")]
    Workspace(String),

    /// Test case or settings collaborator failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Unexpected failure inside the engine
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Whether the caller is at fault (reject without retry)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            EngineError::UnsupportedLanguage(_)
                | EngineError::InvalidLimits(_)
                | EngineError::DuplicateTestCase(_)
                | EngineError::InvalidTestCaseName(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(EngineError::UnsupportedLanguage("cobol".into()).is_client_error());
        assert!(EngineError::DuplicateTestCase("t1".into()).is_client_error());
        assert!(!EngineError::Workspace("spawn failed".into()).is_client_error());
        assert!(!EngineError::Internal("boom".into()).is_client_error());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            EngineError::UnsupportedLanguage("cobol".into()).to_string(),
            "Unsupported language: cobol"
        );
        assert_eq!(
            EngineError::InvalidTestCaseName("a b".into()).to_string(),
            "Invalid testcase name: \"a b\""
        );
    }
}
