use serde::{Deserialize, Serialize};

use crate::error::EngineError;

pub const MAX_NAME_LEN: usize = 50;

/// Named input with an optional expected output
///
/// `expected_output: None` means no expected output was stored, which is
/// graded differently from an empty expected output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub name: String,
    pub input: String,
    pub expected_output: Option<String>,
}

impl TestCase {
    pub fn new(
        name: impl Into<String>,
        input: impl Into<String>,
        expected_output: Option<String>,
    ) -> Result<Self, EngineError> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            name,
            input: input.into(),
            expected_output,
        })
    }
}

/// Alphanumeric, `_` or `-`, 1 to 50 characters
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

pub fn validate_name(name: &str) -> Result<(), EngineError> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(EngineError::InvalidTestCaseName(name.to_string()))
    }
}
