//! Output checker
//!
//! Turns one run outcome and the stored expected output into a `Verdict`.
//! Both outputs are trimmed at the outer boundary only; whitespace inside
//! the output, including line endings, must match exactly.

use crate::core::verdict::Verdict;
use crate::runner::ExecutionOutcome;

/// Edit distance is only computed below this size (bytes, each side)
const EDIT_DISTANCE_MAX_LEN: usize = 64 * 1024;

/// Grade one run, in priority order: timeout, runtime error, missing
/// expected output, then output comparison
pub fn judge_outcome(outcome: &ExecutionOutcome, expected: Option<&str>) -> Verdict {
    if outcome.timed_out {
        return Verdict::Timeout;
    }

    if outcome.exit_code != Some(0) {
        return Verdict::RuntimeError {
            message: runtime_error_message(outcome),
        };
    }

    match expected {
        None => Verdict::NoExpectedOutput,
        Some(expected) => compare(&outcome.stdout, expected),
    }
}

/// Compare captured stdout against the expected output
pub fn compare(actual: &str, expected: &str) -> Verdict {
    if compare_output(actual, expected) {
        Verdict::Passed
    } else {
        Verdict::Failed {
            reason: mismatch_reason(actual.trim(), expected.trim()),
        }
    }
}

/// Exact equality after stripping leading/trailing whitespace of the whole text
pub fn compare_output(actual: &str, expected: &str) -> bool {
    actual.trim() == expected.trim()
}

fn runtime_error_message(outcome: &ExecutionOutcome) -> String {
    let stderr = outcome.stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_string();
    }
    match (outcome.exit_code, outcome.signal) {
        (_, Some(sig)) => format!("Program terminated by signal {}", sig),
        (Some(code), None) => format!("Program exited with code {}", code),
        (None, None) => "Program terminated abnormally".to_string(),
    }
}

fn mismatch_reason(actual: &str, expected: &str) -> String {
    let mut reason = match first_difference(actual, expected) {
        Some(line) => format!("Output differs at line {}", line),
        None => "Output differs".to_string(),
    };

    if actual.len() <= EDIT_DISTANCE_MAX_LEN && expected.len() <= EDIT_DISTANCE_MAX_LEN {
        let distance = triple_accel::levenshtein(actual.as_bytes(), expected.as_bytes());
        reason.push_str(&format!(" (edit distance {})", distance));
    }

    reason
}

/// 1-based number of the first line that differs
fn first_difference(actual: &str, expected: &str) -> Option<usize> {
    let mut actual_lines = actual.split('\n');
    let mut expected_lines = expected.split('\n');
    let mut line = 1;

    loop {
        match (actual_lines.next(), expected_lines.next()) {
            (None, None) => return None,
            (a, e) if a != e => return Some(line),
            _ => line += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exited(stdout: &str, code: i32) -> ExecutionOutcome {
        ExecutionOutcome {
            stdout: stdout.to_string(),
            exit_code: Some(code),
            ..Default::default()
        }
    }

    #[test]
    fn test_compare_output_exact_match() {
        assert!(compare_output("hello\nworld\n", "hello\nworld\n"));
    }

    #[test]
    fn test_compare_output_outer_whitespace() {
        assert!(compare_output("  Hello\n\n", "Hello"));
        assert!(compare_output("\tHello", "Hello\r\n"));
    }

    #[test]
    fn test_compare_output_inner_whitespace_matters() {
        assert!(!compare_output("hello  \nworld", "hello\nworld"));
        assert!(!compare_output("1 2", "1  2"));
        assert!(!compare_output("a\r\nb", "a\nb"));
    }

    #[test]
    fn test_compare_output_case_sensitive() {
        assert!(!compare_output("hello", "Hello"));
    }

    #[test]
    fn test_compare_is_idempotent() {
        let first = compare("1\n2\n", "1\n3\n");
        let second = compare("1\n2\n", "1\n3\n");
        assert_eq!(first, second);
        assert_eq!(
            first,
            Verdict::Failed {
                reason: "Output differs at line 2 (edit distance 1)".into()
            }
        );
    }

    #[test]
    fn test_mismatch_on_extra_line() {
        assert_eq!(
            compare("a\nb\nc", "a\nb"),
            Verdict::Failed {
                reason: "Output differs at line 3 (edit distance 2)".into()
            }
        );
    }

    #[test]
    fn test_priority_timeout_first() {
        let outcome = ExecutionOutcome {
            stdout: "Hello".into(),
            timed_out: true,
            ..Default::default()
        };
        assert_eq!(judge_outcome(&outcome, Some("Hello")), Verdict::Timeout);
        assert_eq!(judge_outcome(&outcome, None), Verdict::Timeout);
    }

    #[test]
    fn test_priority_runtime_error_before_missing_output() {
        let mut outcome = exited("Hello", 1);
        outcome.stderr = "Traceback: boom\n".into();
        assert_eq!(
            judge_outcome(&outcome, None),
            Verdict::RuntimeError {
                message: "Traceback: boom".into()
            }
        );
        // matching stdout does not rescue a non-zero exit
        assert!(matches!(
            judge_outcome(&outcome, Some("Hello")),
            Verdict::RuntimeError { .. }
        ));
    }

    #[test]
    fn test_runtime_error_without_stderr() {
        let killed = ExecutionOutcome {
            signal: Some(11),
            ..Default::default()
        };
        assert_eq!(
            judge_outcome(&killed, Some("")),
            Verdict::RuntimeError {
                message: "Program terminated by signal 11".into()
            }
        );
        assert_eq!(
            judge_outcome(&exited("", 2), Some("")),
            Verdict::RuntimeError {
                message: "Program exited with code 2".into()
            }
        );
    }

    #[test]
    fn test_no_expected_output() {
        assert_eq!(judge_outcome(&exited("42", 0), None), Verdict::NoExpectedOutput);
    }

    #[test]
    fn test_empty_expected_is_compared() {
        assert_eq!(judge_outcome(&exited("\n", 0), Some("")), Verdict::Passed);
        assert!(matches!(
            judge_outcome(&exited("x", 0), Some("")),
            Verdict::Failed { .. }
        ));
    }

    #[test]
    fn test_passed() {
        assert_eq!(judge_outcome(&exited("Hello\n", 0), Some("Hello")), Verdict::Passed);
    }
}
