pub mod report;
pub mod testcase;
pub mod verdict;

pub use report::{BuildFailure, CaseReport, JudgeOutcome, JudgeSummary};
pub use testcase::TestCase;
pub use verdict::Verdict;
