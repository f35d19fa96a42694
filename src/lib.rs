//! Submission grading engine
//!
//! Compiles a submitted program when its language needs it, runs it once per
//! stored testcase with the testcase input on stdin, and grades each run:
//!
//! ```text
//! languages -> workspace -> compiler -> runner -> checker -> judger
//! ```
//!
//! Testcases and limits come from the `storage` and `config` collaborators;
//! the engine only reads them.

pub mod checker;
pub mod compiler;
pub mod config;
pub mod core;
pub mod error;
pub mod judger;
pub mod languages;
pub mod runner;
pub mod storage;
pub mod workspace;

pub use crate::config::{
    ExecutionLimits, OverrideSettings, SettingsStore, StaticSettings, TomlSettingsStore,
};
pub use crate::core::{BuildFailure, CaseReport, JudgeOutcome, JudgeSummary, TestCase, Verdict};
pub use crate::error::EngineError;
pub use crate::judger::Judger;
pub use crate::languages::{Language, LanguageProfile, LanguageRegistry};
pub use crate::runner::{ExecutionOutcome, ProcessRunner, Runner};
pub use crate::storage::{FsTestCaseStore, TestCaseStore};
