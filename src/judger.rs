//! Judger module for grading submissions
//!
//! This module handles the core grading logic: one build, then every
//! testcase run in name order against the same workspace, then a summary.

use std::any::Any;
use std::collections::{BTreeMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use tracing::{debug, error, info, warn};

use crate::checker::judge_outcome;
use crate::compiler::{self, BuildOutcome};
use crate::config::{ExecutionLimits, SettingsStore};
use crate::core::{BuildFailure, CaseReport, JudgeOutcome, JudgeSummary, TestCase, Verdict};
use crate::error::EngineError;
use crate::languages::{LanguageProfile, LanguageRegistry};
use crate::runner::{CommandSpec, ExecutionOutcome, Runner};
use crate::storage::TestCaseStore;
use crate::workspace::Workspace;

/// Grades submissions; holds only read-only state and is shared across requests
#[derive(Clone)]
pub struct Judger {
    registry: Arc<LanguageRegistry>,
    runner: Arc<dyn Runner>,
    workspace_root: Option<PathBuf>,
}

impl Judger {
    pub fn new(registry: LanguageRegistry, runner: Arc<dyn Runner>) -> Self {
        Self {
            registry: Arc::new(registry),
            runner,
            workspace_root: None,
        }
    }

    /// Create workspaces under `root` instead of the system temp dir
    pub fn with_workspace_root(mut self, root: impl AsRef<Path>) -> Self {
        self.workspace_root = Some(root.as_ref().to_path_buf());
        self
    }

    pub fn registry(&self) -> &LanguageRegistry {
        &self.registry
    }

    /// Grade `source` against `test_cases`
    ///
    /// Client errors are rejected before a workspace is created. The
    /// workspace is removed before this returns, whatever the outcome.
    pub async fn grade_submission(
        &self,
        source: &str,
        language: &str,
        test_cases: &[TestCase],
        limits: &ExecutionLimits,
    ) -> Result<JudgeOutcome, EngineError> {
        let profile = self.registry.lookup(language)?;
        limits.validate()?;
        let ordered = order_test_cases(test_cases)?;

        info!(
            "Judging {} submission against {} testcases",
            profile.language,
            ordered.len()
        );

        let workspace = Workspace::acquire(self.workspace_root.as_deref())?;
        let result = self
            .grade_in_workspace(&workspace, profile, source, &ordered, limits)
            .await;
        workspace.close().await;

        if let Err(e) = &result {
            warn!("Judge request failed: {}", e);
        }
        result
    }

    /// Read limits and testcases from the collaborators, then grade
    pub async fn grade_from_stores(
        &self,
        source: &str,
        language: &str,
        store: &dyn TestCaseStore,
        settings: &dyn SettingsStore,
    ) -> Result<JudgeOutcome, EngineError> {
        self.registry.lookup(language)?;

        let limits = settings
            .limits()
            .await
            .map_err(|e| EngineError::Storage(format!("Failed to read settings: {:#}", e)))?;
        let test_cases = store
            .load_all()
            .await
            .map_err(|e| EngineError::Storage(format!("Failed to load testcases: {:#}", e)))?;

        self.grade_submission(source, language, &test_cases, &limits)
            .await
    }

    async fn grade_in_workspace(
        &self,
        workspace: &Workspace,
        profile: &LanguageProfile,
        source: &str,
        test_cases: &[&TestCase],
        limits: &ExecutionLimits,
    ) -> Result<JudgeOutcome, EngineError> {
        let build = AssertUnwindSafe(compiler::build(
            self.runner.as_ref(),
            workspace,
            profile,
            source,
            limits.compile_timeout(),
        ))
        .catch_unwind()
        .await
        .map_err(|panic| {
            EngineError::Internal(format!("Build step panicked: {}", panic_message(&*panic)))
        })??;

        if let BuildOutcome::Failure { message, timed_out } = build {
            return Ok(JudgeOutcome::BuildFailed(BuildFailure {
                message,
                timed_out,
                language: profile.language,
                timestamp: Utc::now(),
            }));
        }

        let run_cmd = CommandSpec::from_vec(&profile.run_command).with_work_dir(workspace.path());

        let mut results = BTreeMap::new();
        let mut success_count = 0;

        for tc in test_cases {
            let report = self
                .run_testcase(workspace, &run_cmd, tc, limits.run_timeout())
                .await;

            debug!(
                "Testcase {}: verdict={}, elapsed={:.3}s",
                tc.name, report.verdict, report.elapsed_secs
            );

            if report.verdict.is_passed() {
                success_count += 1;
            }
            results.insert(tc.name.clone(), report);
        }

        let summary = JudgeSummary::new(
            success_count,
            test_cases.len(),
            profile.language,
            limits.memory_limit_mb,
        );

        info!(
            "Judge summary: language={}, passed={}/{}, success_rate={}%",
            summary.language, summary.success_count, summary.total_count, summary.success_rate
        );

        Ok(JudgeOutcome::Graded { results, summary })
    }

    /// Run and grade one testcase; never fails the request
    async fn run_testcase(
        &self,
        workspace: &Workspace,
        run_cmd: &CommandSpec,
        tc: &TestCase,
        timeout: Duration,
    ) -> CaseReport {
        let expected_output = tc.expected_output.as_deref().map(|s| s.trim().to_string());

        let run = AssertUnwindSafe(self.runner.run(run_cmd, Some(&tc.input), timeout))
            .catch_unwind()
            .await;

        let outcome = match run {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                warn!("Failed to run testcase {}: {:#}", tc.name, e);
                return unexecuted_report(
                    tc,
                    expected_output,
                    workspace.redact(&format!("Failed to execute program: {:#}", e)),
                );
            }
            Err(panic) => {
                let fault = EngineError::Internal(format!(
                    "Runner panicked: {}",
                    panic_message(&*panic)
                ));
                error!("Testcase {}: {}", tc.name, fault);
                return unexecuted_report(tc, expected_output, workspace.redact(&fault.to_string()));
            }
        };

        let verdict = redact_verdict(
            workspace,
            judge_outcome(&outcome, tc.expected_output.as_deref()),
        );

        CaseReport {
            name: tc.name.clone(),
            actual_output: workspace.redact(&reported_output(&outcome)),
            expected_output,
            verdict,
            timed_out: outcome.timed_out,
            exit_code: outcome.exit_code,
            elapsed_secs: outcome.elapsed_secs(),
        }
    }
}

/// Report for a testcase whose program never produced an outcome
fn unexecuted_report(tc: &TestCase, expected_output: Option<String>, message: String) -> CaseReport {
    CaseReport {
        name: tc.name.clone(),
        actual_output: String::new(),
        expected_output,
        verdict: Verdict::RuntimeError { message },
        timed_out: false,
        exit_code: None,
        elapsed_secs: 0.0,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Sort by name and reject duplicates
fn order_test_cases(test_cases: &[TestCase]) -> Result<Vec<&TestCase>, EngineError> {
    let mut seen = HashSet::with_capacity(test_cases.len());
    for tc in test_cases {
        if !seen.insert(tc.name.as_str()) {
            return Err(EngineError::DuplicateTestCase(tc.name.clone()));
        }
    }

    let mut ordered: Vec<&TestCase> = test_cases.iter().collect();
    ordered.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(ordered)
}

/// Trimmed stdout, with stderr appended when the program exited abnormally
fn reported_output(outcome: &ExecutionOutcome) -> String {
    let mut output = outcome.stdout.trim().to_string();
    if !outcome.timed_out && outcome.exit_code != Some(0) {
        let stderr = outcome.stderr.trim();
        if !stderr.is_empty() {
            output.push_str("\nError: ");
            output.push_str(stderr);
        }
    }
    output
}

fn redact_verdict(workspace: &Workspace, verdict: Verdict) -> Verdict {
    match verdict {
        Verdict::RuntimeError { message } => Verdict::RuntimeError {
            message: workspace.redact(&message),
        },
        other => other,
    }
}
