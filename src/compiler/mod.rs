//! Compiler module - Build step of a judge request
//!
//! Writes the submitted source into the workspace and, for compiled
//! languages, runs the compile command there under the compile timeout.

use std::time::Duration;

use tracing::{debug, info};

use crate::error::EngineError;
use crate::languages::LanguageProfile;
use crate::runner::{CommandSpec, ExecutionOutcome, Runner};
use crate::workspace::Workspace;

/// Result of the build step
#[derive(Debug, Clone, PartialEq)]
pub enum BuildOutcome {
    Success,
    Failure { message: String, timed_out: bool },
}

impl BuildOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, BuildOutcome::Success)
    }
}

/// Write the source and compile it if the language needs it
///
/// `Err` is reserved for workspace faults (source write, compiler spawn);
/// a rejected program is `Ok(BuildOutcome::Failure)`.
pub async fn build(
    runner: &dyn Runner,
    workspace: &Workspace,
    profile: &LanguageProfile,
    source: &str,
    timeout: Duration,
) -> Result<BuildOutcome, EngineError> {
    workspace.write_source(profile, source).await?;

    if !profile.requires_compile() {
        debug!("{} needs no compilation", profile.language);
        return Ok(BuildOutcome::Success);
    }

    debug!("Compiling with {:?}", profile.compile_command);

    let cmd = CommandSpec::from_vec(&profile.compile_command).with_work_dir(workspace.path());
    let result = runner.run(&cmd, None, timeout).await.map_err(|e| {
        EngineError::Workspace(workspace.redact(&format!(
            "Failed to run compiler {}: {:#}",
            cmd.program, e
        )))
    })?;

    if result.is_success() {
        info!("Compiled {} in {:.3}s", profile.source_file, result.elapsed_secs());
        return Ok(BuildOutcome::Success);
    }

    let message = workspace.redact(&compile_error_message(&result, timeout));
    info!(
        "Compilation failed (timed_out={}, exit_code={:?})",
        result.timed_out, result.exit_code
    );

    Ok(BuildOutcome::Failure {
        message,
        timed_out: result.timed_out,
    })
}

/// Compiler diagnostics, or a synthesized message when the compiler printed none
fn compile_error_message(result: &ExecutionOutcome, timeout: Duration) -> String {
    if result.timed_out {
        let diagnostics = result.stderr.trim();
        let base = format!("Compilation timed out after {}s", timeout.as_secs());
        return if diagnostics.is_empty() {
            base
        } else {
            format!("{}\n{}", base, diagnostics)
        };
    }

    if !result.stderr.trim().is_empty() {
        result.stderr.clone()
    } else if !result.stdout.trim().is_empty() {
        result.stdout.clone()
    } else {
        match (result.exit_code, result.signal) {
            (_, Some(sig)) => format!("Compiler terminated by signal {}", sig),
            (Some(code), None) => format!("Compilation failed with exit code {}", code),
            (None, None) => "Compilation failed".to_string(),
        }
    }
}
