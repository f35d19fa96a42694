use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use judge_engine::{
    FsTestCaseStore, JudgeOutcome, Judger, LanguageRegistry, OverrideSettings, ProcessRunner,
    TomlSettingsStore,
};

/// Grade a source file against the stored testcases
#[derive(Debug, Parser)]
#[command(name = "judge", author, version, about, long_about = None)]
struct Cli {
    /// Language id (cpp, java, python, shell) or alias
    language: String,

    /// Path to the submitted source file
    source: PathBuf,

    /// Directory holding <name>.in / <name>.out testcases
    #[arg(long, env = "TESTCASE_DIR", default_value = "./testcases")]
    testcases: PathBuf,

    /// TOML file with execution limits
    #[arg(long, env = "SETTINGS_PATH", default_value = "./files/settings.toml")]
    settings: PathBuf,

    /// Parent directory for per-request workspaces
    #[arg(long, env = "WORKSPACE_ROOT")]
    workspace_root: Option<PathBuf>,

    /// Override the per-testcase run timeout (seconds)
    #[arg(long)]
    run_timeout: Option<u64>,

    /// Override the compile timeout (seconds)
    #[arg(long)]
    compile_timeout: Option<u64>,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("judge_engine=info,judge=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(outcome) if outcome.is_build_failure() => ExitCode::from(1),
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> Result<JudgeOutcome> {
    let registry = LanguageRegistry::builtin()?;
    info!("Supported languages: {:?}", registry.supported());

    let source = tokio::fs::read_to_string(&cli.source)
        .await
        .with_context(|| format!("Failed to read source file {:?}", cli.source))?;

    let mut judger = Judger::new(registry, Arc::new(ProcessRunner::default()));
    if let Some(root) = &cli.workspace_root {
        judger = judger.with_workspace_root(root);
    }

    let store = FsTestCaseStore::new(&cli.testcases);
    let settings = TomlSettingsStore::new(&cli.settings);
    info!(
        "Testcases from {:?}, settings from {:?}",
        store.dir(),
        settings.path()
    );
    let settings = OverrideSettings::new(settings)
        .with_run_timeout(cli.run_timeout)
        .with_compile_timeout(cli.compile_timeout);

    let outcome = judger
        .grade_from_stores(&source, &cli.language, &store, &settings)
        .await?;

    let json = if cli.pretty {
        serde_json::to_string_pretty(&outcome)?
    } else {
        serde_json::to_string(&outcome)?
    };
    println!("{}", json);

    Ok(outcome)
}
