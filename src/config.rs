//! Execution limits and the settings store they are read from
//!
//! Limits are read once per judge request and passed explicitly into every
//! build and run step. The engine never writes settings.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::EngineError;

/// Limits applied to one judge request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionLimits {
    /// Compile wall-clock timeout in seconds (default: 30s)
    pub compile_timeout_secs: u64,
    /// Per-testcase run wall-clock timeout in seconds (default: 5s)
    pub run_timeout_secs: u64,
    /// Memory limit in MB, advisory only (default: 256MB)
    pub memory_limit_mb: u32,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            compile_timeout_secs: 30,
            run_timeout_secs: 5,
            memory_limit_mb: 256,
        }
    }
}

impl ExecutionLimits {
    pub fn compile_timeout(&self) -> Duration {
        Duration::from_secs(self.compile_timeout_secs)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.compile_timeout_secs == 0 {
            return Err(EngineError::InvalidLimits(
                "compile timeout must be at least 1 second".into(),
            ));
        }
        if self.run_timeout_secs == 0 {
            return Err(EngineError::InvalidLimits(
                "run timeout must be at least 1 second".into(),
            ));
        }
        Ok(())
    }
}

/// Read-only source of the current limits
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn limits(&self) -> Result<ExecutionLimits>;
}

/// Fixed limits, for callers that already hold them
#[derive(Debug, Clone, Default)]
pub struct StaticSettings(pub ExecutionLimits);

#[async_trait]
impl SettingsStore for StaticSettings {
    async fn limits(&self) -> Result<ExecutionLimits> {
        Ok(self.0.clone())
    }
}

/// Another store with fixed timeout overrides applied on top
#[derive(Debug, Clone)]
pub struct OverrideSettings<S> {
    inner: S,
    run_timeout_secs: Option<u64>,
    compile_timeout_secs: Option<u64>,
}

impl<S> OverrideSettings<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            run_timeout_secs: None,
            compile_timeout_secs: None,
        }
    }

    pub fn with_run_timeout(mut self, secs: Option<u64>) -> Self {
        self.run_timeout_secs = secs;
        self
    }

    pub fn with_compile_timeout(mut self, secs: Option<u64>) -> Self {
        self.compile_timeout_secs = secs;
        self
    }
}

#[async_trait]
impl<S: SettingsStore> SettingsStore for OverrideSettings<S> {
    async fn limits(&self) -> Result<ExecutionLimits> {
        let mut limits = self.inner.limits().await?;
        if let Some(secs) = self.run_timeout_secs {
            limits.run_timeout_secs = secs;
        }
        if let Some(secs) = self.compile_timeout_secs {
            limits.compile_timeout_secs = secs;
        }
        Ok(limits)
    }
}

/// Settings kept in a TOML file, re-read on every request
///
/// A missing file yields the defaults; missing keys fall back per field.
#[derive(Debug, Clone)]
pub struct TomlSettingsStore {
    path: PathBuf,
}

impl TomlSettingsStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SettingsStore for TomlSettingsStore {
    async fn limits(&self) -> Result<ExecutionLimits> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Settings file {:?} not found, using defaults", self.path);
                return Ok(ExecutionLimits::default());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read settings file {:?}", self.path))
            }
        };

        let limits: ExecutionLimits = toml::from_str(&content)
            .with_context(|| format!("Invalid settings file {:?}", self.path))?;
        Ok(limits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_limits() {
        let limits = ExecutionLimits::default();
        assert_eq!(limits.compile_timeout(), Duration::from_secs(30));
        assert_eq!(limits.run_timeout(), Duration::from_secs(5));
        assert_eq!(limits.memory_limit_mb, 256);
        assert!(limits.validate().is_ok());
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        let limits = ExecutionLimits {
            run_timeout_secs: 0,
            ..Default::default()
        };
        assert!(matches!(
            limits.validate(),
            Err(EngineError::InvalidLimits(_))
        ));

        let limits = ExecutionLimits {
            compile_timeout_secs: 0,
            ..Default::default()
        };
        assert!(limits.validate().is_err());
    }

    #[tokio::test]
    async fn test_toml_settings_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "run_timeout_secs = 2").unwrap();

        let store = TomlSettingsStore::new(file.path());
        let limits = store.limits().await.unwrap();
        assert_eq!(limits.run_timeout_secs, 2);
        assert_eq!(limits.compile_timeout_secs, 30);
        assert_eq!(limits.memory_limit_mb, 256);
    }

    #[tokio::test]
    async fn test_toml_settings_reread_each_call() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let store = TomlSettingsStore::new(&path);

        assert_eq!(store.limits().await.unwrap(), ExecutionLimits::default());

        std::fs::write(&path, "memory_limit_mb = 512\ncompile_timeout_secs = 10\n").unwrap();
        let limits = store.limits().await.unwrap();
        assert_eq!(limits.memory_limit_mb, 512);
        assert_eq!(limits.compile_timeout_secs, 10);
    }

    #[tokio::test]
    async fn test_toml_settings_invalid() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "run_timeout_secs = \"fast\"").unwrap();

        let store = TomlSettingsStore::new(file.path());
        assert!(store.limits().await.is_err());
    }

    #[tokio::test]
    async fn test_override_settings() {
        let base = StaticSettings(ExecutionLimits {
            memory_limit_mb: 64,
            ..Default::default()
        });

        let store = OverrideSettings::new(base.clone()).with_run_timeout(Some(2));
        let limits = store.limits().await.unwrap();
        assert_eq!(limits.run_timeout_secs, 2);
        assert_eq!(limits.compile_timeout_secs, 30);
        assert_eq!(limits.memory_limit_mb, 64);

        let untouched = OverrideSettings::new(base.clone()).with_compile_timeout(None);
        assert_eq!(untouched.limits().await.unwrap(), base.0);
    }

    #[tokio::test]
    async fn test_static_settings() {
        let limits = ExecutionLimits {
            run_timeout_secs: 1,
            ..Default::default()
        };
        let store = StaticSettings(limits.clone());
        assert_eq!(store.limits().await.unwrap(), limits);
    }
}
