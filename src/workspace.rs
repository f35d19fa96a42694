//! Ephemeral per-request workspace
//!
//! One `Workspace` serves exactly one judge request: the source file, the
//! compile artifact and the working directory of every test run. The
//! directory is removed by `close().await` or, on any other exit path, on drop.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::languages::LanguageProfile;

const WORKSPACE_PREFIX: &str = "judge-";

#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create an empty directory under `root`, or under the system temp dir
    pub fn acquire(root: Option<&Path>) -> Result<Self, EngineError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKSPACE_PREFIX);

        let dir = match root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|e| EngineError::Workspace(format!("Failed to create workspace: {}", e)))?;

        debug!("Acquired workspace {:?}", dir.path());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write the submitted source under the profile's file name
    pub async fn write_source(
        &self,
        profile: &LanguageProfile,
        source: &str,
    ) -> Result<PathBuf, EngineError> {
        let source_path = self.path().join(&profile.source_file);
        fs::write(&source_path, source).await.map_err(|e| {
            EngineError::Workspace(format!(
                "Failed to write source file {}: {}",
                profile.source_file, e
            ))
        })?;
        Ok(source_path)
    }

    /// Replace the workspace's absolute path in `text` with `.`
    pub fn redact(&self, text: &str) -> String {
        let path = self.path().to_string_lossy();
        if path.is_empty() {
            return text.to_string();
        }
        text.replace(&*path, ".")
    }

    /// Remove the directory on the blocking pool, logging instead of failing
    pub async fn close(self) {
        let path = self.path().to_path_buf();
        let Workspace { dir } = self;
        match tokio::task::spawn_blocking(move || dir.close()).await {
            Ok(Ok(())) => debug!("Released workspace {:?}", path),
            Ok(Err(e)) => warn!("Failed to remove workspace {:?}: {}", path, e),
            Err(e) => warn!("Workspace cleanup task failed for {:?}: {}", path, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::{Language, LanguageProfile};

    fn profile() -> LanguageProfile {
        LanguageProfile {
            language: Language::Shell,
            source_file: "main.sh".into(),
            compile_command: vec![],
            run_command: vec!["sh".into(), "main.sh".into()],
        }
    }

    #[test]
    fn test_acquire_is_empty_and_exclusive() {
        let root = tempfile::tempdir().unwrap();
        let a = Workspace::acquire(Some(root.path())).unwrap();
        let b = Workspace::acquire(Some(root.path())).unwrap();

        assert_ne!(a.path(), b.path());
        assert!(a.path().starts_with(root.path()));
        assert_eq!(std::fs::read_dir(a.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_close_removes_directory() {
        let ws = Workspace::acquire(None).unwrap();
        let source_path = ws.write_source(&profile(), "echo hi\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(&source_path).unwrap(), "echo hi\n");

        std::fs::create_dir(ws.path().join("nested")).unwrap();
        std::fs::write(ws.path().join("nested/out.txt"), b"x").unwrap();

        let path = ws.path().to_path_buf();
        ws.close().await;
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_removes_directory() {
        let path = {
            let ws = Workspace::acquire(None).unwrap();
            std::fs::write(ws.path().join("main"), b"binary").unwrap();
            ws.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_removed_on_panic() {
        let root = tempfile::tempdir().unwrap();
        let root_path = root.path().to_path_buf();

        let result = std::panic::catch_unwind(move || {
            let _ws = Workspace::acquire(Some(root_path.as_path())).unwrap();
            panic!("step failed");
        });

        assert!(result.is_err());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_acquire_in_missing_root_fails() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("missing");
        assert!(matches!(
            Workspace::acquire(Some(missing.as_path())),
            Err(EngineError::Workspace(_))
        ));
    }

    #[test]
    fn test_redact() {
        let ws = Workspace::acquire(None).unwrap();
        let message = format!("{}/main.cpp:1:1: error", ws.path().display());
        assert_eq!(ws.redact(&message), "./main.cpp:1:1: error");
        assert_eq!(ws.redact("no path here"), "no path here");
    }
}
