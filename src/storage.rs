//! Testcase storage
//!
//! The engine only reads testcases. `FsTestCaseStore` uses the flat directory
//! layout `<name>.in` (input) and optional `<name>.out` (expected output).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, warn};

use crate::core::testcase::{is_valid_name, validate_name, TestCase};

const INPUT_EXT: &str = "in";
const OUTPUT_EXT: &str = "out";

/// Read-only source of testcases
#[async_trait]
pub trait TestCaseStore: Send + Sync {
    /// Names of all stored testcases, sorted
    async fn names(&self) -> Result<Vec<String>>;

    /// Load one testcase by name
    async fn load(&self, name: &str) -> Result<TestCase>;

    /// Load every stored testcase, in name order
    async fn load_all(&self) -> Result<Vec<TestCase>> {
        let names = self.names().await?;
        let mut cases = Vec::with_capacity(names.len());
        for name in names {
            cases.push(self.load(&name).await?);
        }
        Ok(cases)
    }
}

/// Testcases kept as `.in`/`.out` file pairs in one directory
#[derive(Debug, Clone)]
pub struct FsTestCaseStore {
    dir: PathBuf,
}

impl FsTestCaseStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn input_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, INPUT_EXT))
    }

    fn output_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, OUTPUT_EXT))
    }
}

#[async_trait]
impl TestCaseStore for FsTestCaseStore {
    async fn names(&self) -> Result<Vec<String>> {
        let mut entries = fs::read_dir(&self.dir)
            .await
            .with_context(|| format!("Failed to read testcase directory {:?}", self.dir))?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(INPUT_EXT) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if !is_valid_name(stem) {
                warn!("Skipping testcase with invalid name: {:?}", path.file_name());
                continue;
            }
            names.push(stem.to_string());
        }

        names.sort();
        debug!("Found {} testcases in {:?}", names.len(), self.dir);
        Ok(names)
    }

    async fn load(&self, name: &str) -> Result<TestCase> {
        validate_name(name)?;
        let input_path = self.input_path(name);
        let input = fs::read_to_string(&input_path)
            .await
            .with_context(|| format!("Failed to read testcase input {}", name))?;

        let expected_output = match fs::read_to_string(self.output_path(name)).await {
            Ok(content) => Some(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read testcase output {}", name))
            }
        };

        Ok(TestCase::new(name, input, expected_output)?)
    }
}
