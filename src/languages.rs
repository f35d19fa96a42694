//! Language profiles for compilation and execution

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Supported language ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Cpp,
    Java,
    Python,
    Shell,
}

impl Language {
    pub const ALL: [Language; 4] = [
        Language::Cpp,
        Language::Java,
        Language::Python,
        Language::Shell,
    ];

    /// Canonical id, also the table name in `languages.toml`
    pub fn id(&self) -> &'static str {
        match self {
            Language::Cpp => "cpp",
            Language::Java => "java",
            Language::Python => "python",
            Language::Shell => "shell",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl FromStr for Language {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Language::ALL
            .into_iter()
            .find(|lang| lang.id() == lowered)
            .ok_or_else(|| EngineError::UnsupportedLanguage(s.to_string()))
    }
}

/// Profile for a supported programming language
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageProfile {
    pub language: Language,
    /// Name of the source file (e.g., "main.cpp")
    pub source_file: String,
    /// Compile command, empty if the language is interpreted
    pub compile_command: Vec<String>,
    /// Run command
    pub run_command: Vec<String>,
}

impl LanguageProfile {
    pub fn requires_compile(&self) -> bool {
        !self.compile_command.is_empty()
    }
}

/// Raw TOML configuration for a language
#[derive(Debug, Deserialize)]
struct RawLanguageConfig {
    source_file: String,
    compile_command: Option<String>,
    run_command: String,
    #[serde(default)]
    aliases: Vec<String>,
}

/// Immutable mapping from language id (or alias) to profile
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    profiles: BTreeMap<Language, LanguageProfile>,
    aliases: HashMap<String, Language>,
}

impl LanguageRegistry {
    /// Registry built from the bundled `files/languages.toml`
    pub fn builtin() -> anyhow::Result<Self> {
        let content = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/files/languages.toml"));
        Self::from_toml_str(content).context("Invalid bundled languages.toml")
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let raw_configs: BTreeMap<String, RawLanguageConfig> = toml::from_str(content)?;

        let mut profiles = BTreeMap::new();
        let mut aliases = HashMap::new();

        for (name, raw) in raw_configs {
            let language: Language = name
                .parse()
                .with_context(|| format!("Unknown language table [{}]", name))?;

            let run_command = into_command(&raw.run_command);
            if run_command.is_empty() {
                anyhow::bail!("Empty run_command for {}", name);
            }
            if raw.source_file.trim().is_empty() || raw.source_file.contains('/') {
                anyhow::bail!("Invalid source_file for {}: {:?}", name, raw.source_file);
            }

            let profile = LanguageProfile {
                language,
                source_file: raw.source_file,
                compile_command: raw
                    .compile_command
                    .map(|cmd| into_command(&cmd))
                    .unwrap_or_default(),
                run_command,
            };

            for alias in raw.aliases {
                aliases.insert(alias.to_lowercase(), language);
            }
            profiles.insert(language, profile);
        }

        Ok(Self { profiles, aliases })
    }

    /// Look up a profile by id or alias (case-insensitive)
    pub fn lookup(&self, id: &str) -> Result<&LanguageProfile, EngineError> {
        let key = id.trim().to_lowercase();
        let language = match self.aliases.get(&key) {
            Some(language) => *language,
            None => key
                .parse::<Language>()
                .map_err(|_| EngineError::UnsupportedLanguage(id.to_string()))?,
        };

        self.profiles
            .get(&language)
            .ok_or_else(|| EngineError::UnsupportedLanguage(id.to_string()))
    }

    pub fn get(&self, language: Language) -> Option<&LanguageProfile> {
        self.profiles.get(&language)
    }

    /// Ids of all registered languages, sorted
    pub fn supported(&self) -> Vec<&'static str> {
        let mut ids: Vec<_> = self.profiles.keys().map(|lang| lang.id()).collect();
        ids.sort_unstable();
        ids
    }
}

fn into_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(|s| s.to_string()).collect()
}
