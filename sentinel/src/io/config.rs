//! Sentinel configuration, by default stored at `.sentinel/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::types::DriveMode;

/// Default config location relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = ".sentinel/config.toml";

/// Sentinel configuration (TOML).
///
/// Meant to be edited by humans. Missing fields fall back to the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SentinelConfig {
    /// Drive path for new missions.
    pub mode: DriveMode,

    /// Step budget for one run-loop invocation.
    pub max_steps: u32,

    pub orchestrator: OrchestratorConfig,
    pub planner: PlannerConfig,
    pub backend: BackendConfig,
    pub retrieval: RetrievalConfig,
    pub verification: VerificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Revision plans allowed after critical verification failures. Zero disables revision.
    pub max_revisions: u32,
}

/// Which planner produces the task list.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlannerKind {
    /// Ask the model backend for a JSON plan.
    #[default]
    Model,
    /// Fixed retrieval, synthesis, filter, verification plan.
    Static,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct PlannerConfig {
    pub kind: PlannerKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BackendConfig {
    /// Model command; the prompt is written to its stdin (e.g. `["ollama","run","gemma:2b"]`).
    pub command: Vec<String>,

    /// Wall-clock budget per model call.
    pub timeout_secs: u64,

    /// Truncate model stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Maximum snippets returned per search.
    pub top_n: usize,

    /// JSON file of entries replacing the built-in knowledge base.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub knowledge_base: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VerificationConfig {
    /// Minimum verifier score (1.0 to 5.0) for a pass.
    pub pass_threshold: f64,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            mode: DriveMode::Plan,
            max_steps: 50,
            orchestrator: OrchestratorConfig::default(),
            planner: PlannerConfig::default(),
            backend: BackendConfig::default(),
            retrieval: RetrievalConfig::default(),
            verification: VerificationConfig::default(),
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self { max_revisions: 2 }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            command: vec![
                "ollama".to_string(),
                "run".to_string(),
                "gemma:2b".to_string(),
            ],
            timeout_secs: 300,
            output_limit_bytes: 100_000,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_n: 3,
            knowledge_base: None,
        }
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            pass_threshold: 4.0,
        }
    }
}

impl SentinelConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_steps == 0 {
            return Err(anyhow!("max_steps must be > 0"));
        }
        if self.backend.command.is_empty() || self.backend.command[0].trim().is_empty() {
            return Err(anyhow!("backend.command must be a non-empty array"));
        }
        if self.backend.timeout_secs == 0 {
            return Err(anyhow!("backend.timeout_secs must be > 0"));
        }
        if self.backend.output_limit_bytes == 0 {
            return Err(anyhow!("backend.output_limit_bytes must be > 0"));
        }
        if self.retrieval.top_n == 0 {
            return Err(anyhow!("retrieval.top_n must be > 0"));
        }
        let threshold = self.verification.pass_threshold;
        if !(1.0..=5.0).contains(&threshold) {
            return Err(anyhow!(
                "verification.pass_threshold must be within 1.0..=5.0, got {threshold}"
            ));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `SentinelConfig::default()`.
pub fn load_config(path: &Path) -> Result<SentinelConfig> {
    if !path.exists() {
        let cfg = SentinelConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: SentinelConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &SentinelConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, buf.as_bytes())
}

/// Write `contents` next to `path` and rename over it.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("path missing parent {}", path.display()))?;
    if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}
