//! Language-model backends.

use std::process::Command;
use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use tracing::{debug, instrument};

use crate::io::config::BackendConfig;
use crate::io::process::run_command_with_timeout;

/// One prompt sent to a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    /// Caller label for diagnostics (`planner`, `synthesis`, `verification`).
    pub label: String,
    pub prompt: String,
}

impl CompletionRequest {
    pub fn new(label: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            prompt: prompt.into(),
        }
    }
}

/// Blocking text completion with an implementation-defined timeout.
pub trait ModelBackend {
    fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// Spawns a local model CLI per request, prompt on stdin, answer on stdout.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    output_limit_bytes: usize,
}

impl CommandBackend {
    pub fn new(argv: &[String], timeout: Duration, output_limit_bytes: usize) -> Result<Self> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| anyhow!("backend command is empty"))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            timeout,
            output_limit_bytes,
        })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        Self::new(
            &config.command,
            Duration::from_secs(config.timeout_secs),
            config.output_limit_bytes,
        )
    }
}

impl ModelBackend for CommandBackend {
    #[instrument(skip_all, fields(label = %request.label, program = %self.program))]
    fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        let output = run_command_with_timeout(
            cmd,
            Some(request.prompt.clone().into_bytes()),
            self.timeout,
            self.output_limit_bytes,
        )?;

        if output.timed_out {
            bail!(
                "{} timed out after {}s",
                self.program,
                self.timeout.as_secs()
            );
        }
        if !output.status.success() {
            bail!(
                "{} exited with {:?}: {}",
                self.program,
                output.status.code(),
                output.stderr_lossy().trim()
            );
        }

        let answer = output.stdout_lossy().trim().to_string();
        debug!(bytes = answer.len(), "model answered");
        Ok(answer)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|part| part.to_string()).collect()
    }

    #[test]
    fn command_backend_returns_trimmed_stdout() {
        let backend =
            CommandBackend::new(&argv(&["cat"]), Duration::from_secs(5), 4096).expect("backend");
        let answer = backend
            .complete(&CompletionRequest::new("test", "  draft text \n"))
            .expect("complete");
        assert_eq!(answer, "draft text");
    }

    #[test]
    fn non_zero_exit_is_an_error() {
        let backend =
            CommandBackend::new(&argv(&["false"]), Duration::from_secs(5), 4096).expect("backend");
        let err = backend
            .complete(&CompletionRequest::new("test", "prompt"))
            .expect_err("false fails");
        assert!(err.to_string().contains("exited with"));
    }

    #[test]
    fn timeout_is_an_error() {
        let backend = CommandBackend::new(&argv(&["sleep", "5"]), Duration::from_millis(100), 64)
            .expect("backend");
        let err = backend
            .complete(&CompletionRequest::new("test", ""))
            .expect_err("times out");
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn empty_command_is_rejected() {
        assert!(CommandBackend::new(&[], Duration::from_secs(1), 1).is_err());
    }
}
