//! Child processes with timeouts and bounded output.

use std::io::{self, Read, Write};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// Captured child process output.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Run `cmd`, feeding `stdin` if given, and wait at most `timeout`.
///
/// Stdin is written and stdout/stderr are drained on their own threads so a chatty
/// child cannot deadlock on a full pipe. At most `output_limit_bytes` per stream are
/// kept; the rest is drained and counted as truncated. A child still running at the
/// deadline is killed and reported with `timed_out = true`.
#[instrument(skip_all, fields(program = ?cmd.get_program(), timeout_secs = timeout.as_secs()))]
pub fn run_command_with_timeout(
    mut cmd: Command,
    stdin: Option<Vec<u8>>,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<CommandOutput> {
    cmd.stdin(if stdin.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    })
    .stdout(Stdio::piped())
    .stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|err| {
        error!(%err, "failed to spawn command");
        anyhow!(err).context("spawn command")
    })?;
    debug!(pid = child.id(), "child spawned");

    let writer = match (stdin, child.stdin.take()) {
        (Some(input), Some(mut pipe)) => Some(thread::spawn(move || pipe.write_all(&input))),
        (Some(_), None) => return Err(anyhow!("stdin was not piped")),
        (None, _) => None,
    };
    let stdout = Capture::start(child.stdout.take(), output_limit_bytes)?;
    let stderr = Capture::start(child.stderr.take(), output_limit_bytes)?;

    let (status, timed_out) = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => (status, false),
        None => {
            warn!(timeout_secs = timeout.as_secs(), "command timed out, killing");
            child.kill().context("kill command")?;
            (child.wait().context("wait command after kill")?, true)
        }
    };

    if let Some(writer) = writer {
        // A child that exits without reading all of stdin closes the pipe early.
        match writer.join() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => debug!(%err, "stdin writer stopped early"),
            Err(_) => return Err(anyhow!("stdin writer thread panicked")),
        }
    }

    let (stdout, stdout_truncated) = stdout.finish().context("collect stdout")?;
    let (stderr, stderr_truncated) = stderr.finish().context("collect stderr")?;
    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(CommandOutput {
        status,
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
        timed_out,
    })
}

/// One output pipe drained on a background thread.
struct Capture(thread::JoinHandle<io::Result<(Vec<u8>, usize)>>);

impl Capture {
    fn start<R: Read + Send + 'static>(pipe: Option<R>, limit: usize) -> Result<Self> {
        let mut pipe = pipe.ok_or_else(|| anyhow!("output was not piped"))?;
        Ok(Self(thread::spawn(move || {
            let mut kept = Vec::new();
            let limit = u64::try_from(limit).unwrap_or(u64::MAX);
            (&mut pipe).take(limit).read_to_end(&mut kept)?;
            let dropped = io::copy(&mut pipe, &mut io::sink())?;
            Ok((kept, usize::try_from(dropped).unwrap_or(usize::MAX)))
        })))
    }

    fn finish(self) -> Result<(Vec<u8>, usize)> {
        match self.0.join() {
            Ok(result) => result.context("read output"),
            Err(_) => Err(anyhow!("output reader thread panicked")),
        }
    }
}
