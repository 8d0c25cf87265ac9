//! Tool execution: spawning external commands and streaming their output.
//!
//! All external tools (make, git am, ...) go through the [`ToolRunner`] trait
//! so the phase sequencing can run against a recording mock in tests.
//! [`SystemRunner`] is the production implementation:
//! - stdout/stderr are read concurrently and every line is logged
//! - compilation progress is tracked by counting CC/LD/AR lines
//! - interactive tools (menuconfig) inherit the terminal

use crate::error::BuildError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Split};
use tokio::process::Command;

static COMPILE_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s+(CC|LD|AR|AS)(\s+\[M\])?\s+\S").expect("Invalid compile line regex")
});

/// One external command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
    /// Inherit the terminal instead of capturing output
    pub interactive: bool,
}

impl Invocation {
    pub fn new(program: impl Into<String>, cwd: &Path) -> Self {
        Invocation {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.to_path_buf(),
            env: Vec::new(),
            interactive: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn interactive(mut self) -> Self {
        self.interactive = true;
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// How a tool exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolOutcome {
    pub success: bool,
    /// `None` when terminated by a signal
    pub code: Option<i32>,
}

impl ToolOutcome {
    pub fn success() -> Self {
        ToolOutcome { success: true, code: Some(0) }
    }

    pub fn failure(code: i32) -> Self {
        ToolOutcome { success: false, code: Some(code) }
    }

    pub fn describe(&self) -> String {
        match self.code {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Runs external tools.
#[allow(async_fn_in_trait)]
pub trait ToolRunner {
    /// Run to completion. `Err` only when the tool could not be started.
    async fn run(&self, invocation: &Invocation) -> Result<ToolOutcome, BuildError>;

    /// Run and turn a non-zero exit into [`BuildError::CommandFailed`].
    async fn run_checked(&self, invocation: &Invocation) -> Result<(), BuildError> {
        let outcome = self.run(invocation).await?;
        if outcome.success {
            Ok(())
        } else {
            Err(BuildError::CommandFailed {
                cmd: invocation.to_string(),
                reason: outcome.describe(),
            })
        }
    }
}

/// Milestones worth surfacing from make/rpmbuild output.
fn parse_milestone(line: &str) -> Option<String> {
    let line = line.trim();
    if line.starts_with("Kernel: ") && line.contains(" is ready") {
        return Some(line.to_string());
    }
    if let Some(rpm) = line.strip_prefix("Wrote: ") {
        if rpm.ends_with(".rpm") {
            return Some(format!("Packaged {}", rpm));
        }
    }
    if line.starts_with("# configuration written to") {
        return Some(line.trim_start_matches("# ").to_string());
    }
    None
}

fn is_compile_line(line: &str) -> bool {
    COMPILE_LINE_REGEX.is_match(line)
}

/// Counts CC/LD/AR/AS lines; reports every 100th.
#[derive(Debug, Default)]
struct CompileProgress {
    compiled: usize,
}

impl CompileProgress {
    const REPORT_EVERY: usize = 100;

    /// Returns the running count when `line` completes another batch.
    fn record(&mut self, line: &str) -> Option<usize> {
        if !is_compile_line(line) {
            return None;
        }
        self.compiled += 1;
        (self.compiled % Self::REPORT_EVERY == 0).then_some(self.compiled)
    }

    fn count(&self) -> usize {
        self.compiled
    }
}

/// Lossy UTF-8 decode of one output line without its `\r`.
fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

async fn next_segment<R>(reader: &mut Option<Split<R>>) -> io::Result<Option<Vec<u8>>>
where
    R: AsyncBufRead + Unpin,
{
    match reader {
        Some(split) => split.next_segment().await,
        None => Ok(None),
    }
}

/// Production runner backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    async fn run_interactive(&self, invocation: &Invocation) -> Result<ToolOutcome, BuildError> {
        let status = build_command(invocation)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| spawn_error(invocation, e))?;
        Ok(ToolOutcome {
            success: status.success(),
            code: status.code(),
        })
    }

    async fn run_captured(&self, invocation: &Invocation) -> Result<ToolOutcome, BuildError> {
        let mut child = build_command(invocation)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(invocation, e))?;

        let stdout = child.stdout.take().ok_or_else(|| BuildError::CommandFailed {
            cmd: invocation.to_string(),
            reason: "Failed to capture stdout".to_string(),
        })?;
        let stderr = child.stderr.take().ok_or_else(|| BuildError::CommandFailed {
            cmd: invocation.to_string(),
            reason: "Failed to capture stderr".to_string(),
        })?;

        // Lines are raw byte segments, decoded lossily. A reader is dropped only
        // at EOF or on a hard error, which closes its pipe.
        let mut stdout_lines = Some(BufReader::new(stdout).split(b'\n'));
        let mut stderr_lines = Some(BufReader::new(stderr).split(b'\n'));
        let mut progress = CompileProgress::default();

        while stdout_lines.is_some() || stderr_lines.is_some() {
            tokio::select! {
                segment = next_segment(&mut stdout_lines), if stdout_lines.is_some() => match segment {
                    Ok(Some(bytes)) => {
                        let line = decode_line(&bytes);
                        if let Some(count) = progress.record(&line) {
                            crate::log_parsed!("Compiling: processed {} files...", count);
                        }
                        log::info!(target: "tool", "{}", line);
                        if let Some(milestone) = parse_milestone(&line) {
                            crate::log_parsed!("{}", milestone);
                        }
                    }
                    Ok(None) => stdout_lines = None,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                    Err(e) => {
                        log::warn!("stdout read error: {}", e);
                        stdout_lines = None;
                    }
                },
                segment = next_segment(&mut stderr_lines), if stderr_lines.is_some() => match segment {
                    Ok(Some(bytes)) => {
                        let line = decode_line(&bytes);
                        log::info!(target: "tool", "[stderr] {}", line);
                        if let Some(milestone) = parse_milestone(&line) {
                            crate::log_parsed!("{}", milestone);
                        }
                    }
                    Ok(None) => stderr_lines = None,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                    Err(e) => {
                        log::warn!("stderr read error: {}", e);
                        stderr_lines = None;
                    }
                },
            }
        }

        let status = child.wait().await.map_err(|e| BuildError::CommandFailed {
            cmd: invocation.to_string(),
            reason: format!("Failed to wait for process: {}", e),
        })?;
        if progress.count() > 0 {
            log::debug!("{} compilation units processed", progress.count());
        }
        Ok(ToolOutcome {
            success: status.success(),
            code: status.code(),
        })
    }
}

impl ToolRunner for SystemRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ToolOutcome, BuildError> {
        log::info!("$ {}", invocation);
        log::debug!("  (in {})", invocation.cwd.display());
        let outcome = if invocation.interactive {
            self.run_interactive(invocation).await?
        } else {
            self.run_captured(invocation).await?
        };
        if !outcome.success {
            log::error!("{} failed with {}", invocation.program, outcome.describe());
        }
        Ok(outcome)
    }
}

fn build_command(invocation: &Invocation) -> Command {
    let mut command = Command::new(&invocation.program);
    command.args(&invocation.args).current_dir(&invocation.cwd);
    for (key, value) in &invocation.env {
        command.env(key, value);
    }
    command
}

fn spawn_error(invocation: &Invocation, e: std::io::Error) -> BuildError {
    BuildError::CommandFailed {
        cmd: invocation.to_string(),
        reason: format!("Failed to spawn in {}: {}", invocation.cwd.display(), e),
    }
}
