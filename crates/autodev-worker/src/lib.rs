//! Claude Code CLI worker adapter.
//!
//! The coder agent delegates every code mutation to the external `claude`
//! binary. This crate is the only place that touches that process: it spawns
//! the CLI with a fixed argument pattern, captures bounded output, enforces a
//! wall-clock timeout (killing the whole process group on expiry), and
//! classifies the free-form output into success or failure.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use autodev_types::{AutodevError, Result};

pub mod classify;

pub use classify::{classify_output, Classification, ValidationMode};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Name or path of the CLI binary.
    pub binary: String,
    /// Value passed to `--permission-mode`.
    pub permission_mode: String,
    /// Wall-clock limit for one invocation.
    pub timeout: Duration,
    pub validation_mode: ValidationMode,
    /// Captured stdout/stderr are truncated beyond this many bytes each.
    pub max_output_bytes: usize,
    /// Completion markers scanned in strict mode.
    pub success_markers: Vec<String>,
    /// Failure markers scanned in lenient mode.
    pub failure_markers: Vec<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            binary: "claude".to_string(),
            permission_mode: "acceptEdits".to_string(),
            timeout: Duration::from_secs(300),
            validation_mode: ValidationMode::Lenient,
            max_output_bytes: 1024 * 1024,
            success_markers: classify::SUCCESS_MARKERS.iter().map(|s| s.to_string()).collect(),
            failure_markers: classify::FAILURE_MARKERS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Request / outcome records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct WorkerRequest {
    pub prompt: String,
    /// Process working directory.
    pub work_dir: PathBuf,
    /// Directory passed via `--add-dir`; typically equals `work_dir`.
    pub add_dir: PathBuf,
}

impl WorkerRequest {
    pub fn new(prompt: impl Into<String>, work_dir: impl Into<PathBuf>) -> Self {
        let work_dir = work_dir.into();
        Self {
            prompt: prompt.into(),
            add_dir: work_dir.clone(),
            work_dir,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerOutcome {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    /// Seconds spent in the child process.
    pub elapsed: f64,
    /// Classification reason; set on every failure and on marker-based success.
    pub reason: Option<String>,
}

// ---------------------------------------------------------------------------
// CodeWorker — the seam the coder agent depends on
// ---------------------------------------------------------------------------

#[async_trait]
pub trait CodeWorker: Send + Sync {
    async fn run(&self, request: &WorkerRequest) -> Result<WorkerOutcome>;
}

// ---------------------------------------------------------------------------
// ClaudeCliWorker
// ---------------------------------------------------------------------------

pub struct ClaudeCliWorker {
    config: WorkerConfig,
}

impl ClaudeCliWorker {
    pub fn new(config: WorkerConfig) -> Self {
        Self { config }
    }

    fn build_command(&self, request: &WorkerRequest) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.config.binary);
        cmd.arg("--add-dir")
            .arg(&request.add_dir)
            .arg("--permission-mode")
            .arg(&self.config.permission_mode)
            .arg("-p")
            .arg(&request.prompt);
        cmd.current_dir(&request.work_dir);
        cmd.stdin(std::process::Stdio::null());
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());
        #[cfg(unix)]
        {
            cmd.process_group(0);
        }
        cmd
    }
}

#[async_trait]
impl CodeWorker for ClaudeCliWorker {
    async fn run(&self, request: &WorkerRequest) -> Result<WorkerOutcome> {
        let mut cmd = self.build_command(request);

        tracing::info!(
            binary = %self.config.binary,
            work_dir = %request.work_dir.display(),
            timeout_secs = self.config.timeout.as_secs(),
            mode = %self.config.validation_mode,
            "Invoking coding CLI"
        );

        let start = tokio::time::Instant::now();
        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AutodevError::Worker(format!("CLI binary '{}' not found", self.config.binary))
            } else {
                AutodevError::Worker(format!("Failed to spawn '{}': {e}", self.config.binary))
            }
        })?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| AutodevError::Worker("stdout was not piped".into()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| AutodevError::Worker("stderr was not piped".into()))?;

        let cap = self.config.max_output_bytes;
        let stdout_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            use tokio::io::AsyncReadExt;
            let _ = stdout.read_to_end(&mut buf).await;
            buf
        });
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            use tokio::io::AsyncReadExt;
            let _ = stderr.read_to_end(&mut buf).await;
            buf
        });

        let (timed_out, status) = tokio::select! {
            status = child.wait() => {
                (false, Some(status.map_err(|e| AutodevError::Worker(e.to_string()))?))
            }
            _ = tokio::time::sleep(self.config.timeout) => {
                terminate_group(&mut child).await;
                (true, None)
            }
        };

        let stdout_buf = stdout_task
            .await
            .map_err(|e| AutodevError::Worker(format!("stdout reader failed: {e}")))?;
        let stderr_buf = stderr_task
            .await
            .map_err(|e| AutodevError::Worker(format!("stderr reader failed: {e}")))?;

        let elapsed = start.elapsed().as_secs_f64();
        let stdout = truncate_utf8(&stdout_buf, cap);
        let stderr = truncate_utf8(&stderr_buf, cap);
        let exit_code = status.and_then(|s| s.code()).unwrap_or(-1);

        let classification = classify::classify_with_markers(
            exit_code,
            timed_out,
            &stdout,
            self.config.validation_mode,
            &self.config.success_markers,
            &self.config.failure_markers,
        );

        tracing::info!(
            exit_code,
            timed_out,
            success = classification.success,
            reason = classification.reason.as_deref().unwrap_or("-"),
            elapsed_secs = format!("{elapsed:.1}"),
            "Coding CLI finished"
        );

        Ok(WorkerOutcome {
            success: classification.success,
            stdout,
            stderr,
            exit_code,
            elapsed,
            reason: classification.reason,
        })
    }
}

/// Kill the child and its descendants: SIGTERM the process group, give it a
/// grace period, then SIGKILL.
async fn terminate_group(child: &mut tokio::process::Child) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            unsafe {
                libc::kill(-(pid as i32), libc::SIGTERM);
            }
        }
        tokio::select! {
            _ = child.wait() => {}
            _ = tokio::time::sleep(Duration::from_secs(2)) => {
                let _ = child.kill().await;
                let _ = child.wait().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = child.kill().await;
        let _ = child.wait().await;
    }
}

/// Lossy-decode at most `cap` bytes, cutting at a char boundary.
fn truncate_utf8(bytes: &[u8], cap: usize) -> String {
    let text = String::from_utf8_lossy(bytes);
    if text.len() <= cap {
        return text.into_owned();
    }
    let cut = text
        .char_indices()
        .map(|(i, _)| i)
        .take_while(|&i| i <= cap)
        .last()
        .unwrap_or(0);
    format!("{}...(truncated)", &text[..cut])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
