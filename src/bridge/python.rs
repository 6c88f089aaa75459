//! JSON-lines bridge to Python synthesis runners
//!
//! Each engine adapter drives a small embedded Python script that owns the
//! actual model. Requests go to the child's stdin one JSON object per line;
//! events come back the same way on stdout. The protocol is strictly
//! sequential, matching the one-stream-at-a-time synthesis contract, so no
//! request multiplexing is needed. The child's stderr is discarded: model
//! libraries print noisy progress output that must not reach the terminal.

use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::core::{Result, TtsError};

/// Default interpreter used to launch runner scripts.
pub const DEFAULT_PYTHON: &str = "python3";

/// Check whether `module` can be imported by `python`.
///
/// Returns `false` when the interpreter itself is missing, since a missing
/// interpreter means the module is unavailable either way. Never errors.
pub fn probe_python_module(python: &str, module: &str) -> bool {
    Command::new(python)
        .args(["-c", &format!("import {}", module)])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Handle to a running Python runner process.
///
/// The embedded script source is materialized to a temp file for the
/// lifetime of the runner and deleted again on drop, along with the child
/// process itself.
pub struct PythonRunner {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    script_path: PathBuf,
    name: String,
}

impl PythonRunner {
    /// Write `script_source` to a temp file and launch it with `python`.
    pub fn spawn(python: &str, name: &str, script_source: &str) -> Result<Self> {
        let script_path = std::env::temp_dir().join(format!(
            "{}-{}-{}.py",
            env!("CARGO_PKG_NAME"),
            name,
            uuid::Uuid::new_v4()
        ));
        std::fs::write(&script_path, script_source).map_err(|e| TtsError::Io {
            message: format!("Failed to write runner script: {}", e),
            path: Some(script_path.clone()),
        })?;

        debug!(runner = name, python, path = %script_path.display(), "spawning runner");

        let mut child = Command::new(python)
            .arg(&script_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                let _ = std::fs::remove_file(&script_path);
                TtsError::Io {
                    message: format!("Failed to launch '{}' with {}: {}", name, python, e),
                    path: None,
                }
            })?;

        let stdin = child.stdin.take().ok_or_else(|| TtsError::Internal {
            message: format!("Runner '{}' has no stdin pipe", name),
            location: None,
        })?;
        let stdout = child.stdout.take().ok_or_else(|| TtsError::Internal {
            message: format!("Runner '{}' has no stdout pipe", name),
            location: None,
        })?;

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            script_path,
            name: name.to_string(),
        })
    }

    /// Send one request line to the runner.
    pub fn send(&mut self, request: &impl Serialize) -> Result<()> {
        let mut line = serde_json::to_string(request).map_err(|e| TtsError::Internal {
            message: format!("Failed to encode runner request: {}", e),
            location: None,
        })?;
        line.push('\n');
        self.stdin
            .write_all(line.as_bytes())
            .and_then(|_| self.stdin.flush())
            .map_err(|e| self.pipe_error("write", e))?;
        Ok(())
    }

    /// Block until the runner emits the next event line and decode it.
    ///
    /// Blank lines are skipped. EOF means the child died mid-conversation.
    pub fn recv<T: DeserializeOwned>(&mut self) -> Result<T> {
        let mut line = String::new();
        loop {
            line.clear();
            let read = self
                .stdout
                .read_line(&mut line)
                .map_err(|e| self.pipe_error("read", e))?;
            if read == 0 {
                return Err(self.exit_error());
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            return serde_json::from_str(trimmed).map_err(|e| TtsError::Internal {
                message: format!(
                    "Runner '{}' sent an unreadable event: {} (line: {})",
                    self.name, e, trimmed
                ),
                location: None,
            });
        }
    }

    fn pipe_error(&self, op: &str, e: std::io::Error) -> TtsError {
        TtsError::Internal {
            message: format!("Runner '{}' pipe {} failed: {}", self.name, op, e),
            location: None,
        }
    }

    fn exit_error(&mut self) -> TtsError {
        let status = self
            .child
            .try_wait()
            .ok()
            .flatten()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "still running".to_string());
        TtsError::Internal {
            message: format!(
                "Runner '{}' closed its pipe unexpectedly (status: {})",
                self.name, status
            ),
            location: None,
        }
    }
}

impl Drop for PythonRunner {
    fn drop(&mut self) {
        // Polite shutdown first so the runner can free GPU memory.
        let _ = self.stdin.write_all(b"{\"op\":\"shutdown\"}\n");
        let _ = self.stdin.flush();
        if self.child.try_wait().ok().flatten().is_none() {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
        let _ = std::fs::remove_file(&self.script_path);
        debug!(runner = %self.name, "runner stopped");
    }
}
