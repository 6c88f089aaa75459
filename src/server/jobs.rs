//! Job bookkeeping
//!
//! `JobManager` owns the job table and the per-job WebSocket senders. All
//! mutation goes through it so every update lands both in the record and,
//! best-effort, on a connected socket. The methods are synchronous on
//! purpose: the conversion worker runs on a blocking thread and pushes
//! frames through unbounded channels without touching the async runtime.

use std::path::{Path, PathBuf};

use chrono::Local;
use dashmap::DashMap;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;
use uuid::Uuid;

use crate::server::types::{ConversionConfig, Job, JobStatus, LogEntry, OutputFile, WsFrame};

/// Job table plus WebSocket fan-out.
pub struct JobManager {
    jobs: DashMap<String, Job>,
    sockets: DashMap<String, UnboundedSender<WsFrame>>,
    output_dir: PathBuf,
}

impl JobManager {
    /// Create a manager writing artifacts under `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            jobs: DashMap::new(),
            sockets: DashMap::new(),
            output_dir: output_dir.into(),
        }
    }

    /// Create a pending job for `file_path` and return its id.
    ///
    /// The job's output folder is derived from the input filename,
    /// sanitized to filesystem-safe characters, and created eagerly.
    pub fn create_job(&self, file_path: &str, config: ConversionConfig) -> std::io::Result<String> {
        let id = Uuid::new_v4().to_string();
        let output_folder = self.output_folder_for(file_path);
        std::fs::create_dir_all(&output_folder)?;

        let job = Job {
            id: id.clone(),
            status: JobStatus::Pending,
            file_path: file_path.to_string(),
            config,
            progress: 0.0,
            logs: Vec::new(),
            created_at: Local::now().to_rfc3339(),
            output_folder: output_folder.to_string_lossy().to_string(),
            output_files: Vec::new(),
            error: None,
        };
        self.jobs.insert(id.clone(), job);
        Ok(id)
    }

    /// Snapshot of a job record.
    pub fn get(&self, id: &str) -> Option<Job> {
        self.jobs.get(id).map(|job| job.value().clone())
    }

    /// Whether any job is currently processing.
    pub fn has_active_job(&self) -> bool {
        self.jobs
            .iter()
            .any(|job| job.status == JobStatus::Processing)
    }

    /// Set a job's status and notify its socket.
    pub fn set_status(&self, id: &str, status: JobStatus) {
        if let Some(mut job) = self.jobs.get_mut(id) {
            job.status = status;
        }
        self.push(id, WsFrame::Status { status });
    }

    /// Record a failure: status, error text, and an error log line.
    pub fn fail(&self, id: &str, error: &str) {
        if let Some(mut job) = self.jobs.get_mut(id) {
            job.error = Some(error.to_string());
        }
        self.add_log(id, error, "error");
        self.set_status(id, JobStatus::Failed);
    }

    /// Record the produced artifacts and mark the job completed.
    pub fn complete(&self, id: &str, output_files: Vec<OutputFile>) {
        if let Some(mut job) = self.jobs.get_mut(id) {
            job.output_files = output_files;
        }
        self.update_progress(id, 100.0);
        self.set_status(id, JobStatus::Completed);
    }

    /// Append a log line and push it to the job's socket, best-effort.
    pub fn add_log(&self, id: &str, message: &str, level: &str) {
        let entry = LogEntry {
            timestamp: Local::now().to_rfc3339(),
            level: level.to_string(),
            message: message.to_string(),
        };
        if let Some(mut job) = self.jobs.get_mut(id) {
            job.logs.push(entry.clone());
        }
        self.push(id, WsFrame::Log(entry));
    }

    /// Set a job's progress (0-100) and push it to the socket.
    pub fn update_progress(&self, id: &str, progress: f32) {
        let progress = progress.clamp(0.0, 100.0);
        if let Some(mut job) = self.jobs.get_mut(id) {
            job.progress = progress;
        }
        self.push(id, WsFrame::Progress { progress });
    }

    /// Attach a WebSocket sender for a job, replacing any previous one.
    pub fn attach_socket(&self, id: &str, sender: UnboundedSender<WsFrame>) {
        self.sockets.insert(id.to_string(), sender);
    }

    /// Detach a job's WebSocket sender.
    pub fn detach_socket(&self, id: &str) {
        self.sockets.remove(id);
    }

    fn push(&self, id: &str, frame: WsFrame) {
        if let Some(sender) = self.sockets.get(id) {
            if sender.send(frame).is_err() {
                debug!(job = id, "socket closed, dropping frame");
            }
        }
    }

    fn output_folder_for(&self, file_path: &str) -> PathBuf {
        let stem = Path::new(file_path)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let sanitized: String = stem
            .chars()
            .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
            .collect();
        let name = if sanitized.trim().is_empty() {
            "output".to_string()
        } else {
            sanitized
        };
        self.output_dir.join(name)
    }
}
