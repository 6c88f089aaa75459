//! Server Types
//!
//! Request, response, and job record types shared across route handlers.

use serde::{Deserialize, Serialize};

use crate::engine::EngineInfo;

/// Per-job conversion settings, supplied with the convert request.
///
/// One struct covers every engine; adapters ignore the fields that do not
/// apply to them, mirroring the engine configuration contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Engine registry name
    #[serde(default = "default_engine")]
    pub engine: String,

    /// Voice selector: catalog name or reference audio path
    #[serde(default = "default_voice")]
    pub voice: String,

    /// Playback-rate multiplier
    #[serde(default = "default_speed")]
    pub speed: f32,

    /// Weighted voice formula; wins over `voice` when the engine mixes
    #[serde(default)]
    pub voice_formula: Option<String>,

    /// Reference audio path for cloning engines
    #[serde(default)]
    pub reference_audio: Option<String>,

    /// Transcript of the reference audio
    #[serde(default)]
    pub reference_text: Option<String>,

    /// Language code passed to the engine
    #[serde(default = "default_lang_code")]
    pub lang_code: String,

    /// Whether to emit a subtitle file alongside the audio
    #[serde(default)]
    pub generate_subtitles: bool,

    /// Subtitle format: `srt`, `vtt`, or `ass`
    #[serde(default = "default_subtitle_format")]
    pub subtitle_format: String,

    /// Maximum words per subtitle caption
    #[serde(default = "default_max_subtitle_words")]
    pub max_subtitle_words: usize,

    /// Output audio format: `wav`, or any ffmpeg-encodable extension
    #[serde(default = "default_output_format")]
    pub output_format: String,

    /// Join hard-wrapped lines before synthesis
    #[serde(default)]
    pub replace_single_newlines: bool,

    /// Run the engine on the GPU (`cuda`) instead of the CPU
    #[serde(default)]
    pub use_gpu: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            voice: default_voice(),
            speed: default_speed(),
            voice_formula: None,
            reference_audio: None,
            reference_text: None,
            lang_code: default_lang_code(),
            generate_subtitles: false,
            subtitle_format: default_subtitle_format(),
            max_subtitle_words: default_max_subtitle_words(),
            output_format: default_output_format(),
            replace_single_newlines: false,
            use_gpu: false,
        }
    }
}

impl ConversionConfig {
    /// Device selector implied by the GPU flag.
    pub fn device(&self) -> &'static str {
        if self.use_gpu {
            "cuda"
        } else {
            "cpu"
        }
    }
}

/// Job lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// One timestamped job log line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// ISO-8601 timestamp
    pub timestamp: String,
    /// `info`, `debug`, `error`, or `success`
    pub level: String,
    pub message: String,
}

/// One produced artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputFile {
    pub name: String,
    pub path: String,
    pub size: u64,
    /// `audio`, `subtitle`, or `other`
    #[serde(rename = "type")]
    pub file_type: String,
}

/// Full job record, returned by the job endpoints and the WS init frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    /// Source document path
    pub file_path: String,
    pub config: ConversionConfig,
    /// 0-100
    pub progress: f32,
    pub logs: Vec<LogEntry>,
    pub created_at: String,
    pub output_folder: String,
    pub output_files: Vec<OutputFile>,
    pub error: Option<String>,
}

/// Frame pushed to a job's WebSocket
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum WsFrame {
    /// Full job record, sent once on connect
    Init(Job),
    Log(LogEntry),
    Progress { progress: f32 },
    Status { status: JobStatus },
    /// Keep-alive reply to client messages
    Pong,
}

// ---- Responses ----

/// Health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Uptime in seconds
    pub uptime: u64,
    /// Whether a conversion is currently running
    pub active_job: bool,
}

/// Engine listing response
#[derive(Debug, Clone, Serialize)]
pub struct EnginesResponse {
    pub engines: Vec<EngineInfo>,
}

/// One catalog voice
#[derive(Debug, Clone, Serialize)]
pub struct VoiceInfo {
    pub id: String,
    pub name: String,
    pub language: Option<String>,
}

/// Voice listing response
#[derive(Debug, Clone, Serialize)]
pub struct VoicesResponse {
    pub voices: Vec<VoiceInfo>,
    /// Engine takes reference audio instead of catalog voices
    #[serde(default)]
    pub requires_reference: bool,
}

/// Saved voice profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceProfile {
    pub name: String,
    pub formula: String,
}

/// Voice profile listing response
#[derive(Debug, Clone, Serialize)]
pub struct ProfilesResponse {
    pub profiles: Vec<VoiceProfile>,
}

/// Uploaded file description
#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    pub path: String,
    pub filename: String,
    pub size: u64,
    /// `text`, `audio`, or `unknown`
    #[serde(rename = "type")]
    pub file_type: String,
    /// First 500 characters, for text files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub char_count: Option<usize>,
}

/// Convert request body
#[derive(Debug, Clone, Deserialize)]
pub struct ConvertRequest {
    pub file_path: String,
    #[serde(default)]
    pub config: ConversionConfig,
}

/// Convert response
#[derive(Debug, Clone, Serialize)]
pub struct JobStartedResponse {
    pub job_id: String,
    pub status: String,
}

/// Artifact listing response
#[derive(Debug, Clone, Serialize)]
pub struct JobFilesResponse {
    pub folder: String,
    pub files: Vec<OutputFile>,
}

/// Error body returned by failing handlers
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn default_engine() -> String {
    "kokoro".to_string()
}

fn default_voice() -> String {
    "af_heart".to_string()
}

fn default_speed() -> f32 {
    1.0
}

fn default_lang_code() -> String {
    "en-us".to_string()
}

fn default_subtitle_format() -> String {
    "srt".to_string()
}

fn default_max_subtitle_words() -> usize {
    10
}

fn default_output_format() -> String {
    "wav".to_string()
}
