//! Conversion worker
//!
//! Turns one job's document into audio (and optionally subtitles) on a
//! blocking thread. All user-visible progress goes through the job manager
//! so the WebSocket mirrors what the job record says.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info};

use crate::audio::{encode_with_ffmpeg, AudioOutput};
use crate::core::{Result, TtsError};
use crate::engine::{create_engine, describe_engine, EngineConfig};
use crate::server::server_core::ServerState;
use crate::server::types::{Job, JobStatus, OutputFile};
use crate::subtitles::{group_entries, write_subtitles, SubtitleFormat, TimingTracker};
use crate::text::join_wrapped_lines;

/// Run one job to completion, recording the outcome on the job record.
///
/// Never returns an error: failures are captured as job state so the client
/// sees them through the same channel as progress.
pub fn run_conversion(state: Arc<ServerState>, job_id: &str) {
    let Some(job) = state.jobs.get(job_id) else {
        error!(job = job_id, "conversion started for unknown job");
        return;
    };

    state.jobs.set_status(job_id, JobStatus::Processing);
    state
        .jobs
        .add_log(job_id, &format!("Starting conversion with engine '{}'", job.config.engine), "info");

    match convert(&state, job_id, &job) {
        Ok(files) => {
            state.jobs.add_log(job_id, "Conversion complete", "success");
            state.jobs.complete(job_id, files);
            info!(job = job_id, "conversion finished");
        }
        Err(e) => {
            error!(job = job_id, error = %e, "conversion failed");
            state.jobs.fail(job_id, &e.to_string());
        }
    }
}

fn convert(state: &ServerState, job_id: &str, job: &Job) -> Result<Vec<OutputFile>> {
    let config = &job.config;
    let text = read_document(&job.file_path)?;
    let text = if config.replace_single_newlines {
        join_wrapped_lines(&text)
    } else {
        text
    };
    state.jobs.add_log(
        job_id,
        &format!("Loaded {} characters from {}", text.chars().count(), job.file_path),
        "info",
    );

    let info = describe_engine(&config.engine)?;
    let mut builder = EngineConfig::builder()
        .lang_code(&config.lang_code)
        .device(config.device());
    if let Some(reference_audio) = &config.reference_audio {
        builder = builder.set("reference_audio", reference_audio);
    }
    if let Some(reference_text) = &config.reference_text {
        builder = builder.set("reference_text", reference_text);
    }
    let engine_config = builder.build();

    let mut engine = create_engine(&config.engine, &config.lang_code, config.device(), &engine_config)?;

    let voice = select_voice(config, info.requires_reference, engine.supports_voice_mixing())?;
    state
        .jobs
        .add_log(job_id, &format!("Synthesizing with voice '{}'", voice), "info");

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_rate = engine.sample_rate();
    let mut tracker = TimingTracker::new();
    {
        let stream = engine.synthesize(&text, &voice, config.speed, None)?;
        for (i, chunk) in stream.enumerate() {
            let chunk = chunk?;
            sample_rate = chunk.sample_rate;
            samples.extend_from_slice(&chunk.audio);
            tracker.record(&chunk);
            state
                .jobs
                .update_progress(job_id, (90.0_f32).min((i + 1) as f32 * 10.0));
        }
    }

    if samples.is_empty() {
        return Err(TtsError::Internal {
            message: "synthesis produced no audio".to_string(),
            location: None,
        });
    }
    state.jobs.add_log(
        job_id,
        &format!(
            "Synthesized {:.1}s of audio at {} Hz",
            crate::audio::duration_secs(samples.len(), sample_rate),
            sample_rate
        ),
        "info",
    );

    let folder = PathBuf::from(&job.output_folder);
    let stem = Path::new(&job.file_path)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "audio".to_string());

    let audio_path = write_audio(&folder, &stem, &samples, sample_rate, &config.output_format)?;
    state.jobs.update_progress(job_id, 95.0);
    state.jobs.add_log(
        job_id,
        &format!("Wrote audio to {}", audio_path.display()),
        "info",
    );

    let mut files = vec![output_file(&audio_path, "audio")?];

    if config.generate_subtitles {
        let format =
            SubtitleFormat::from_name(&config.subtitle_format).ok_or_else(|| TtsError::Config {
                message: format!("Unknown subtitle format '{}'", config.subtitle_format),
                path: None,
            })?;
        let entries = group_entries(&tracker.into_entries(), config.max_subtitle_words);
        let subtitle_path = folder.join(format!("{}.{}", stem, format.extension()));
        write_subtitles(&subtitle_path, format, &entries)?;
        state.jobs.add_log(
            job_id,
            &format!("Wrote {} captions to {}", entries.len(), subtitle_path.display()),
            "info",
        );
        files.push(output_file(&subtitle_path, "subtitle")?);
    }

    Ok(files)
}

/// Read a source document, accepting only plain-text inputs.
fn read_document(path: &str) -> Result<String> {
    let ext = Path::new(path)
        .extension()
        .map(|e| e.to_ascii_lowercase().to_string_lossy().to_string())
        .unwrap_or_default();
    if ext != "txt" && ext != "md" {
        return Err(TtsError::Config {
            message: format!("Unsupported input type '.{}'; expected .txt or .md", ext),
            path: Some(PathBuf::from(path)),
        });
    }
    std::fs::read_to_string(path).map_err(|e| TtsError::Io {
        message: format!("Failed to read input file: {}", e),
        path: Some(PathBuf::from(path)),
    })
}

/// Pick the voice selector handed to `synthesize`.
///
/// A voice formula wins when the engine can mix; cloning engines take the
/// reference audio path; everything else uses the plain catalog voice.
fn select_voice(
    config: &crate::server::types::ConversionConfig,
    requires_reference: bool,
    supports_mixing: bool,
) -> Result<String> {
    if let Some(formula) = &config.voice_formula {
        if supports_mixing && !formula.trim().is_empty() {
            return Ok(formula.clone());
        }
    }
    if requires_reference {
        return config.reference_audio.clone().ok_or_else(|| {
            TtsError::invalid_voice(
                &config.engine,
                "engine requires reference audio but none was provided",
            )
        });
    }
    Ok(config.voice.clone())
}

/// Write the final audio artifact, delegating to ffmpeg for non-WAV formats.
fn write_audio(
    folder: &Path,
    stem: &str,
    samples: &[f32],
    sample_rate: u32,
    output_format: &str,
) -> Result<PathBuf> {
    let format = output_format.to_ascii_lowercase();
    let wav_path = folder.join(format!("{}.wav", stem));
    AudioOutput::save(samples, sample_rate, &wav_path)?;
    if format == "wav" {
        return Ok(wav_path);
    }

    let encoded_path = folder.join(format!("{}.{}", stem, format));
    encode_with_ffmpeg(&wav_path, &encoded_path)?;
    let _ = std::fs::remove_file(&wav_path);
    Ok(encoded_path)
}

fn output_file(path: &Path, file_type: &str) -> Result<OutputFile> {
    let size = std::fs::metadata(path)
        .map_err(|e| TtsError::Io {
            message: format!("Failed to stat output file: {}", e),
            path: Some(path.to_path_buf()),
        })?
        .len();
    Ok(OutputFile {
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
        path: path.to_string_lossy().to_string(),
        size,
        file_type: file_type.to_string(),
    })
}
