//! F5-TTS engine adapter
//!
//! Wraps the F5-TTS voice-cloning model behind the [`TtsBackend`] contract.
//!
//! ## Capabilities
//! - Clones the voice of a caller-supplied reference audio sample
//! - No bundled voice catalog and no voice blending
//! - Chunks text itself (the model ingests one chunk per inference call)
//!
//! The adapter talks to the model through the [`ClonePipeline`] seam. In
//! production that seam is a Python runner process; tests inject a scripted
//! pipeline instead.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::audio::flatten_to_mono;
use crate::bridge::{probe_python_module, PythonRunner, DEFAULT_PYTHON};
use crate::core::{Result, TtsError};
use crate::engine::config::EngineConfig;
use crate::engine::registry::{EngineEntry, EngineRegistry};
use crate::engine::traits::{SynthesisResult, SynthesisStream, TtsBackend};
use crate::text::chunk_text;

const ENGINE_NAME: &str = "f5_tts";
const RUNNER_SOURCE: &str = include_str!("../../runners/f5_runner.py");
const INSTALL_HINT: &str = "pip install f5-tts\n  Or from source: git clone https://github.com/SWivid/F5-TTS.git && cd F5-TTS && pip install -e .";

const REFERENCE_GUIDANCE: &str = "this engine clones a reference voice. Provide either:\n  1. the 'voice' argument as a path to a reference audio file, or\n  2. 'reference_audio' in the engine configuration\n\nReference audio should be a clear 5-10 second WAV sample without background noise";

/// Resolved reference voice: an audio sample and its transcript.
///
/// An empty transcript asks the model to transcribe the sample itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub audio_path: PathBuf,
    pub transcript: String,
}

/// Inference parameters, fixed for the lifetime of an engine instance.
#[derive(Debug, Clone, PartialEq)]
pub struct CloneParams {
    pub target_rms: f32,
    pub cross_fade_duration: f32,
    pub nfe_step: u32,
    pub cfg_strength: f32,
    pub sway_sampling_coef: f32,
    pub fix_duration: Option<f32>,
}

impl Default for CloneParams {
    fn default() -> Self {
        Self {
            target_rms: 0.1,
            cross_fade_duration: 0.15,
            nfe_step: 32,
            cfg_strength: 2.0,
            sway_sampling_coef: -1.0,
            fix_duration: None,
        }
    }
}

impl CloneParams {
    /// Read parameter overrides out of an engine configuration.
    pub fn from_config(config: &EngineConfig) -> Self {
        let defaults = Self::default();
        Self {
            target_rms: config.get_f32("target_rms", defaults.target_rms),
            cross_fade_duration: config
                .get_f32("cross_fade_duration", defaults.cross_fade_duration),
            nfe_step: config.get_u32("nfe_step", defaults.nfe_step),
            cfg_strength: config.get_f32("cfg_strength", defaults.cfg_strength),
            sway_sampling_coef: config.get_f32("sway_sampling_coef", defaults.sway_sampling_coef),
            fix_duration: config.parse_f32("fix_duration"),
        }
    }
}

/// Raw model output for one chunk, possibly multi-channel.
#[derive(Debug, Clone, PartialEq)]
pub struct CloneOutput {
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
}

/// Seam between the adapter and the cloning model.
pub trait ClonePipeline: Send {
    /// Output rate of the loaded model, in Hz.
    fn sample_rate(&self) -> u32;

    /// Synthesize one text chunk in the reference voice.
    fn infer(
        &mut self,
        text: &str,
        reference: &Reference,
        params: &CloneParams,
        speed: f32,
    ) -> Result<CloneOutput>;
}

/// F5-TTS engine adapter
pub struct F5TtsEngine {
    device: String,
    params: CloneParams,
    default_reference: Option<Reference>,
    sample_rate: u32,
    pipeline: Box<dyn ClonePipeline>,
}

impl F5TtsEngine {
    /// Create an adapter backed by the Python runner process.
    pub fn new(_lang_code: &str, device: &str, config: &EngineConfig) -> Result<Self> {
        let pipeline = F5Process::spawn(device, config)?;
        Ok(Self::with_pipeline(device, config, Box::new(pipeline)))
    }

    /// Create an adapter over a caller-supplied pipeline.
    pub fn with_pipeline(
        device: &str,
        config: &EngineConfig,
        pipeline: Box<dyn ClonePipeline>,
    ) -> Self {
        let default_reference = config.get_str("reference_audio").map(|path| Reference {
            audio_path: PathBuf::from(path),
            transcript: config.get_str("reference_text").unwrap_or("").to_string(),
        });
        Self {
            device: device.to_string(),
            params: CloneParams::from_config(config),
            default_reference,
            sample_rate: pipeline.sample_rate(),
            pipeline,
        }
    }

    /// Resolve the voice selector to a reference sample.
    ///
    /// A non-empty selector naming an existing file wins; otherwise the
    /// configured default reference is used if its file still exists.
    fn resolve_reference(&self, voice: &str) -> Result<Reference> {
        if !voice.is_empty() && Path::new(voice).exists() {
            return Ok(Reference {
                audio_path: PathBuf::from(voice),
                transcript: String::new(),
            });
        }
        if let Some(default) = &self.default_reference {
            if default.audio_path.exists() {
                return Ok(default.clone());
            }
        }
        Err(TtsError::invalid_voice(ENGINE_NAME, REFERENCE_GUIDANCE))
    }
}

impl TtsBackend for F5TtsEngine {
    fn engine_name(&self) -> &str {
        ENGINE_NAME
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn synthesize(
        &mut self,
        text: &str,
        voice: &str,
        speed: f32,
        split_rule: Option<&str>,
    ) -> Result<SynthesisStream<'_>> {
        let reference = self.resolve_reference(voice)?;
        let chunks = chunk_text(text, split_rule);
        debug!(
            device = %self.device,
            reference = %reference.audio_path.display(),
            chunks = chunks.len(),
            "starting f5_tts synthesis"
        );
        Ok(SynthesisStream::new(CloneStream {
            pipeline: self.pipeline.as_mut(),
            chunks,
            index: 0,
            reference,
            params: self.params.clone(),
            speed,
        }))
    }
}

/// Runs one inference call per `next()`, skipping blank chunks and chunks
/// the model produced no audio for.
struct CloneStream<'a> {
    pipeline: &'a mut dyn ClonePipeline,
    chunks: Vec<String>,
    index: usize,
    reference: Reference,
    params: CloneParams,
    speed: f32,
}

impl Iterator for CloneStream<'_> {
    type Item = Result<SynthesisResult>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.index >= self.chunks.len() {
                return None;
            }
            let chunk = self.chunks[self.index].clone();
            self.index += 1;
            if chunk.trim().is_empty() {
                continue;
            }
            let ordinal = self.index;
            match self
                .pipeline
                .infer(&chunk, &self.reference, &self.params, self.speed)
            {
                Ok(output) => {
                    let audio = flatten_to_mono(&output.samples, output.channels);
                    if audio.is_empty() {
                        continue;
                    }
                    let graphemes = chunk.chars().map(|c| c.to_string()).collect();
                    return Some(Ok(SynthesisResult {
                        audio,
                        sample_rate: output.sample_rate,
                        graphemes,
                        tokens: Vec::new(),
                    }));
                }
                Err(e) => {
                    return Some(Err(TtsError::synthesis_failed(
                        ENGINE_NAME,
                        ordinal,
                        &chunk,
                        e,
                    )))
                }
            }
        }
    }
}

/// Production pipeline backed by the embedded Python runner.
pub struct F5Process {
    runner: PythonRunner,
    sample_rate: u32,
}

#[derive(Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Request<'a> {
    Init {
        device: &'a str,
        model: &'a str,
        ckpt_file: &'a str,
        vocab_file: &'a str,
        vocoder: &'a str,
    },
    Infer {
        text: &'a str,
        ref_audio: &'a str,
        ref_text: &'a str,
        speed: f32,
        target_rms: f32,
        cross_fade_duration: f32,
        nfe_step: u32,
        cfg_strength: f32,
        sway_sampling_coef: f32,
        fix_duration: Option<f32>,
    },
}

#[derive(Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum Event {
    Ready {
        sample_rate: u32,
    },
    Segment {
        path: String,
    },
    Error {
        message: String,
    },
}

impl F5Process {
    /// Probe for the f5_tts package, then launch and initialize the runner.
    pub fn spawn(device: &str, config: &EngineConfig) -> Result<Self> {
        let python = config.get_str("python").unwrap_or(DEFAULT_PYTHON);
        if !probe_python_module(python, "f5_tts") {
            return Err(TtsError::dependency_missing(ENGINE_NAME, INSTALL_HINT));
        }

        let mut runner = PythonRunner::spawn(python, ENGINE_NAME, RUNNER_SOURCE)
            .map_err(|e| TtsError::initialization_failed(ENGINE_NAME, "runner launch failed", e))?;

        runner.send(&Request::Init {
            device,
            model: config.get_str("model").unwrap_or("F5-TTS"),
            ckpt_file: config.get_str("ckpt_file").unwrap_or(""),
            vocab_file: config.get_str("vocab_file").unwrap_or(""),
            vocoder: config.get_str("vocoder").unwrap_or("vocos"),
        })?;
        match runner.recv::<Event>()? {
            Event::Ready { sample_rate } => Ok(Self {
                runner,
                sample_rate,
            }),
            Event::Error { message } => Err(TtsError::InitializationFailed {
                engine: ENGINE_NAME.to_string(),
                message: format!(
                    "model load failed. This could be due to:\n  - Missing model files (they auto-download on first run)\n  - Insufficient GPU memory (try device 'cpu')\n  - Missing torch or torchaudio\nError: {}",
                    message
                ),
                source: None,
            }),
            _ => Err(TtsError::Internal {
                message: "f5_tts runner sent an unexpected event during init".to_string(),
                location: None,
            }),
        }
    }
}

impl ClonePipeline for F5Process {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn infer(
        &mut self,
        text: &str,
        reference: &Reference,
        params: &CloneParams,
        speed: f32,
    ) -> Result<CloneOutput> {
        self.runner.send(&Request::Infer {
            text,
            ref_audio: &reference.audio_path.to_string_lossy(),
            ref_text: &reference.transcript,
            speed,
            target_rms: params.target_rms,
            cross_fade_duration: params.cross_fade_duration,
            nfe_step: params.nfe_step,
            cfg_strength: params.cfg_strength,
            sway_sampling_coef: params.sway_sampling_coef,
            fix_duration: params.fix_duration,
        })?;
        match self.runner.recv::<Event>()? {
            Event::Segment { path } => {
                let loaded = crate::audio::read_wav(&path);
                let _ = std::fs::remove_file(&path);
                let (samples, channels, sample_rate) = loaded?;
                Ok(CloneOutput {
                    samples,
                    channels,
                    sample_rate,
                })
            }
            Event::Error { message } => Err(TtsError::Internal {
                message,
                location: None,
            }),
            _ => Err(TtsError::Internal {
                message: "f5_tts runner sent an unexpected event for infer".to_string(),
                location: None,
            }),
        }
    }
}

/// Register this engine in `registry`.
pub(crate) fn register(registry: &EngineRegistry) {
    registry.register(EngineEntry {
        name: ENGINE_NAME.to_string(),
        description: "Voice cloning TTS driven by a reference audio sample".to_string(),
        requires_reference: true,
        remediation: INSTALL_HINT.to_string(),
        probe: || probe_python_module(DEFAULT_PYTHON, "f5_tts"),
        constructor: std::sync::Arc::new(|lang_code, device, config| {
            Ok(Box::new(F5TtsEngine::new(lang_code, device, config)?))
        }),
    });
}
