//! Kokoro engine adapter
//!
//! Wraps the Kokoro model (82M params) behind the [`TtsBackend`] contract.
//!
//! ## Capabilities
//! - Bundled multilingual voice catalog (see [`crate::engine::voices::VOICES`])
//! - Weighted voice blending via formulas like `"af_heart*0.7 + af_bella*0.3"`
//! - Internal chunking: the pipeline ingests whole texts and streams segments
//!
//! The adapter talks to the model through the [`KokoroPipeline`] seam. In
//! production that seam is a Python runner process; tests inject a scripted
//! pipeline instead.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bridge::{probe_python_module, PythonRunner, DEFAULT_PYTHON};
use crate::core::{Result, TtsError};
use crate::engine::config::EngineConfig;
use crate::engine::registry::{EngineEntry, EngineRegistry};
use crate::engine::traits::{SynthesisResult, SynthesisStream, TtsBackend, VoiceEmbedding};
use crate::engine::voices::{VoiceFormula, VOICES};

const ENGINE_NAME: &str = "kokoro";
const DEFAULT_REPO_ID: &str = "hexgrad/Kokoro-82M";
const RUNNER_SOURCE: &str = include_str!("../../runners/kokoro_runner.py");

/// One audio segment produced by the pipeline.
///
/// `sample_rate` is `None` when the pipeline does not report a rate for the
/// segment; the adapter then falls back to the instance rate.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSegment {
    pub audio: Vec<f32>,
    pub sample_rate: Option<u32>,
    pub graphemes: Vec<String>,
    pub tokens: Vec<String>,
}

/// Lazy segment iterator returned by [`KokoroPipeline::synthesize`].
pub type SegmentIter<'a> = Box<dyn Iterator<Item = Result<PipelineSegment>> + Send + 'a>;

/// Seam between the adapter and the model pipeline.
///
/// The pipeline does its own text chunking, so `synthesize` takes the whole
/// text and streams segments back lazily.
pub trait KokoroPipeline: Send {
    /// Output rate the pipeline is configured for, if it knows one.
    fn sample_rate(&self) -> Option<u32>;

    /// Load a single catalog voice, returning its embedding handle.
    fn load_voice(&mut self, name: &str) -> Result<VoiceEmbedding>;

    /// Run the pipeline over `text`, yielding one segment per chunk.
    fn synthesize(
        &mut self,
        text: &str,
        voice: &VoiceEmbedding,
        speed: f32,
        split_rule: Option<&str>,
    ) -> Result<SegmentIter<'_>>;
}

/// Kokoro engine adapter
pub struct KokoroEngine {
    lang_code: String,
    device: String,
    sample_rate: u32,
    pipeline: Box<dyn KokoroPipeline>,
}

impl KokoroEngine {
    /// Create an adapter backed by the Python runner process.
    pub fn new(lang_code: &str, device: &str, config: &EngineConfig) -> Result<Self> {
        let pipeline = KokoroProcess::spawn(lang_code, device, config)?;
        Ok(Self::with_pipeline(lang_code, device, Box::new(pipeline)))
    }

    /// Create an adapter over a caller-supplied pipeline.
    pub fn with_pipeline(
        lang_code: &str,
        device: &str,
        pipeline: Box<dyn KokoroPipeline>,
    ) -> Self {
        let sample_rate = pipeline.sample_rate().unwrap_or(crate::DEFAULT_SAMPLE_RATE);
        Self {
            lang_code: lang_code.to_string(),
            device: device.to_string(),
            sample_rate,
            pipeline,
        }
    }

    /// Resolve a voice selector to an embedding.
    ///
    /// Accepts a plain catalog name or a weighted formula. Every component
    /// must exist in the catalog; blends load each component through the
    /// pipeline before combining.
    fn resolve_voice(&mut self, voice: &str) -> Result<VoiceEmbedding> {
        let formula = VoiceFormula::parse(voice).ok_or_else(|| {
            TtsError::invalid_voice(
                ENGINE_NAME,
                format!("could not parse voice formula '{}'", voice),
            )
        })?;
        if let Some(unknown) = formula.unknown_voice() {
            return Err(TtsError::invalid_voice(
                ENGINE_NAME,
                format!("'{}' is not in the voice catalog", unknown),
            ));
        }
        if !formula.is_single() {
            for term in formula.terms() {
                self.pipeline.load_voice(&term.voice)?;
            }
        }
        Ok(formula.to_embedding())
    }
}

impl TtsBackend for KokoroEngine {
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
        let embedding = self.resolve_voice(voice)?;
        debug!(
            lang = %self.lang_code,
            device = %self.device,
            voice,
            speed,
            "starting kokoro synthesis"
        );
        let fallback_rate = self.sample_rate;
        let segments = self.pipeline.synthesize(text, &embedding, speed, split_rule)?;
        Ok(SynthesisStream::new(CatalogStream {
            segments,
            fallback_rate,
            chunk_index: 0,
        }))
    }

    fn load_single_voice(&mut self, name: &str) -> Result<VoiceEmbedding> {
        if !crate::engine::voices::is_catalog_voice(name) {
            return Err(TtsError::invalid_voice(
                ENGINE_NAME,
                format!("'{}' is not in the voice catalog", name),
            ));
        }
        self.pipeline.load_voice(name)
    }

    fn supports_voice_mixing(&self) -> bool {
        true
    }

    fn available_voices(&self) -> Vec<String> {
        VOICES.iter().map(|v| v.to_string()).collect()
    }
}

/// Maps pipeline segments into the stream contract: empty segments are
/// skipped, missing rates fall back to the instance rate, and pipeline
/// errors are classified as synthesis failures.
struct CatalogStream<'a> {
    segments: SegmentIter<'a>,
    fallback_rate: u32,
    chunk_index: usize,
}

impl Iterator for CatalogStream<'_> {
    type Item = Result<SynthesisResult>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let segment = match self.segments.next()? {
                Ok(segment) => segment,
                Err(e @ TtsError::SynthesisFailed { .. }) => return Some(Err(e)),
                Err(other) => {
                    return Some(Err(TtsError::synthesis_failed(
                        ENGINE_NAME,
                        self.chunk_index + 1,
                        "",
                        other,
                    )))
                }
            };
            self.chunk_index += 1;
            if segment.audio.is_empty() {
                continue;
            }
            let sample_rate = segment.sample_rate.unwrap_or(self.fallback_rate);
            return Some(Ok(SynthesisResult {
                audio: segment.audio,
                sample_rate,
                graphemes: segment.graphemes,
                tokens: segment.tokens,
            }));
        }
    }
}

/// Production pipeline backed by the embedded Python runner.
pub struct KokoroProcess {
    runner: PythonRunner,
    sample_rate: Option<u32>,
}

#[derive(Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Request<'a> {
    Init {
        lang_code: &'a str,
        device: &'a str,
        repo_id: &'a str,
    },
    LoadVoice {
        name: &'a str,
    },
    Synthesize {
        text: &'a str,
        voice: &'a [(String, f32)],
        speed: f32,
        split_rule: Option<&'a str>,
    },
}

#[derive(Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum Event {
    Ready {
        #[serde(default)]
        sample_rate: Option<u32>,
    },
    Voice {
        #[allow(dead_code)]
        name: String,
    },
    Segment {
        path: String,
        #[serde(default)]
        graphemes: Vec<String>,
        #[serde(default)]
        tokens: Vec<String>,
        #[serde(default)]
        sample_rate: Option<u32>,
    },
    Done,
    Error {
        message: String,
        #[serde(default)]
        chunk_index: Option<usize>,
        #[serde(default)]
        text: String,
    },
}

impl KokoroProcess {
    /// Probe for the kokoro package, then launch and initialize the runner.
    pub fn spawn(lang_code: &str, device: &str, config: &EngineConfig) -> Result<Self> {
        let python = config.get_str("python").unwrap_or(DEFAULT_PYTHON);
        if !probe_python_module(python, "kokoro") {
            return Err(TtsError::dependency_missing(
                ENGINE_NAME,
                "pip install kokoro",
            ));
        }

        let mut runner = PythonRunner::spawn(python, ENGINE_NAME, RUNNER_SOURCE)
            .map_err(|e| TtsError::initialization_failed(ENGINE_NAME, "runner launch failed", e))?;

        let repo_id = config.get_str("repo_id").unwrap_or(DEFAULT_REPO_ID);
        runner.send(&Request::Init {
            lang_code,
            device,
            repo_id,
        })?;
        match runner.recv::<Event>()? {
            Event::Ready { sample_rate } => Ok(Self {
                runner,
                sample_rate,
            }),
            Event::Error { message, .. } => Err(TtsError::InitializationFailed {
                engine: ENGINE_NAME.to_string(),
                message,
                source: None,
            }),
            _ => Err(TtsError::Internal {
                message: "kokoro runner sent an unexpected event during init".to_string(),
                location: None,
            }),
        }
    }
}

impl KokoroPipeline for KokoroProcess {
    fn sample_rate(&self) -> Option<u32> {
        self.sample_rate
    }

    fn load_voice(&mut self, name: &str) -> Result<VoiceEmbedding> {
        self.runner.send(&Request::LoadVoice { name })?;
        match self.runner.recv::<Event>()? {
            Event::Voice { .. } => Ok(VoiceEmbedding::single(name)),
            Event::Error { message, .. } => Err(TtsError::InitializationFailed {
                engine: ENGINE_NAME.to_string(),
                message: format!("failed to load voice '{}': {}", name, message),
                source: None,
            }),
            _ => Err(TtsError::Internal {
                message: "kokoro runner sent an unexpected event for load_voice".to_string(),
                location: None,
            }),
        }
    }

    fn synthesize(
        &mut self,
        text: &str,
        voice: &VoiceEmbedding,
        speed: f32,
        split_rule: Option<&str>,
    ) -> Result<SegmentIter<'_>> {
        self.runner.send(&Request::Synthesize {
            text,
            voice: voice.components(),
            speed,
            split_rule,
        })?;
        Ok(Box::new(ProcessSegments {
            runner: &mut self.runner,
            done: false,
        }))
    }
}

/// Streams segment events from the runner until `done` or an error.
struct ProcessSegments<'a> {
    runner: &'a mut PythonRunner,
    done: bool,
}

impl Iterator for ProcessSegments<'_> {
    type Item = Result<PipelineSegment>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.runner.recv::<Event>() {
            Ok(Event::Segment {
                path,
                graphemes,
                tokens,
                sample_rate,
            }) => {
                let loaded = crate::audio::read_wav_mono(&path);
                let _ = std::fs::remove_file(&path);
                match loaded {
                    Ok((audio, rate)) => Some(Ok(PipelineSegment {
                        audio,
                        sample_rate: sample_rate.or(Some(rate)),
                        graphemes,
                        tokens,
                    })),
                    Err(e) => {
                        self.done = true;
                        Some(Err(e))
                    }
                }
            }
            Ok(Event::Done) => {
                self.done = true;
                None
            }
            Ok(Event::Error {
                message,
                chunk_index,
                text,
            }) => {
                self.done = true;
                Some(Err(TtsError::synthesis_failed(
                    ENGINE_NAME,
                    chunk_index.unwrap_or(0),
                    &text,
                    message,
                )))
            }
            Ok(_) => {
                self.done = true;
                Some(Err(TtsError::Internal {
                    message: "kokoro runner sent an unexpected event mid-stream".to_string(),
                    location: None,
                }))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Register this engine in `registry`.
pub(crate) fn register(registry: &EngineRegistry) {
    registry.register(EngineEntry {
        name: ENGINE_NAME.to_string(),
        description: "Multilingual TTS with a bundled voice catalog and voice blending"
            .to_string(),
        requires_reference: false,
        remediation: "pip install kokoro".to_string(),
        probe: || probe_python_module(DEFAULT_PYTHON, "kokoro"),
        constructor: std::sync::Arc::new(|lang_code, device, config| {
            Ok(Box::new(KokoroEngine::new(lang_code, device, config)?))
        }),
    });
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Clone)]
    enum ScriptedSegment {
        Audio(PipelineSegment),
        Fail(String),
    }

    #[derive(Default)]
    struct Recorder {
        loaded: Vec<String>,
        calls: Vec<(String, VoiceEmbedding, f32, Option<String>)>,
        segments_pulled: usize,
    }

    struct FakePipeline {
        rate: Option<u32>,
        script: Vec<ScriptedSegment>,
        recorder: Arc<Mutex<Recorder>>,
    }

    impl FakePipeline {
        fn new(rate: Option<u32>, script: Vec<ScriptedSegment>) -> (Self, Arc<Mutex<Recorder>>) {
            let recorder = Arc::new(Mutex::new(Recorder::default()));
            (
                Self {
                    rate,
                    script,
                    recorder: Arc::clone(&recorder),
                },
                recorder,
            )
        }
    }

    impl KokoroPipeline for FakePipeline {
        fn sample_rate(&self) -> Option<u32> {
            self.rate
        }

        fn load_voice(&mut self, name: &str) -> Result<VoiceEmbedding> {
            self.recorder.lock().unwrap().loaded.push(name.to_string());
            Ok(VoiceEmbedding::single(name))
        }

        fn synthesize(
            &mut self,
            text: &str,
            voice: &VoiceEmbedding,
            speed: f32,
            split_rule: Option<&str>,
        ) -> Result<SegmentIter<'_>> {
            self.recorder.lock().unwrap().calls.push((
                text.to_string(),
                voice.clone(),
                speed,
                split_rule.map(String::from),
            ));
            let recorder = Arc::clone(&self.recorder);
            let script = self.script.clone();
            Ok(Box::new(script.into_iter().map(move |scripted| {
                recorder.lock().unwrap().segments_pulled += 1;
                match scripted {
                    ScriptedSegment::Audio(segment) => Ok(segment),
                    ScriptedSegment::Fail(message) => Err(TtsError::synthesis_failed(
                        "kokoro",
                        2,
                        "scripted failure",
                        message,
                    )),
                }
            })))
        }
    }

    fn segment(samples: usize, graphemes: &[&str]) -> ScriptedSegment {
        ScriptedSegment::Audio(PipelineSegment {
            audio: vec![0.25; samples],
            sample_rate: None,
            graphemes: graphemes.iter().map(|g| g.to_string()).collect(),
            tokens: Vec::new(),
        })
    }

    fn engine_with(
        rate: Option<u32>,
        script: Vec<ScriptedSegment>,
    ) -> (KokoroEngine, Arc<Mutex<Recorder>>) {
        let (pipeline, recorder) = FakePipeline::new(rate, script);
        (
            KokoroEngine::with_pipeline("a", "cpu", Box::new(pipeline)),
            recorder,
        )
    }

    #[test]
    fn test_single_voice_degenerate_formula() {
        let (mut engine, recorder) = engine_with(None, vec![segment(100, &["h", "i"])]);
        let stream = engine.synthesize("Hi.", "af_heart", 1.0, None).unwrap();
        assert_eq!(stream.count(), 1);

        let recorder = recorder.lock().unwrap();
        let (_, embedding, _, _) = &recorder.calls[0];
        assert_eq!(embedding.components(), &[("af_heart".to_string(), 1.0)]);
        // A plain name goes straight to the pipeline without a separate load.
        assert!(recorder.loaded.is_empty());
    }

    #[test]
    fn test_formula_blend_equal_weights() {
        let (mut engine, recorder) = engine_with(None, vec![segment(100, &[])]);
        engine
            .synthesize("Hi.", "af_heart*0.5 + af_bella*0.5", 1.0, None)
            .unwrap()
            .count();

        let recorder = recorder.lock().unwrap();
        assert_eq!(recorder.loaded, vec!["af_heart", "af_bella"]);
        let (_, embedding, _, _) = &recorder.calls[0];
        let components = embedding.components();
        assert_eq!(components[0].0, "af_heart");
        assert!((components[0].1 - 0.5).abs() < 1e-6);
        assert!((components[1].1 - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_formula_blend_normalizes_by_total_weight() {
        let (mut engine, recorder) = engine_with(None, vec![segment(100, &[])]);
        engine
            .synthesize("Hi.", "af_heart*1.0 + af_bella*3.0", 1.0, None)
            .unwrap()
            .count();

        let recorder = recorder.lock().unwrap();
        let (_, embedding, _, _) = &recorder.calls[0];
        assert!((embedding.components()[0].1 - 0.25).abs() < 1e-6);
        assert!((embedding.components()[1].1 - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_formula_voice_rejected_before_synthesis() {
        let (mut engine, recorder) = engine_with(None, vec![segment(100, &[])]);
        let err = engine
            .synthesize("Hi.", "af_heart*0.5 + not_real*0.5", 1.0, None)
            .err()
            .expect("unknown voice must fail");
        assert!(matches!(err, TtsError::InvalidVoice { .. }));
        assert!(err.to_string().contains("not_real"));
        assert!(recorder.lock().unwrap().calls.is_empty());
    }

    #[test]
    fn test_malformed_formula_rejected() {
        let (mut engine, _) = engine_with(None, vec![]);
        let err = engine.synthesize("Hi.", "af_heart*", 1.0, None).err().unwrap();
        assert!(matches!(err, TtsError::InvalidVoice { .. }));
    }

    #[test]
    fn test_sample_rate_falls_back_to_default() {
        let (mut engine, _) = engine_with(None, vec![segment(2400, &[])]);
        assert_eq!(engine.sample_rate(), 24000);
        let results: Vec<_> = engine
            .synthesize("Hi.", "af_heart", 1.0, None)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(results[0].sample_rate, 24000);
    }

    #[test]
    fn test_pipeline_reported_rate_wins() {
        let (mut engine, _) = engine_with(Some(22050), vec![segment(2400, &[])]);
        assert_eq!(engine.sample_rate(), 22050);
        let results: Vec<_> = engine
            .synthesize("Hi.", "af_heart", 1.0, None)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(results[0].sample_rate, 22050);
    }

    #[test]
    fn test_empty_segments_skipped() {
        let (mut engine, _) = engine_with(
            None,
            vec![segment(100, &["a"]), segment(0, &[]), segment(50, &["b"])],
        );
        let results: Vec<_> = engine
            .synthesize("Hi.", "af_heart", 1.0, None)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| !r.audio.is_empty()));
    }

    #[test]
    fn test_split_rule_forwarded_to_pipeline() {
        let (mut engine, recorder) = engine_with(None, vec![segment(10, &[])]);
        engine
            .synthesize("a|b", "af_heart", 1.25, Some("|"))
            .unwrap()
            .count();
        let recorder = recorder.lock().unwrap();
        let (text, _, speed, split_rule) = &recorder.calls[0];
        assert_eq!(text, "a|b");
        assert!((speed - 1.25).abs() < 1e-6);
        assert_eq!(split_rule.as_deref(), Some("|"));
    }

    #[test]
    fn test_stream_pulls_segments_lazily() {
        let (mut engine, recorder) =
            engine_with(None, vec![segment(10, &[]), segment(10, &[])]);
        let mut stream = engine.synthesize("Hi.", "af_heart", 1.0, None).unwrap();
        assert_eq!(recorder.lock().unwrap().segments_pulled, 0);
        stream.next().unwrap().unwrap();
        assert_eq!(recorder.lock().unwrap().segments_pulled, 1);
        stream.next().unwrap().unwrap();
        assert_eq!(recorder.lock().unwrap().segments_pulled, 2);
    }

    #[test]
    fn test_mid_stream_failure_ends_stream() {
        let (mut engine, _) = engine_with(
            None,
            vec![
                segment(10, &[]),
                ScriptedSegment::Fail("model exploded".to_string()),
                segment(10, &[]),
            ],
        );
        let mut stream = engine.synthesize("Hi.", "af_heart", 1.0, None).unwrap();
        assert!(stream.next().unwrap().is_ok());
        let err = stream.next().unwrap().unwrap_err();
        assert!(matches!(err, TtsError::SynthesisFailed { .. }));
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_capabilities() {
        let (engine, _) = engine_with(None, vec![]);
        assert!(engine.supports_voice_mixing());
        assert_eq!(engine.engine_name(), "kokoro");
        let voices = engine.available_voices();
        assert_eq!(voices.len(), VOICES.len());
        assert!(voices.contains(&"af_heart".to_string()));
    }

    #[test]
    fn test_load_single_voice_checks_catalog() {
        let (mut engine, recorder) = engine_with(None, vec![]);
        engine.load_single_voice("af_bella").unwrap();
        assert_eq!(recorder.lock().unwrap().loaded, vec!["af_bella"]);

        let err = engine.load_single_voice("nope").unwrap_err();
        assert!(matches!(err, TtsError::InvalidVoice { .. }));
    }
}
