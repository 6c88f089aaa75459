//! Backend contract shared by every synthesis engine
//!
//! An engine adapter wraps one underlying model behind a uniform surface:
//! synthesis yields a lazy stream of per-chunk results, and capability
//! queries tell callers what the engine can do before they rely on it.

use std::io::Cursor;

use crate::core::{AudioOperation, Result, TtsError};

/// One synthesized chunk of audio with its alignment metadata.
///
/// `audio` is always non-empty mono samples in `[-1.0, 1.0]` at
/// `sample_rate`; chunks with no audio are skipped by the stream rather
/// than surfaced. `graphemes` and `tokens` are always present (possibly
/// empty) so downstream timing code never branches on absence.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisResult {
    /// Mono audio samples, 32-bit float
    pub audio: Vec<f32>,
    /// Sample rate in Hz, fixed per engine instance
    pub sample_rate: u32,
    /// Text units aligned with the audio, used for subtitle timing
    pub graphemes: Vec<String>,
    /// Model token identifiers, when the engine exposes them
    pub tokens: Vec<String>,
}

impl SynthesisResult {
    /// Duration of this chunk in seconds.
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.audio.len() as f32 / self.sample_rate as f32
    }

    /// Encode this chunk as a standalone 16-bit PCM WAV file in memory.
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer =
                hound::WavWriter::new(&mut cursor, spec).map_err(|e| TtsError::Audio {
                    message: format!("Failed to create WAV writer: {}", e),
                    operation: AudioOperation::Saving,
                })?;

            for &sample in &self.audio {
                let value = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
                writer.write_sample(value).map_err(|e| TtsError::Audio {
                    message: format!("Failed to write sample: {}", e),
                    operation: AudioOperation::Saving,
                })?;
            }

            writer.finalize().map_err(|e| TtsError::Audio {
                message: format!("Failed to finalize WAV: {}", e),
                operation: AudioOperation::Saving,
            })?;
        }

        Ok(cursor.into_inner())
    }
}

/// Opaque handle to a resolved voice.
///
/// Holds the catalog voices making up the voice and their normalized blend
/// weights. A plain voice is a single component with weight 1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceEmbedding {
    components: Vec<(String, f32)>,
}

impl VoiceEmbedding {
    /// Embedding for a single catalog voice.
    pub fn single(name: impl Into<String>) -> Self {
        VoiceEmbedding {
            components: vec![(name.into(), 1.0)],
        }
    }

    /// Blend weighted components, normalizing by the total weight.
    ///
    /// Weights must be positive; the caller validates that before blending.
    pub fn blend(parts: Vec<(String, f32)>) -> Self {
        let total: f32 = parts.iter().map(|(_, w)| w).sum();
        let components = parts
            .into_iter()
            .map(|(name, weight)| (name, weight / total))
            .collect();
        VoiceEmbedding { components }
    }

    /// Component voices and their normalized weights.
    pub fn components(&self) -> &[(String, f32)] {
        &self.components
    }
}

/// Lazy stream of synthesis results.
///
/// Each call to `next()` performs the work for one chunk. After an error is
/// yielded the stream is exhausted and every further `next()` returns `None`.
pub struct SynthesisStream<'a> {
    inner: Box<dyn Iterator<Item = Result<SynthesisResult>> + Send + 'a>,
    failed: bool,
}

impl<'a> SynthesisStream<'a> {
    /// Wrap a chunk iterator in the fused stream contract.
    pub fn new(inner: impl Iterator<Item = Result<SynthesisResult>> + Send + 'a) -> Self {
        SynthesisStream {
            inner: Box::new(inner),
            failed: false,
        }
    }

    /// Drain the stream, concatenating all chunk audio.
    ///
    /// Returns the samples, the sample rate, and every per-chunk result.
    /// Fails on the first chunk error.
    pub fn collect_audio(self) -> Result<(Vec<f32>, u32, Vec<SynthesisResult>)> {
        let mut samples = Vec::new();
        let mut sample_rate = 0;
        let mut results = Vec::new();
        for chunk in self {
            let chunk = chunk?;
            sample_rate = chunk.sample_rate;
            samples.extend_from_slice(&chunk.audio);
            results.push(chunk);
        }
        Ok((samples, sample_rate, results))
    }
}

impl Iterator for SynthesisStream<'_> {
    type Item = Result<SynthesisResult>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.inner.next() {
            Some(Err(e)) => {
                self.failed = true;
                Some(Err(e))
            }
            other => other,
        }
    }
}

/// Uniform interface over one synthesis engine instance.
///
/// Synthesis takes `&mut self`: one instance runs one stream at a time, and
/// the borrow keeps a second synthesize call from starting while a stream
/// from the first is still alive.
pub trait TtsBackend: Send {
    /// Registry name of this engine, e.g. `"kokoro"`.
    fn engine_name(&self) -> &str;

    /// Sample rate of every chunk this instance will produce, in Hz.
    fn sample_rate(&self) -> u32;

    /// Synthesize `text` as a lazy stream of chunks.
    ///
    /// `voice` is an engine-specific selector: a catalog name, a weighted
    /// formula, or a reference audio path. `speed` is a playback-rate
    /// multiplier. `split_rule` overrides sentence chunking with a literal
    /// split pattern.
    ///
    /// Voice resolution errors are returned here, before any model work.
    fn synthesize(
        &mut self,
        text: &str,
        voice: &str,
        speed: f32,
        split_rule: Option<&str>,
    ) -> Result<SynthesisStream<'_>>;

    /// Resolve a single catalog voice to an embedding handle.
    fn load_single_voice(&mut self, name: &str) -> Result<VoiceEmbedding> {
        let _ = name;
        Err(TtsError::not_supported(
            self.engine_name(),
            "voice embeddings",
        ))
    }

    /// Whether weighted voice formulas are accepted by `synthesize`.
    fn supports_voice_mixing(&self) -> bool {
        false
    }

    /// Names of the bundled voices, in catalog order.
    ///
    /// Empty for engines that take reference audio instead of a catalog.
    fn available_voices(&self) -> Vec<String> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with(samples: usize, rate: u32) -> SynthesisResult {
        SynthesisResult {
            audio: vec![0.1; samples],
            sample_rate: rate,
            graphemes: Vec::new(),
            tokens: Vec::new(),
        }
    }

    #[test]
    fn test_duration_secs() {
        let result = result_with(24000, 24000);
        assert!((result.duration_secs() - 1.0).abs() < 1e-6);
        let half = result_with(12000, 24000);
        assert!((half.duration_secs() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_to_wav_bytes_header() {
        let result = result_with(100, 24000);
        let bytes = result.to_wav_bytes().unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
    }

    #[test]
    fn test_embedding_single() {
        let embedding = VoiceEmbedding::single("af_heart");
        assert_eq!(embedding.components(), &[("af_heart".to_string(), 1.0)]);
    }

    #[test]
    fn test_embedding_blend_normalizes_by_total() {
        let embedding = VoiceEmbedding::blend(vec![
            ("af_heart".to_string(), 1.0),
            ("af_bella".to_string(), 3.0),
        ]);
        let weights: Vec<f32> = embedding.components().iter().map(|(_, w)| *w).collect();
        assert!((weights[0] - 0.25).abs() < 1e-6);
        assert!((weights[1] - 0.75).abs() < 1e-6);
        let total: f32 = weights.iter().sum();
        assert!((total - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_stream_fuses_after_error() {
        let items: Vec<Result<SynthesisResult>> = vec![
            Ok(result_with(10, 24000)),
            Err(TtsError::synthesis_failed(
                "kokoro",
                2,
                "bad chunk",
                std::io::Error::new(std::io::ErrorKind::Other, "model panic"),
            )),
            Ok(result_with(10, 24000)),
        ];
        let mut stream = SynthesisStream::new(items.into_iter());
        assert!(stream.next().unwrap().is_ok());
        assert!(stream.next().unwrap().is_err());
        assert!(stream.next().is_none());
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_collect_audio_concatenates() {
        let items: Vec<Result<SynthesisResult>> =
            vec![Ok(result_with(10, 24000)), Ok(result_with(20, 24000))];
        let stream = SynthesisStream::new(items.into_iter());
        let (samples, rate, results) = stream.collect_audio().unwrap();
        assert_eq!(samples.len(), 30);
        assert_eq!(rate, 24000);
        assert_eq!(results.len(), 2);
    }
}
