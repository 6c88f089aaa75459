//! Audio utilities
//!
//! - WAV file saving and loading via hound (16-bit PCM and 32-bit float)
//! - Channel flattening for engines that emit multi-channel output
//! - Delegation to ffmpeg for compressed output formats

use std::path::Path;
use std::process::Command;

use crate::core::{AudioOperation, Result, TtsError};

/// Audio output handler for saving synthesized samples
pub struct AudioOutput;

impl AudioOutput {
    /// Save audio samples to a WAV file (16-bit PCM)
    ///
    /// # Arguments
    /// * `samples` - Audio samples (f32, normalized to [-1, 1])
    /// * `sample_rate` - Sample rate in Hz
    /// * `path` - Output file path
    pub fn save<P: AsRef<Path>>(samples: &[f32], sample_rate: u32, path: P) -> Result<()> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer =
            hound::WavWriter::create(path.as_ref(), spec).map_err(|e| TtsError::Audio {
                message: format!("Failed to create WAV file {:?}: {}", path.as_ref(), e),
                operation: AudioOperation::Saving,
            })?;

        for &sample in samples {
            let scaled = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer.write_sample(scaled).map_err(|e| TtsError::Audio {
                message: format!("Failed to write sample: {}", e),
                operation: AudioOperation::Saving,
            })?;
        }

        writer.finalize().map_err(|e| TtsError::Audio {
            message: format!("Failed to finalize WAV: {}", e),
            operation: AudioOperation::Saving,
        })?;
        Ok(())
    }
}

/// Read a WAV file as interleaved f32 samples.
///
/// Integer PCM is rescaled to `[-1.0, 1.0]`. Returns the samples, the
/// channel count, and the sample rate.
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<(Vec<f32>, u16, u32)> {
    let mut reader = hound::WavReader::open(path.as_ref()).map_err(|e| TtsError::Audio {
        message: format!("Failed to open WAV file {:?}: {}", path.as_ref(), e),
        operation: AudioOperation::Loading,
    })?;
    let spec = reader.spec();

    let read_failed = |e: hound::Error| TtsError::Audio {
        message: format!("Failed to read samples from {:?}: {}", path.as_ref(), e),
        operation: AudioOperation::Loading,
    };

    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(read_failed)?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(read_failed)?
        }
    };

    Ok((samples, spec.channels, spec.sample_rate))
}

/// Read a WAV file as mono f32 samples, averaging channels if needed.
pub fn read_wav_mono<P: AsRef<Path>>(path: P) -> Result<(Vec<f32>, u32)> {
    let (samples, channels, sample_rate) = read_wav(path)?;
    Ok((flatten_to_mono(&samples, channels), sample_rate))
}

/// Average interleaved multi-channel samples down to mono.
///
/// Mono input comes back unchanged. A trailing partial frame is averaged
/// over the samples it actually has.
pub fn flatten_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    let channels = channels as usize;
    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Duration in seconds of `len` samples at `sample_rate`.
pub fn duration_secs(len: usize, sample_rate: u32) -> f32 {
    if sample_rate == 0 {
        return 0.0;
    }
    len as f32 / sample_rate as f32
}

/// Re-encode a WAV file into a compressed format by delegating to ffmpeg.
///
/// The target codec is chosen by the output path's extension. Audio
/// encoding itself is out of scope here; ffmpeg owns it.
pub fn encode_with_ffmpeg<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q) -> Result<()> {
    let output_path = output.as_ref();
    let mut args: Vec<&std::ffi::OsStr> = vec![
        "-y".as_ref(),
        "-i".as_ref(),
        input.as_ref().as_os_str(),
    ];
    let is_mp3 = output_path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("mp3"));
    if is_mp3 {
        args.push("-q:a".as_ref());
        args.push("9".as_ref());
    }
    args.push(output_path.as_os_str());

    let result = Command::new("ffmpeg").args(&args).output();
    let output = result.map_err(|e| {
        let message = if e.kind() == std::io::ErrorKind::NotFound {
            "ffmpeg not found on PATH; install ffmpeg to export non-WAV formats".to_string()
        } else {
            format!("Failed to run ffmpeg: {}", e)
        };
        TtsError::Audio {
            message,
            operation: AudioOperation::Encoding,
        }
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let tail: String = stderr
            .lines()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect::<Vec<_>>()
            .join("\n");
        return Err(TtsError::Audio {
            message: format!("ffmpeg exited with {}: {}", output.status, tail),
            operation: AudioOperation::Encoding,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_mono_passthrough() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(flatten_to_mono(&samples, 1), samples);
        assert_eq!(flatten_to_mono(&samples, 0), samples);
    }

    #[test]
    fn test_flatten_stereo_averages_frames() {
        let interleaved = vec![1.0, 0.0, 0.5, 0.5, -1.0, 1.0];
        let mono = flatten_to_mono(&interleaved, 2);
        assert_eq!(mono, vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_flatten_partial_trailing_frame() {
        let interleaved = vec![1.0, 0.0, 0.4];
        let mono = flatten_to_mono(&interleaved, 2);
        assert_eq!(mono.len(), 2);
        assert!((mono[1] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_duration_secs() {
        assert!((duration_secs(24000, 24000) - 1.0).abs() < 1e-6);
        assert!((duration_secs(36000, 24000) - 1.5).abs() < 1e-6);
        assert_eq!(duration_secs(100, 0), 0.0);
    }

    #[test]
    fn test_wav_save_and_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let samples: Vec<f32> = (0..2400)
            .map(|i| (i as f32 * 0.01).sin() * 0.5)
            .collect();

        AudioOutput::save(&samples, 24000, &path).unwrap();
        let (loaded, rate) = read_wav_mono(&path).unwrap();

        assert_eq!(rate, 24000);
        assert_eq!(loaded.len(), samples.len());
        // 16-bit quantization keeps samples within 1/32767 of the source.
        for (a, b) in loaded.iter().zip(&samples) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn test_read_missing_file_is_loading_error() {
        let err = read_wav("/nonexistent/missing.wav").unwrap_err();
        match err {
            TtsError::Audio { operation, .. } => {
                assert_eq!(operation, AudioOperation::Loading)
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
