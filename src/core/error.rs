//! Structured error handling for the synthesis layer
//!
//! Every failure surfaced by the engine registry, the adapters, and the
//! streaming contract maps to one of the variants below, so callers can
//! match on the failure class instead of parsing messages.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias with TtsError
pub type Result<T> = std::result::Result<T, TtsError>;

/// Boxed error cause carried by variants that preserve the underlying failure.
pub type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for the synthesis layer
#[derive(Error, Debug)]
pub enum TtsError {
    /// Engine name not present in the registry
    #[error("Unknown TTS engine '{name}'. Available engines: {known}")]
    UnknownEngine {
        name: String,
        /// Comma-joined list of every registered engine name
        known: String,
    },

    /// A required third-party synthesis package is not installed
    #[error("Engine '{engine}' is missing required dependencies. Install with:\n  {remediation}")]
    DependencyMissing {
        engine: String,
        /// Actionable install instructions, surfaced directly to end users
        remediation: String,
        #[source]
        source: Option<BoxedCause>,
    },

    /// Engine construction failed for a reason other than missing dependencies
    #[error("Failed to initialize '{engine}' engine: {message}")]
    InitializationFailed {
        engine: String,
        message: String,
        #[source]
        source: Option<BoxedCause>,
    },

    /// Voice identifier, formula, or reference path could not be resolved
    #[error("Invalid voice for engine '{engine}': {message}")]
    InvalidVoice { engine: String, message: String },

    /// A chunk failed during generation; the stream ends after this error
    #[error("{engine} synthesis failed on chunk {chunk_index}:\n  Text: {excerpt}\n")]
    SynthesisFailed {
        engine: String,
        /// 1-based ordinal of the failing chunk
        chunk_index: usize,
        /// First 100 characters of the failing chunk's text
        excerpt: String,
        #[source]
        source: Option<BoxedCause>,
    },

    /// Operation called on an adapter without that capability
    #[error("Engine '{engine}' does not support {operation}")]
    NotSupported { engine: String, operation: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<PathBuf>,
    },

    /// I/O errors
    #[error("I/O error: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
    },

    /// Audio processing errors
    #[error("Audio processing error ({operation}): {message}")]
    Audio {
        message: String,
        operation: AudioOperation,
    },

    /// Internal/bug errors
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        location: Option<String>,
    },
}

impl TtsError {
    /// Build a `SynthesisFailed` from the failing chunk's full text.
    ///
    /// Truncates the text to the 100-character excerpt carried in the error.
    pub fn synthesis_failed(
        engine: impl Into<String>,
        chunk_index: usize,
        chunk_text: &str,
        source: impl Into<BoxedCause>,
    ) -> Self {
        let mut excerpt: String = chunk_text.chars().take(100).collect();
        if chunk_text.chars().count() > 100 {
            excerpt.push_str("...");
        }
        TtsError::SynthesisFailed {
            engine: engine.into(),
            chunk_index,
            excerpt,
            source: Some(source.into()),
        }
    }

    /// Build a `DependencyMissing` without an underlying cause.
    pub fn dependency_missing(engine: impl Into<String>, remediation: impl Into<String>) -> Self {
        TtsError::DependencyMissing {
            engine: engine.into(),
            remediation: remediation.into(),
            source: None,
        }
    }

    /// Build an `InitializationFailed` wrapping a cause.
    pub fn initialization_failed(
        engine: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<BoxedCause>,
    ) -> Self {
        TtsError::InitializationFailed {
            engine: engine.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Build an `InvalidVoice`.
    pub fn invalid_voice(engine: impl Into<String>, message: impl Into<String>) -> Self {
        TtsError::InvalidVoice {
            engine: engine.into(),
            message: message.into(),
        }
    }

    /// Build a `NotSupported`.
    pub fn not_supported(engine: impl Into<String>, operation: impl Into<String>) -> Self {
        TtsError::NotSupported {
            engine: engine.into(),
            operation: operation.into(),
        }
    }
}

/// Audio operation types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioOperation {
    Loading,
    Saving,
    Mixing,
    Encoding,
}

impl fmt::Display for AudioOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioOperation::Loading => write!(f, "loading"),
            AudioOperation::Saving => write!(f, "saving"),
            AudioOperation::Mixing => write!(f, "mixing"),
            AudioOperation::Encoding => write!(f, "encoding"),
        }
    }
}

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;

    /// Add a simple message context
    fn context(self, msg: impl Into<String>) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| TtsError::Internal {
            message: format!("{}: {}", f(), e),
            location: None,
        })
    }

    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| TtsError::Internal {
            message: format!("{}: {}", msg.into(), e),
            location: None,
        })
    }
}

/// Convert from std::io::Error
impl From<std::io::Error> for TtsError {
    fn from(err: std::io::Error) -> Self {
        TtsError::Io {
            message: err.to_string(),
            path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_engine_lists_names() {
        let err = TtsError::UnknownEngine {
            name: "espeak".to_string(),
            known: "f5_tts, kokoro".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("espeak"));
        assert!(msg.contains("kokoro"));
        assert!(msg.contains("f5_tts"));
    }

    #[test]
    fn test_dependency_missing_carries_remediation() {
        let err = TtsError::dependency_missing("kokoro", "pip install kokoro");
        assert!(err.to_string().contains("pip install kokoro"));
    }

    #[test]
    fn test_synthesis_failed_truncates_excerpt() {
        let long_text = "x".repeat(250);
        let err = TtsError::synthesis_failed(
            "f5_tts",
            3,
            &long_text,
            std::io::Error::new(std::io::ErrorKind::Other, "boom"),
        );
        match &err {
            TtsError::SynthesisFailed {
                chunk_index,
                excerpt,
                ..
            } => {
                assert_eq!(*chunk_index, 3);
                assert_eq!(excerpt.len(), 103); // 100 chars + "..."
            }
            other => panic!("unexpected variant: {:?}", other),
        }
        assert!(err.to_string().contains("chunk 3"));
    }

    #[test]
    fn test_source_chain_preserved() {
        use std::error::Error;
        let cause = std::io::Error::new(std::io::ErrorKind::NotFound, "no such checkpoint");
        let err = TtsError::initialization_failed("f5_tts", "model load failed", cause);
        let source = err.source().expect("source must be preserved");
        assert!(source.to_string().contains("no such checkpoint"));
    }

    #[test]
    fn test_not_supported_display() {
        let err = TtsError::not_supported("f5_tts", "voice mixing");
        assert_eq!(
            err.to_string(),
            "Engine 'f5_tts' does not support voice mixing"
        );
    }
}
