//! # Bookvoice - Multi-Engine Text-to-Speech Dispatch
//!
//! A thin integration layer that lets document-to-speech applications swap
//! between multiple TTS engines through one uniform contract, plus a web job
//! server that drives conversions over HTTP and WebSocket.
//!
//! ## Features
//!
//! - **Multi-Engine Support**: Unified API over catalog-voice and
//!   voice-cloning engines, extensible via runtime registration
//! - **Voice Blending**: Weighted formulas over catalog voices
//!   (`"af_heart*0.7 + af_bella*0.3"`)
//! - **Streaming Synthesis**: Pull-based chunk streams, audio available
//!   before the full text is synthesized
//! - **Conversion Server**: REST + WebSocket job server with subtitle
//!   generation and voice profiles
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bookvoice::engine::{create_engine, EngineConfig};
//!
//! let config = EngineConfig::default();
//! let mut engine = create_engine("kokoro", "en-us", "cpu", &config)?;
//!
//! for chunk in engine.synthesize("Hello world.", "af_heart", 1.0, None)? {
//!     let chunk = chunk?;
//!     println!("{} samples at {} Hz", chunk.audio.len(), chunk.sample_rate);
//! }
//! ```
//!
//! ## Engine Registry
//!
//! ```rust,ignore
//! use bookvoice::engine::{list_available_engines, describe_engine};
//!
//! for name in list_available_engines() {
//!     let info = describe_engine(&name)?;
//!     println!("{}: {}", info.display_name, info.description);
//! }
//! ```
//!
//! ## Supported Engines
//!
//! | Engine | Voices | Notes |
//! |--------|--------|-------|
//! | `kokoro` | 58 catalog voices, blendable | Fast, usable on CPU |
//! | `f5_tts` | Reference-audio cloning | Diffusion-based, much slower |

pub mod audio;
pub mod bridge;
pub mod core;
pub mod engine;
pub mod server;
pub mod subtitles;
pub mod text;

// Re-exports for convenience
pub use crate::core::{Result, ResultExt, TtsError};
pub use engine::{
    create_engine, describe_engine, list_available_engines, list_engines, EngineConfig,
    EngineInfo, SynthesisResult, SynthesisStream, TtsBackend, VoiceEmbedding,
};
pub use subtitles::{SubtitleEntry, SubtitleFormat, TimingTracker};
pub use text::{chunk_text, WORD_BUDGET};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Sample rate assumed when an engine pipeline does not report one (24000 Hz)
pub const DEFAULT_SAMPLE_RATE: u32 = 24000;
