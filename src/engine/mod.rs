//! TTS engine abstraction layer
//!
//! Every synthesis engine hides behind one uniform contract, so callers
//! pick engines by name and never touch model specifics.
//!
//! # Engines
//! - **kokoro** - Multilingual catalog voices with weighted blending
//! - **f5_tts** - Voice cloning from a reference audio sample
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                 Application Layer                       │
//! │              (CLI, conversion server)                   │
//! ├─────────────────────────────────────────────────────────┤
//! │                 TtsBackend Trait                        │
//! │   - synthesize() -> SynthesisStream                     │
//! │   - load_single_voice()   - available_voices()          │
//! │   - supports_voice_mixing()                             │
//! ├─────────────────────────────────────────────────────────┤
//! │                 Engine Registry                         │
//! │   ┌──────────┐ ┌──────────┐ ┌──────────────┐           │
//! │   │  Kokoro  │ │  F5-TTS  │ │   Runtime-   │           │
//! │   │          │ │          │ │  registered  │           │
//! │   └──────────┘ └──────────┘ └──────────────┘           │
//! ├─────────────────────────────────────────────────────────┤
//! │                 Pipeline Seams                          │
//! │   KokoroPipeline / ClonePipeline traits, backed by      │
//! │   Python runner processes over a JSON-lines bridge      │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod f5_tts;
pub mod kokoro;
pub mod registry;
pub mod traits;
pub mod voices;

pub use config::{EngineConfig, EngineConfigBuilder};
pub use f5_tts::{ClonePipeline, CloneParams, F5TtsEngine, Reference};
pub use kokoro::{KokoroEngine, KokoroPipeline, PipelineSegment};
pub use registry::{
    create_engine, describe_engine, global_registry, list_available_engines, list_engines,
    EngineEntry, EngineInfo, EngineRegistry,
};
pub use traits::{SynthesisResult, SynthesisStream, TtsBackend, VoiceEmbedding};
pub use voices::{is_catalog_voice, language_description, VoiceFormula, VOICES};
