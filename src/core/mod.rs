//! Core types shared across the synthesis layer
//!
//! # Modules
//!
//! - `error`: Structured error handling for the registry, adapters, and streams

pub mod error;

pub use error::{AudioOperation, BoxedCause, Result, ResultExt, TtsError};
