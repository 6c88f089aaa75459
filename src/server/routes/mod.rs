//! Route handlers, one module per API area.

pub mod convert;
pub mod engines;
pub mod health;
pub mod jobs;
pub mod profiles;
pub mod upload;
pub mod voices;
pub mod ws;
