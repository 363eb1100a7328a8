//! # BCA Common Library
//!
//! Shared code for the business-case analysis workspace:
//! - Error type (`Error`, `Result`)
//! - TOML configuration model and file resolution
//! - Tracing subscriber initialisation
//! - Analysis progress events (`AnalysisEvent` enum, `EventBus`)

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
