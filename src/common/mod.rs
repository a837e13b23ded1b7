//! # Common Components
//!
//! Shared building blocks used by the processing, client and server layers.
//!
//! ## Modules
//!
//! - [`config`]: Relay configuration (TOML file, environment overrides, defaults)
//! - [`error`]: Error taxonomy and its HTTP mapping
//! - [`messages`]: Request/response bodies and verification parameters

pub mod config;
pub mod error;
pub mod messages;
