//! # Image Processing
//!
//! Everything the relay does to data locally: normalizing incoming images
//! before dispatch and translating the verification answer afterwards.

pub mod normalizer;
pub mod translator;

// Re-export main types for convenience
pub use normalizer::{ImageNormalizer, NormalizedImage};
pub use translator::{translate, MATCH_THRESHOLD};
