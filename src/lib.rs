//! # face-relay
//!
//! HTTP relay that compares two faces through an external verification
//! service. Incoming base64 images are normalized (auto-orient, strip
//! metadata) with an external tool, sent as one multipart request, and the
//! answer is reshaped into `{similarity, distance, match}`.

pub mod client;
pub mod common;
pub mod logging;
pub mod processing;
pub mod server;

pub use common::config::RelayConfig;
pub use common::error::{RelayError, RelayResult};
pub use server::{ComparisonCore, RelayServer};
