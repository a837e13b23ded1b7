//! # Server Components
//!
//! ## Core ([`server`])
//! Runs one comparison: validate, normalize, verify, translate.
//!
//! ## Middleware ([`middleware`])
//! The HTTP surface around the core: routing, JSON extraction, error
//! bodies, access logging and graceful shutdown.

pub mod middleware;
pub mod server;

pub use middleware::{router, RelayServer};
pub use server::ComparisonCore;
