//! # Outbound Clients
//!
//! Clients for the services the relay depends on. Today that is only the
//! face-verification backend ([`verification`]).

pub mod verification;

// Re-export for convenience
pub use verification::VerificationClient;
