//! # Configuration
//!
//! The relay is configured once at start-up. Values come from, in order of
//! precedence:
//!
//! 1. Command-line overrides applied by the binary (`--bind`)
//! 2. Environment variables (`COMPRE_FACE_URL`, `COMPRE_FACE_API_KEY`, `FACE_RELAY_BIND`)
//! 3. An optional TOML file
//! 4. Built-in defaults suitable for local development
//!
//! # Example TOML
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:5000"
//! max_body_bytes = 20971520
//!
//! [verification]
//! url = "http://localhost:8000/api/v1/verification/verify"
//! api_key = "00000000-0000-0000-0000-000000000000"
//! timeout_secs = 30
//!
//! [normalizer]
//! program = "convert"
//! args = ["{input}", "-auto-orient", "-strip", "{output}"]
//! timeout_secs = 30
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_BIND: &str = "0.0.0.0:5000";
pub const DEFAULT_VERIFICATION_URL: &str = "http://localhost:8000/api/v1/verification/verify";
pub const DEFAULT_API_KEY: &str = "95b5a075-85fb-4027-ba71-c577687b2a23";

/// Placeholder replaced with the decoded source image path.
pub const INPUT_PLACEHOLDER: &str = "{input}";
/// Placeholder replaced with the normalized output path.
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Load a TOML configuration file and deserialize it into the specified type.
///
/// # Example
/// ```ignore
/// let config: RelayConfig = load_config("config/relay.toml")?;
/// ```
pub fn load_config<T>(path: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    let content = fs::read_to_string(path)?;
    let config: T = toml::from_str(&content)?;
    Ok(config)
}

/// Complete relay configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub server: ServerSettings,
    pub verification: VerificationSettings,
    pub normalizer: NormalizerSettings,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Socket address to listen on (e.g., "0.0.0.0:5000")
    pub bind: String,
    /// Largest accepted request body. Two base64 photos easily exceed axum's 2MB default.
    pub max_body_bytes: usize,
    /// Attach a permissive CORS layer for browser callers
    pub permissive_cors: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            max_body_bytes: 20 * 1024 * 1024,
            permissive_cors: false,
        }
    }
}

/// Where and how to reach the face-verification service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationSettings {
    /// Full URL of the verification endpoint
    pub url: String,
    /// Value sent in the `x-api-key` header
    pub api_key: String,
    /// Upper bound on one outbound call, in seconds
    pub timeout_secs: u64,
}

impl Default for VerificationSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_VERIFICATION_URL.to_string(),
            api_key: DEFAULT_API_KEY.to_string(),
            timeout_secs: 30,
        }
    }
}

/// External normalization tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerSettings {
    /// Executable to run (ImageMagick `convert` by default)
    pub program: String,
    /// Argument template; `{input}` and `{output}` are substituted per call
    pub args: Vec<String>,
    /// Upper bound on one tool run, in seconds
    pub timeout_secs: u64,
    /// Directory for temporary images. Defaults to the OS temp dir.
    pub temp_dir: Option<PathBuf>,
}

impl Default for NormalizerSettings {
    fn default() -> Self {
        Self {
            program: "convert".to_string(),
            args: vec![
                INPUT_PLACEHOLDER.to_string(),
                "-auto-orient".to_string(),
                "-strip".to_string(),
                OUTPUT_PLACEHOLDER.to_string(),
            ],
            timeout_secs: 30,
            temp_dir: None,
        }
    }
}

impl RelayConfig {
    /// Build the configuration from an optional TOML file, then apply
    /// environment overrides.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(path) => load_config(path)?,
            None => RelayConfig::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from a variable lookup. Empty values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = lookup("COMPRE_FACE_URL") {
            self.verification.url = url;
        }
        if let Some(key) = lookup("COMPRE_FACE_API_KEY") {
            self.verification.api_key = key;
        }
        if let Some(bind) = lookup("FACE_RELAY_BIND") {
            self.server.bind = bind;
        }
    }

    /// Directory used for temporary images.
    pub fn temp_dir(&self) -> PathBuf {
        self.normalizer
            .temp_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}
