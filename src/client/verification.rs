//! # Verification Client
//!
//! Thin client for the face-verification service (CompreFace
//! `/api/v1/verification/verify`).
//!
//! ## Request
//!
//! One multipart `POST` per comparison:
//! - part `source_image`: first normalized JPEG
//! - part `target_image`: second normalized JPEG
//! - header `x-api-key`
//! - query `limit`, `prediction_count`, `det_prob_threshold`, `face_plugins`, `status`
//!
//! The multipart content type and boundary are left to reqwest.

use log::{debug, error};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

use crate::common::config::VerificationSettings;
use crate::common::error::{RelayError, RelayResult};
use crate::common::messages::VerificationParams;
use crate::processing::NormalizedImage;

/// Client for the verification endpoint, built once at start-up.
#[derive(Debug, Clone)]
pub struct VerificationClient {
    http: reqwest::Client,
    url: String,
    api_key: String,
}

impl VerificationClient {
    pub fn new(settings: &VerificationSettings) -> RelayResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| RelayError::UpstreamUnavailable(e.to_string()))?;

        Ok(Self {
            http,
            url: settings.url.clone(),
            api_key: settings.api_key.clone(),
        })
    }

    /// Send both images for verification and return the decoded JSON body.
    ///
    /// The images are read fully before the request is built, so no file
    /// handle is open by the time the caller deletes them.
    ///
    /// # Errors
    /// - [`RelayError::Internal`] if an image cannot be read back
    /// - [`RelayError::UpstreamUnavailable`] on connection failures or timeouts
    /// - [`RelayError::Upstream`] on any status other than 200
    /// - [`RelayError::MalformedUpstreamResponse`] if a 200 body is not JSON
    pub async fn verify(
        &self,
        source: &NormalizedImage,
        target: &NormalizedImage,
        params: &VerificationParams,
    ) -> RelayResult<Value> {
        let form = Form::new()
            .part(
                "source_image",
                image_part(source.path(), source.file_name()).await?,
            )
            .part(
                "target_image",
                image_part(target.path(), target.file_name()).await?,
            );

        debug!("Dispatching verification to {} with {:?}", self.url, params);

        let response = self
            .http
            .post(&self.url)
            .header("x-api-key", &self.api_key)
            .query(params)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                error!("Verification request to {} failed: {}", self.url, e);
                RelayError::UpstreamUnavailable(e.to_string())
            })?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| RelayError::UpstreamUnavailable(e.to_string()))?;

        if status != 200 {
            error!("Verification service answered {}: {}", status, text);
            return Err(RelayError::Upstream { status, body: text });
        }

        serde_json::from_str(&text).map_err(|e| {
            RelayError::MalformedUpstreamResponse(format!("body is not JSON ({}): {}", e, text))
        })
    }
}

async fn image_part(path: &Path, file_name: String) -> RelayResult<Part> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| RelayError::Internal(format!("cannot read {}: {}", path.display(), e)))?;

    Part::bytes(bytes)
        .file_name(file_name)
        .mime_str("image/jpeg")
        .map_err(|e| RelayError::Internal(e.to_string()))
}
