//! # Server Core - Face Comparison Pipeline
//!
//! The core server component is responsible for ONE thing: turning a
//! [`ComparisonRequest`] into a [`ComparisonResponse`]. It validates the
//! request, normalizes both images, calls the verification service and
//! translates the answer.
//!
//! HTTP concerns (routing, JSON extraction, status codes, access logging)
//! are handled by the [`middleware`](super::middleware) layer.
//!
//! ## Temp file lifetime
//!
//! Every normalized image is a [`NormalizedImage`] guard owned by the
//! running [`ComparisonCore::compare`] call. Whichever stage fails, and
//! even if the request future is dropped, the guards go out of scope and
//! their files are removed before the caller sees a result.

use log::{error, info, warn};
use uuid::Uuid;

use crate::client::VerificationClient;
use crate::common::config::RelayConfig;
use crate::common::error::{RelayError, RelayResult};
use crate::common::messages::{ComparisonRequest, ComparisonResponse};
use crate::processing::{translate, ImageNormalizer, NormalizedImage};

pub const MISSING_IMAGES: &str = "Both image1 and image2 fields are required in JSON";

/// Core component that runs one comparison end to end.
#[derive(Debug, Clone)]
pub struct ComparisonCore {
    normalizer: ImageNormalizer,
    verifier: VerificationClient,
}

impl ComparisonCore {
    pub fn new(normalizer: ImageNormalizer, verifier: VerificationClient) -> Self {
        Self {
            normalizer,
            verifier,
        }
    }

    /// Build the core from the relay configuration.
    pub fn from_config(config: &RelayConfig) -> RelayResult<Self> {
        let normalizer = ImageNormalizer::new(&config.normalizer, config.temp_dir());
        let verifier = VerificationClient::new(&config.verification)?;
        Ok(Self::new(normalizer, verifier))
    }

    /// Compare the two faces in `request`.
    ///
    /// Stages run as: validate → normalize both images → verify → translate.
    /// The two normalizations are independent and run concurrently. There
    /// are no retries; the first failure is returned.
    ///
    /// # Errors
    /// Any [`RelayError`]; see its variants for the stage each one comes from.
    pub async fn compare(&self, request: ComparisonRequest) -> RelayResult<ComparisonResponse> {
        let (image1, image2) = required_images(&request)?;

        let request_id = Uuid::new_v4().simple().to_string();
        let source_tag = format!("source_{}", request_id);
        let target_tag = format!("target_{}", request_id);

        info!(
            "📷 Comparison {} received ({} + {} base64 chars)",
            request_id,
            image1.len(),
            image2.len()
        );

        // If either side fails, the other side's guard is dropped with the join.
        let (source, target) = tokio::try_join!(
            self.normalizer.normalize(image1, &source_tag),
            self.normalizer.normalize(image2, &target_tag),
        )?;

        let reply = self
            .verifier
            .verify(&source, &target, &request.params())
            .await;

        release(source, &request_id);
        release(target, &request_id);

        let reply = reply?;
        let response = translate(&reply).map_err(|e| {
            error!("Comparison {} got an unusable answer: {}", request_id, e);
            e
        })?;

        info!(
            "✅ Comparison {} done: similarity={} distance={} match={}",
            request_id, response.similarity, response.distance, response.is_match
        );

        Ok(response)
    }
}

fn present(image: &Option<String>) -> Option<&str> {
    image.as_deref().filter(|value| !value.trim().is_empty())
}

fn required_images(request: &ComparisonRequest) -> RelayResult<(&str, &str)> {
    match (present(&request.image1), present(&request.image2)) {
        (Some(image1), Some(image2)) => Ok((image1, image2)),
        _ => Err(RelayError::invalid_input(MISSING_IMAGES)),
    }
}

/// Delete a normalized image now; a failure here is logged, never fatal.
fn release(image: NormalizedImage, request_id: &str) {
    let path = image.path().to_path_buf();
    if let Err(e) = image.close() {
        warn!(
            "Comparison {} could not remove {}: {}",
            request_id,
            path.display(),
            e
        );
    }
}
