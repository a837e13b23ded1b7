//! # Message Types
//!
//! JSON bodies exchanged with relay callers, plus the query parameters
//! forwarded to the verification service.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_LIMIT: &str = "1";
pub const DEFAULT_PREDICTION_COUNT: &str = "1";
pub const DEFAULT_DET_PROB_THRESHOLD: &str = "0.8";

/// Body of `POST /compare-faces`.
///
/// Only the two images are required; every other field falls back to the
/// defaults in [`VerificationParams`]. Overrides are forwarded as query
/// strings, so each one may arrive as a JSON string, number or boolean.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComparisonRequest {
    /// Base64-encoded source image
    #[serde(default)]
    pub image1: Option<String>,
    /// Base64-encoded target image
    #[serde(default)]
    pub image2: Option<String>,
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub limit: Option<String>,
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub prediction_count: Option<String>,
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub det_prob_threshold: Option<String>,
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub face_plugins: Option<String>,
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub status: Option<String>,
}

impl ComparisonRequest {
    /// Resolve the caller's overrides against the defaults.
    pub fn params(&self) -> VerificationParams {
        VerificationParams {
            limit: or_default(&self.limit, DEFAULT_LIMIT),
            prediction_count: or_default(&self.prediction_count, DEFAULT_PREDICTION_COUNT),
            det_prob_threshold: or_default(&self.det_prob_threshold, DEFAULT_DET_PROB_THRESHOLD),
            face_plugins: self.face_plugins.clone().unwrap_or_default(),
            status: self.status.clone().unwrap_or_default(),
        }
    }
}

/// Query parameters sent with every verification call.
///
/// `det_prob_threshold` only tunes the upstream face detector; it has no
/// influence on the match decision made by the translator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationParams {
    pub limit: String,
    pub prediction_count: String,
    pub det_prob_threshold: String,
    pub face_plugins: String,
    pub status: String,
}

impl Default for VerificationParams {
    fn default() -> Self {
        ComparisonRequest::default().params()
    }
}

/// Successful comparison, scaled to percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResponse {
    /// Similarity in [0, 100], two decimals
    pub similarity: f64,
    /// `100 - similarity`, two decimals
    pub distance: f64,
    #[serde(rename = "match")]
    pub is_match: bool,
}

/// Error body returned for every failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

fn or_default(value: &Option<String>, default: &str) -> String {
    value.clone().unwrap_or_else(|| default.to_string())
}

/// Accept a JSON string, boolean or number and keep its string form.
///
/// Every override ends up in the query string, so `"limit": 2`,
/// `"limit": "2"` and `"status": true` are all taken as given.
fn scalar_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "expected a string, boolean or number, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn omitted_params_use_defaults() {
        let request: ComparisonRequest =
            serde_json::from_value(json!({"image1": "a", "image2": "b"})).unwrap();

        assert_eq!(
            request.params(),
            VerificationParams {
                limit: "1".to_string(),
                prediction_count: "1".to_string(),
                det_prob_threshold: "0.8".to_string(),
                face_plugins: String::new(),
                status: String::new(),
            }
        );
    }

    #[test]
    fn overrides_are_kept() {
        let request: ComparisonRequest = serde_json::from_value(json!({
            "image1": "a",
            "image2": "b",
            "limit": 3,
            "prediction_count": 2,
            "det_prob_threshold": 0.5,
            "face_plugins": "age,gender",
            "status": true
        }))
        .unwrap();

        let params = request.params();
        assert_eq!(params.limit, "3");
        assert_eq!(params.prediction_count, "2");
        assert_eq!(params.det_prob_threshold, "0.5");
        assert_eq!(params.face_plugins, "age,gender");
        assert_eq!(params.status, "true");
    }

    #[test]
    fn numeric_overrides_may_be_strings() {
        let request: ComparisonRequest = serde_json::from_value(json!({
            "image1": "a",
            "image2": "b",
            "limit": "2",
            "prediction_count": "4",
            "det_prob_threshold": "0.5"
        }))
        .unwrap();

        let params = request.params();
        assert_eq!(params.limit, "2");
        assert_eq!(params.prediction_count, "4");
        assert_eq!(params.det_prob_threshold, "0.5");
    }

    #[test]
    fn null_overrides_fall_back_to_defaults() {
        let request: ComparisonRequest = serde_json::from_value(json!({
            "image1": "a",
            "image2": "b",
            "limit": null,
            "status": null
        }))
        .unwrap();

        assert_eq!(request.params(), VerificationParams::default());
    }

    #[test]
    fn structured_status_is_rejected() {
        let result = serde_json::from_value::<ComparisonRequest>(json!({
            "image1": "a",
            "image2": "b",
            "status": ["x"]
        }));
        assert!(result.is_err());
    }

    #[test]
    fn response_serializes_match_keyword() {
        let body = serde_json::to_value(ComparisonResponse {
            similarity: 91.25,
            distance: 8.75,
            is_match: true,
        })
        .unwrap();

        assert_eq!(
            body,
            json!({"similarity": 91.25, "distance": 8.75, "match": true})
        );
    }

    #[test]
    fn error_body_omits_empty_details() {
        let body = serde_json::to_value(ErrorBody {
            error: "Both image1 and image2 fields are required in JSON".to_string(),
            details: None,
        })
        .unwrap();

        assert_eq!(
            body,
            json!({"error": "Both image1 and image2 fields are required in JSON"})
        );
    }
}
