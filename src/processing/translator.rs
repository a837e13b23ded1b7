//! # Result Translation
//!
//! Flattens the verification service's nested answer into the relay's
//! `{similarity, distance, match}` contract.
//!
//! Only the first result and its first face match are considered. The
//! match decision uses the fixed [`MATCH_THRESHOLD`]; the caller's
//! `det_prob_threshold` only tunes the upstream detector.

use serde::Deserialize;
use serde_json::Value;

use crate::common::error::{RelayError, RelayResult};
use crate::common::messages::ComparisonResponse;

/// Similarity (on the 0..1 scale) at or above which two faces are the same person.
pub const MATCH_THRESHOLD: f64 = 0.8;

#[derive(Debug, Deserialize)]
struct VerificationBody {
    result: Vec<VerificationEntry>,
}

#[derive(Debug, Deserialize)]
struct VerificationEntry {
    #[serde(default)]
    face_matches: Vec<FaceMatch>,
}

#[derive(Debug, Deserialize)]
struct FaceMatch {
    #[serde(default)]
    similarity: Option<f64>,
}

/// Translate a raw verification response.
///
/// No face match (or a match without a score) is reported as a plain
/// no-match: similarity 0, distance 100, match false.
///
/// # Errors
/// [`RelayError::MalformedUpstreamResponse`] when `result` is missing, is not
/// a list of objects, or is empty. The raw body is kept for diagnostics.
pub fn translate(raw: &Value) -> RelayResult<ComparisonResponse> {
    let body = VerificationBody::deserialize(raw)
        .map_err(|e| malformed(raw, &e.to_string()))?;

    let first = body
        .result
        .first()
        .ok_or_else(|| malformed(raw, "empty result list"))?;

    let similarity = first.face_matches.first().and_then(|m| m.similarity);

    Ok(match similarity {
        Some(similarity) => ComparisonResponse {
            similarity: percent(similarity),
            distance: percent(1.0 - similarity),
            is_match: similarity >= MATCH_THRESHOLD,
        },
        None => ComparisonResponse {
            similarity: 0.0,
            distance: 100.0,
            is_match: false,
        },
    })
}

/// Scale a 0..1 value to a percentage rounded to two decimals.
fn percent(value: f64) -> f64 {
    (value * 100.0 * 100.0).round() / 100.0
}

fn malformed(raw: &Value, reason: &str) -> RelayError {
    RelayError::MalformedUpstreamResponse(format!("{}: {}", reason, raw))
}
