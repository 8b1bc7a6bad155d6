//! Response body types.

use serde::Serialize;

/// Successful prediction body: the decided class plus the probability rows,
/// one row per input sample (always one here).
#[derive(Debug, Clone, Serialize)]
pub struct PredictionResponse {
    pub prediction: i64,
    pub probability: Vec<Vec<f32>>,
}

/// `{"error": ...}` wrapper shared by the 400 (field error map) and 500
/// (opaque string) bodies.
#[derive(Debug, Serialize)]
pub struct ErrorResponse<T: Serialize> {
    pub error: T,
}
