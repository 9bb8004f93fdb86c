//! Lexgraph Prediction Layer
//!
//! Implementations of the [`ConflictPredictor`] collaborator trait.
//!
//! # Predictors
//!
//! - `MockPredictor`: Deterministic mock for testing
//! - `HttpPredictor`: Client for the external conflict-prediction service
//!
//! Predictions are advisory. The engine passes them through alongside rule
//! findings and never lets them alter a finding.
//!
//! # Examples
//!
//! ```
//! use lexgraph_domain::{CaseId, ConflictPredictor, NodeId, Prediction, PredictionFeatures};
//! use lexgraph_predict::MockPredictor;
//!
//! let prediction = Prediction {
//!     entity_id: NodeId::from_external("p-ann"),
//!     related_case_refs: vec![CaseId::from("case-7")],
//!     relevance: 0.8,
//! };
//! let predictor = MockPredictor::new(vec![prediction.clone()]);
//! let features = PredictionFeatures {
//!     case_id: CaseId::from("case-1"),
//!     version: 1,
//!     nodes: vec![],
//!     edges: vec![],
//! };
//! assert_eq!(predictor.predict(&features).unwrap(), vec![prediction]);
//! ```

#![warn(missing_docs)]

pub mod http;

use lexgraph_domain::{ConflictPredictor, Prediction, PredictionFeatures, UpstreamError};
use std::sync::{Arc, Mutex};
use thiserror::Error;

pub use http::{HttpPredictor, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT_SECS};

/// Errors that can occur during prediction calls
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PredictError {
    /// Network or transport error (connect, timeout, TLS)
    #[error("Communication error: {0}")]
    Communication(String),

    /// The service answered with a non-success status
    #[error("Prediction service returned HTTP {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// The service does not know the case
    #[error("Case not known to prediction service: {0}")]
    CaseNotFound(String),

    /// Invalid response body
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Invalid predictor configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl From<PredictError> for UpstreamError {
    fn from(e: PredictError) -> Self {
        match e {
            PredictError::CaseNotFound(case_id) => UpstreamError::NotFound(case_id),
            other => UpstreamError::Unavailable(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for PredictError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            PredictError::InvalidResponse(e.to_string())
        } else if e.is_builder() {
            PredictError::Configuration(e.to_string())
        } else {
            PredictError::Communication(e.to_string())
        }
    }
}

/// Mock predictor for deterministic testing
///
/// Returns pre-configured predictions without making any network calls.
/// Clones share their configuration and counters.
#[derive(Debug, Clone, Default)]
pub struct MockPredictor {
    predictions: Arc<Mutex<Vec<Prediction>>>,
    failure: Arc<Mutex<Option<PredictError>>>,
    call_count: Arc<Mutex<usize>>,
    last_features: Arc<Mutex<Option<PredictionFeatures>>>,
}

impl MockPredictor {
    /// Create a new MockPredictor returning `predictions` for every call
    pub fn new(predictions: Vec<Prediction>) -> Self {
        Self {
            predictions: Arc::new(Mutex::new(predictions)),
            ..Self::default()
        }
    }

    /// Replace the predictions returned from now on
    pub fn set_predictions(&self, predictions: Vec<Prediction>) {
        *lock(&self.predictions) = predictions;
    }

    /// Make every following call fail with `error`
    pub fn fail_with(&self, error: PredictError) {
        *lock(&self.failure) = Some(error);
    }

    /// Stop failing
    pub fn clear_failure(&self) {
        *lock(&self.failure) = None;
    }

    /// Get the number of times predict was called
    pub fn call_count(&self) -> usize {
        *lock(&self.call_count)
    }

    /// Features passed to the most recent call
    pub fn last_features(&self) -> Option<PredictionFeatures> {
        lock(&self.last_features).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl ConflictPredictor for MockPredictor {
    type Error = PredictError;

    fn predict(&self, features: &PredictionFeatures) -> Result<Vec<Prediction>, Self::Error> {
        *lock(&self.call_count) += 1;
        *lock(&self.last_features) = Some(features.clone());

        if let Some(error) = lock(&self.failure).clone() {
            return Err(error);
        }
        Ok(lock(&self.predictions).clone())
    }
}
