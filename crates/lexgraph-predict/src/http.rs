//! HTTP client for the external conflict-prediction service
//!
//! Sends the snapshot-derived [`PredictionFeatures`] as JSON to
//! `POST {endpoint}/predict` and expects `{"predictions": [...]}` back.
//!
//! # Behavior
//!
//! - Single attempt per call; the engine never retries
//! - Configurable timeout
//! - 404 means the service does not know the case; any other non-2xx status
//!   and every transport error means the service is unavailable
//!
//! The client is blocking. Calls must run on a blocking thread (the engine
//! uses `spawn_blocking`).
//!
//! # Examples
//!
//! ```no_run
//! use lexgraph_predict::HttpPredictor;
//! use std::time::Duration;
//!
//! let predictor = HttpPredictor::new("http://localhost:8090")
//!     .with_timeout(Duration::from_secs(5));
//! ```

use crate::PredictError;
use lexgraph_domain::{ConflictPredictor, Prediction, PredictionFeatures};
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::OnceLock;
use std::time::Duration;

/// Default prediction service endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8090";

/// Default timeout for prediction requests (10 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Response from the prediction service
#[derive(Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

/// Client for the prediction service
pub struct HttpPredictor {
    endpoint: String,
    timeout: Duration,
    // Built on first use so it is created on a blocking thread
    client: OnceLock<reqwest::blocking::Client>,
}

impl HttpPredictor {
    /// Create a new predictor for `endpoint` (e.g. "http://localhost:8090")
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            client: OnceLock::new(),
        }
    }

    /// Create a predictor for [`DEFAULT_ENDPOINT`]
    pub fn default_endpoint() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Service endpoint
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn client(&self) -> Result<&reqwest::blocking::Client, PredictError> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()?;
        Ok(self.client.get_or_init(|| client))
    }
}

impl ConflictPredictor for HttpPredictor {
    type Error = PredictError;

    fn predict(&self, features: &PredictionFeatures) -> Result<Vec<Prediction>, Self::Error> {
        let url = format!("{}/predict", self.endpoint);

        tracing::debug!(
            case_id = %features.case_id,
            version = features.version,
            nodes = features.nodes.len(),
            "Requesting predictions"
        );

        let response = self.client()?.post(&url).json(features).send()?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(PredictError::CaseNotFound(features.case_id.to_string()));
        }
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            tracing::warn!(case_id = %features.case_id, status = status.as_u16(), "Prediction service error");
            return Err(PredictError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body: PredictResponse = response.json()?;
        Ok(body.predictions)
    }
}
