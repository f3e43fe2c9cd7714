use thiserror::Error;

/// Errors returned by the Replicate HTTP API
#[derive(Debug, Error)]
pub enum ReplicateApiError {
    #[error("Authentication error (401): {message}")]
    Authentication { message: String },

    #[error("Payment required (402): {message}")]
    PaymentRequired { message: String },

    #[error("Not found (404): {message}")]
    NotFound { message: String },

    #[error("Invalid input (422): {message}")]
    InvalidInput { message: String },

    #[error("Rate limit exceeded (429): {message}")]
    RateLimit { message: String },

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Catch-all for unexpected status codes
    #[error("Unexpected API error ({status}): {message}")]
    Unexpected { status: u16, message: String },

    #[error("Prediction {id} {status}: {message}")]
    PredictionFailed {
        id: String,
        status: String,
        message: String,
    },
}

impl ReplicateApiError {
    /// Classifies a non-success response. Replicate puts a human readable
    /// message into the `detail` field of its JSON error bodies.
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v["detail"].as_str().map(str::to_string))
            .unwrap_or_else(|| body.to_string());

        match status {
            401 => Self::Authentication { message },
            402 => Self::PaymentRequired { message },
            404 => Self::NotFound { message },
            422 => Self::InvalidInput { message },
            429 => Self::RateLimit { message },
            500..=599 => Self::Server { status, message },
            status => Self::Unexpected { status, message },
        }
    }
}
