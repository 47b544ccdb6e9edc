use thiserror::Error;

/// Error types for payment processor calls
#[derive(Debug, Error)]
pub(crate) enum ProcessorError {
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// The processor answered with an error envelope.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("processor call timed out")]
    Timeout,
}

impl ProcessorError {
    /// HTTP status reported by the processor, if the call got that far
    pub(crate) fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::HttpRequest(err) => err.status().map(|status| status.as_u16()),
            Self::JsonParse(_) | Self::Timeout => None,
        }
    }
}
