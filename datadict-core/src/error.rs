use thiserror::Error;

use crate::gateway::GatewayError;

/// Every way a relay request can fail. Each kind maps to exactly one HTTP
/// status; the `Display` text is the `detail` sent back to the caller.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("API Key not configured")]
    Configuration,

    #[error("No response from AI")]
    UpstreamEmptyResponse,

    #[error("{0}")]
    UpstreamCallFailure(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("{0}")]
    MalformedCallerInput(String),
}

impl RelayError {
    pub fn status_code(&self) -> u16 {
        match self {
            RelayError::Configuration => 500,
            RelayError::UpstreamEmptyResponse => 500,
            RelayError::UpstreamCallFailure(_) => 500,
            RelayError::MalformedCallerInput(_) => 400,
        }
    }

    /// Stable machine-readable name, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::Configuration => "configuration",
            RelayError::UpstreamEmptyResponse => "upstream_empty_response",
            RelayError::UpstreamCallFailure(_) => "upstream_call_failure",
            RelayError::MalformedCallerInput(_) => "malformed_caller_input",
        }
    }

    pub fn detail(&self) -> String {
        self.to_string()
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        RelayError::MalformedCallerInput(msg.into())
    }
}

impl From<GatewayError> for RelayError {
    fn from(e: GatewayError) -> Self {
        RelayError::UpstreamCallFailure(Box::new(e))
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(e: serde_json::Error) -> Self {
        RelayError::UpstreamCallFailure(Box::new(e))
    }
}
