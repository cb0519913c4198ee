use thiserror::Error;

/// Failure taxonomy shared by every layer of the booking assistant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookingError {
    /// Missing or invalid startup configuration. Fatal before serving.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The calendar gateway was never initialized.
    #[error("{0}")]
    ServiceUnavailable(String),
    /// Unparseable timestamp, timezone or otherwise invalid caller input.
    #[error("{0}")]
    MalformedInput(String),
    /// A remote dependency answered with a non-success status.
    #[error("remote error {status}: {message}")]
    Remote { status: u16, message: String },
    /// A remote dependency could not be reached or timed out.
    #[error("transport error: {0}")]
    Transport(String),
    /// Unexpected fault inside the planner loop.
    #[error("planner fault: {0}")]
    Planner(String),
}

impl BookingError {
    pub fn label(&self) -> &'static str {
        match self {
            BookingError::Configuration(_) => "configuration",
            BookingError::ServiceUnavailable(_) => "service_unavailable",
            BookingError::MalformedInput(_) => "malformed_input",
            BookingError::Remote { .. } => "remote",
            BookingError::Transport(_) => "transport",
            BookingError::Planner(_) => "planner",
        }
    }

    pub fn calendar_uninitialized() -> Self {
        BookingError::ServiceUnavailable(
            "Calendar service not initialized. Check service account key path.".to_string(),
        )
    }
}

impl From<reqwest::Error> for BookingError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => BookingError::Remote {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => BookingError::Transport(err.to_string()),
        }
    }
}
