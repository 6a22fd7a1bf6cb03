#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx response. The raw body is kept for diagnostics but never
    /// parsed into a structured error shape.
    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: u16,
        body: String,
    },
}

impl GatewayError {
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Status { status, .. } => Some(*status),
            GatewayError::Transport(_) => None,
        }
    }
}
