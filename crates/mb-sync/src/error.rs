use mb_gateway::GatewayError;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("queue error: {0}")]
    Queue(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;
