use thiserror::Error;

#[derive(Error, Debug)]
pub enum IpcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network client not running")]
    ProcessNotRunning,

    #[error("Failed to spawn network client: {0}")]
    SpawnFailed(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Channel closed")]
    ChannelClosed,

    #[error("Timed out waiting for {0} result")]
    Timeout(&'static str),

    #[error("Network client rejected command: {0}")]
    CommandFailed(String),

    #[error("Invalid response from network client: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, IpcError>;
