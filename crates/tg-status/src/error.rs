use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatusError {
    #[error("failed to serialize node config for MD5: {0}")]
    ConfigSerializationFailed(#[from] serde_json::Error),
}
