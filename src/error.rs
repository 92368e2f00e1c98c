use crate::client::ClientError;
use std::io;

/// Errors surfaced to the host by the bridge.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The requested remote object does not exist.
    #[error("object at container={container} key={key} does not exist")]
    NotFound { container: String, key: String },

    /// Setting up or performing a transfer failed.
    #[error("transfer failed for container={container} key={key}: {source}")]
    TransferFailure {
        container: String,
        key: String,
        #[source]
        source: TransferCause,
    },

    /// Closing an upload stream during session teardown failed.
    #[error("failed to close upload stream: {source}")]
    ConnectionFailure {
        #[source]
        source: io::Error,
    },
}

/// Underlying cause of a [`BridgeError::TransferFailure`].
#[derive(Debug, thiserror::Error)]
pub enum TransferCause {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("pipe setup: {0}")]
    Pipe(#[from] io::Error),
}

impl BridgeError {
    pub(crate) fn transfer(
        container: &str,
        key: &str,
        source: impl Into<TransferCause>,
    ) -> Self {
        Self::TransferFailure {
            container: container.to_string(),
            key: key.to_string(),
            source: source.into(),
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result alias for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;
