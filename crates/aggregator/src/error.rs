use thiserror::Error;

/// Errors from the client manager (component G).
#[derive(Debug, Error)]
pub enum ClientError {
    /// `connectToServer` called for a name that is already connected.
    #[error("server '{0}' is already connected")]
    AlreadyConnected(String),

    /// The dial itself failed, including a timed-out attempt (transport
    /// error, process spawn failure, or the per-call timeout elapsing).
    #[error("failed to connect to server '{0}': {1}")]
    ConnectFailed(String, #[source] anyhow::Error),
}
