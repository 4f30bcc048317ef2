//! Error taxonomy surfaced by the configuration refresher.
//!
//! Nothing in this crate retries on its own: every variant reaches whichever
//! caller invoked `update()`, and the previously cached configuration stays
//! in place so the host can keep serving it.

use crate::client::ClientError;

/// Errors returned by [`crate::ConfigRefresher`] and its helpers.
#[derive(Debug, thiserror::Error)]
pub enum RefresherError {
    /// Construction parameters were rejected before any network call.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The configuration service call failed (validation, auth, network).
    #[error("configuration service request failed: {0}")]
    Transport(#[from] ClientError),

    /// The payload could not be parsed according to its declared content type.
    #[error("unable to decode {content_type} configuration: {message}")]
    Decode {
        content_type: String,
        message: String,
    },

    /// The payload needs a decoder this build does not provide.
    #[error("missing decoder: {0}")]
    MissingDependency(String),
}

impl RefresherError {
    /// Returns `true` for payload parse failures.
    pub fn is_decode(&self) -> bool {
        matches!(self, RefresherError::Decode { .. })
    }

    /// Returns `true` when the error came from the remote service call.
    pub fn is_transport(&self) -> bool {
        matches!(self, RefresherError::Transport(_))
    }
}
