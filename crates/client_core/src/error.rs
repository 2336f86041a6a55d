use thiserror::Error;

use crate::routing::RouteError;

/// Failure taxonomy for the client. Nothing here is fatal to the
/// process; every variant is recoverable by user action (retry the call,
/// re-select a target, sign in again).
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network-level failure: connect, DNS, timeout, body decode.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-success status. `message` carries
    /// the decoded error payload when one was present.
    #[error("service error ({status}): {message}")]
    Api {
        status: reqwest::StatusCode,
        message: String,
    },

    /// A send was attempted without a resolvable target.
    #[error(transparent)]
    Route(#[from] RouteError),

    #[error("invalid server url: {0}")]
    InvalidServerUrl(String),
}

impl ClientError {
    /// Whether the session credential was rejected and the user needs to
    /// authenticate again.
    pub fn requires_reauth(&self) -> bool {
        matches!(
            self,
            ClientError::Api { status, .. }
                if *status == reqwest::StatusCode::UNAUTHORIZED
                    || *status == reqwest::StatusCode::FORBIDDEN
        )
    }
}
