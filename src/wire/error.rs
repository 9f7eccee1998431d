use thiserror::Error;

use crate::array::ArrayError;

/// Errors returned while turning a [`crate::WireRecord`] back into an array.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("expected a record of type \"ndarray\", got {kind:?}")]
    UnexpectedType { kind: String },

    #[error("invalid payload: {reason}")]
    InvalidPayload { reason: String },

    #[error("buffer {id:?} is not available")]
    MissingBuffer { id: String },

    #[error(transparent)]
    Base64(#[from] base64::DecodeError),

    #[error(transparent)]
    Json(#[from] simd_json::Error),

    #[error(transparent)]
    Array(#[from] ArrayError),
}

impl DecodeError {
    pub(crate) fn invalid_payload(reason: impl Into<String>) -> Self {
        DecodeError::InvalidPayload {
            reason: reason.into(),
        }
    }
}
