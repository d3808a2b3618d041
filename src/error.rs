// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Error taxonomy for uploader operations.
//!
//! Every failed action surfaces as exactly one [`UplinkError`]; the worker
//! translates it into a single `caught_exception` event and carries on. No
//! error ever terminates the worker.

use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum UplinkError {
    /// An upload or query action arrived before any `Settings` action.
    #[error("uploader is not initialised")]
    NotInitialised,

    /// Caller input violated a document constraint.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The merge-upload loop exhausted its retry budget.
    #[error("document conflict persisted after {attempts} write attempts")]
    Collision { attempts: u32 },

    /// The remote document already holds a receiver entry for this callsign
    /// that the active merge policy refuses to replace. The default policy
    /// overwrites our own entry, so this is only raised by stricter policies.
    #[error("remote receiver entry for this callsign was not merged")]
    UnmergedDocument,

    /// I/O, TLS or timeout failure talking to the database.
    #[error("transport error: {0}")]
    Transport(String),

    /// The database answered with a non-conflict error status.
    #[error("HTTP error status {status}")]
    Http { status: u16 },

    /// Anything that does not fit the kinds above.
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl UplinkError {
    /// Stable tag for this error, as delivered to
    /// [`EventSink::caught_exception`](crate::events::EventSink::caught_exception).
    ///
    /// `NotInitialisedError` is delivered with that exact casing; every
    /// other kind is a snake_case label.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotInitialised => "NotInitialisedError",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Collision { .. } => "collision_error",
            Self::UnmergedDocument => "unmerged_document",
            Self::Transport(_) => "transport_error",
            Self::Http { .. } => "http_error",
            Self::Unexpected(_) => "unexpected_error",
        }
    }
}

impl From<StoreError> for UplinkError {
    fn from(err: StoreError) -> Self {
        match err {
            // A conflict that escapes the merge loop means the loop logic is
            // wrong, not the caller's input.
            StoreError::Conflict => Self::Unexpected("unresolved document conflict".to_string()),
            StoreError::Transport(msg) => Self::Transport(msg),
            StoreError::Http { status } => Self::Http { status },
            StoreError::Decode(msg) => Self::Unexpected(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags_are_stable() {
        assert_eq!(UplinkError::NotInitialised.kind(), "NotInitialisedError");
        assert_eq!(
            UplinkError::InvalidArgument("x".into()).kind(),
            "invalid_argument"
        );
        assert_eq!(UplinkError::Collision { attempts: 5 }.kind(), "collision_error");
        assert_eq!(UplinkError::UnmergedDocument.kind(), "unmerged_document");
        assert_eq!(UplinkError::Transport("io".into()).kind(), "transport_error");
        assert_eq!(UplinkError::Http { status: 500 }.kind(), "http_error");
        assert_eq!(UplinkError::Unexpected("?".into()).kind(), "unexpected_error");
    }

    #[test]
    fn test_store_error_classification() {
        let e: UplinkError = StoreError::Transport("connection refused".into()).into();
        assert_eq!(e.kind(), "transport_error");

        let e: UplinkError = StoreError::Http { status: 500 }.into();
        assert_eq!(e.kind(), "http_error");

        let e: UplinkError = StoreError::Conflict.into();
        assert_eq!(e.kind(), "unexpected_error");
    }

    #[test]
    fn test_display_messages() {
        let e = UplinkError::Collision { attempts: 20 };
        assert_eq!(
            e.to_string(),
            "document conflict persisted after 20 write attempts"
        );
        let e = UplinkError::Http { status: 404 };
        assert_eq!(e.to_string(), "HTTP error status 404");
    }
}
