// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Routing errors the relay can surface to a caller. Never crash the relay —
/// every variant maps to a synchronous `tonic::Status` returned to the RPC
/// caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RelayError {
    #[error("duplicate-connection-id")]
    DuplicateConnectionId,
    #[error("no-backend-for-domain")]
    NoBackendForDomain,
    #[error("no-pending-request")]
    NoPendingRequest,
    #[error("no-pending-ws-connect")]
    NoPendingWsConnect,
    #[error("backend-disconnected")]
    BackendDisconnected,
    #[error("response-timed-out")]
    ResponseTimedOut,
    #[error("superseded")]
    Superseded,
}

impl RelayError {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DuplicateConnectionId => "duplicate-connection-id",
            Self::NoBackendForDomain => "no-backend-for-domain",
            Self::NoPendingRequest => "no-pending-request",
            Self::NoPendingWsConnect => "no-pending-ws-connect",
            Self::BackendDisconnected => "backend-disconnected",
            Self::ResponseTimedOut => "response-timed-out",
            Self::Superseded => "superseded",
        }
    }

    /// Convert this error into a [`tonic::Status`] carrying the matching code.
    pub fn to_status(self) -> tonic::Status {
        let code = match self {
            Self::DuplicateConnectionId => tonic::Code::AlreadyExists,
            Self::NoBackendForDomain => tonic::Code::NotFound,
            Self::NoPendingRequest => tonic::Code::FailedPrecondition,
            Self::NoPendingWsConnect => tonic::Code::FailedPrecondition,
            Self::BackendDisconnected => tonic::Code::Unavailable,
            Self::ResponseTimedOut => tonic::Code::DeadlineExceeded,
            Self::Superseded => tonic::Code::Aborted,
        };
        tonic::Status::new(code, self.as_str())
    }
}
