//! Error types shared by the service, the transports and the client harness.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metrics::Invocation;

/// Failure of the pure compute engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComputeError {
    #[error("unsupported operation: {kind}")]
    UnsupportedOperation { kind: String },
}

/// Application-level failure returned by the service to the caller.
///
/// This type crosses the wire, so it only carries serializable data.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ServiceError {
    #[error("unsupported operation: {kind}")]
    UnsupportedOperation { kind: String },
}

impl From<ComputeError> for ServiceError {
    fn from(err: ComputeError) -> Self {
        match err {
            ComputeError::UnsupportedOperation { kind } => {
                ServiceError::UnsupportedOperation { kind }
            }
        }
    }
}

/// Failure observed by a caller of a single remote operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    /// The service could not be reached, or the connection to it broke.
    #[error("transport unavailable: {0}")]
    TransportUnavailable(String),
    /// No reply arrived in time; carries how long the caller waited.
    #[error("call timed out after {0:?}")]
    TimeoutExceeded(Duration),
    /// The service reported a failure for a call that reached it.
    #[error("remote operation failed: {0}")]
    Remote(#[from] ServiceError),
    /// The transport answered with a reply of the wrong kind.
    #[error("unexpected reply: expected {expected}, got {got}")]
    UnexpectedReply {
        expected: &'static str,
        got: &'static str,
    },
}

impl CallError {
    /// Whether the failure came from the transport rather than the service.
    ///
    /// A timed-out call may still have reached the service and been counted.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            CallError::TransportUnavailable(_) | CallError::TimeoutExceeded(_)
        )
    }
}

/// Failure of a harness run as a whole.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("invalid harness config: {0}")]
    InvalidConfig(String),
    /// Some workers were still running when the completion bound elapsed.
    #[error("{outstanding} worker(s) did not complete within {waited:?}")]
    TimeoutExceeded { outstanding: usize, waited: Duration },
    #[error("worker failed: {0}")]
    WorkerFailed(String),
    #[error("metrics query failed: {0}")]
    Call(#[from] CallError),
    #[error("{kind} count {observed} is below the {expected_at_least} successful calls issued")]
    InconsistentMetrics {
        kind: Invocation,
        observed: u64,
        expected_at_least: u64,
    },
}
