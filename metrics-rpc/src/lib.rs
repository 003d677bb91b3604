//! A tarpc service that answers echo, time and arithmetic calls and counts
//! every invocation, plus a harness that drives it from many concurrent
//! workers and checks the counts add up.

pub mod client;
pub mod compute;
pub mod config;
pub mod error;
pub mod harness;
pub mod logging;
pub mod metrics;
pub mod operation;
pub mod service;
pub mod transport;

pub use client::ServiceClient;
pub use error::{CallError, ComputeError, HarnessError, ServiceError};
pub use metrics::{Invocation, MetricsCounter, MetricsReport};
pub use operation::{Operation, OperationKind};
pub use service::{
    Call, MetricsService, RemoteService, RemoteServiceClient, Reply, SERVICE_NAME,
};
pub use transport::{
    DEFAULT_CONNECT_TIMEOUT, LocalTransport, Transport, bincode_transport, connect, connect_within,
    in_process, serve,
};
