use std::sync::Arc;

use chrono::{DateTime, Utc};
use tarpc::context;
use tracing::{debug, info, warn};

use crate::{
    compute::compute,
    error::ServiceError,
    metrics::{Invocation, MetricsCounter, MetricsReport},
    operation::Operation,
};

/// Name the service is registered under unless configured otherwise.
pub const SERVICE_NAME: &str = "RemoteService";

/// Marker prepended to every echoed message.
pub const DEFAULT_ECHO_PREFIX: &str = "Server says: ";

/// Remote operations exposed to clients.
#[tarpc::service]
pub trait RemoteService {
    /// Reports whether this service is registered under `name`. Not metered.
    async fn lookup(name: String) -> bool;
    /// Returns the server's wall-clock time.
    async fn get_time() -> DateTime<Utc>;
    /// Returns `message` behind the server's fixed prefix.
    async fn echo(message: String) -> String;
    /// Evaluates an arithmetic operation.
    async fn compute(op: Operation) -> Result<f64, ServiceError>;
    /// Returns a snapshot of the invocation counters. Not metered.
    async fn get_metrics_report() -> MetricsReport;
}

/// A single metered call, independent of how it travels.
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    GetTime,
    Echo(String),
    Compute(Operation),
    GetMetricsReport,
}

/// Successful result of a [`Call`].
#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    Time(DateTime<Utc>),
    Echo(String),
    Computed(f64),
    Metrics(MetricsReport),
}

impl Reply {
    /// Short variant name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Reply::Time(_) => "time",
            Reply::Echo(_) => "echo",
            Reply::Computed(_) => "computed",
            Reply::Metrics(_) => "metrics",
        }
    }
}

/// Server-side implementation of [`RemoteService`].
///
/// Cloning is cheap and every clone shares the same [`MetricsCounter`], so one
/// instance created at startup can be handed to every connection and request.
#[derive(Clone, Debug)]
pub struct MetricsService {
    name: Arc<str>,
    echo_prefix: Arc<str>,
    metrics: Arc<MetricsCounter>,
}

impl MetricsService {
    pub fn new(metrics: Arc<MetricsCounter>) -> Self {
        Self::with_identity(SERVICE_NAME, DEFAULT_ECHO_PREFIX, metrics)
    }

    pub fn with_identity(name: &str, echo_prefix: &str, metrics: Arc<MetricsCounter>) -> Self {
        Self {
            name: name.into(),
            echo_prefix: echo_prefix.into(),
            metrics,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<MetricsCounter> {
        &self.metrics
    }

    /// Meters and executes one call.
    pub fn dispatch(&self, call: Call) -> Result<Reply, ServiceError> {
        match call {
            Call::GetTime => Ok(Reply::Time(self.serve_time())),
            Call::Echo(message) => Ok(Reply::Echo(self.serve_echo(&message))),
            Call::Compute(op) => self.serve_compute(&op).map(Reply::Computed),
            Call::GetMetricsReport => Ok(Reply::Metrics(self.serve_metrics_report())),
        }
    }

    fn serve_time(&self) -> DateTime<Utc> {
        self.metrics.increment(Invocation::Time);
        info!("get_time invocation received");
        Utc::now()
    }

    fn serve_echo(&self, message: &str) -> String {
        self.metrics.increment(Invocation::Echo);
        info!(text = message, "echo invocation received");
        format!("{}{}", self.echo_prefix, message)
    }

    // Counted before evaluation: a rejected operation is still an invocation.
    fn serve_compute(&self, op: &Operation) -> Result<f64, ServiceError> {
        self.metrics.increment(Invocation::Compute);
        info!(operation = %op, "compute invocation received");
        compute(op).map_err(|err| {
            warn!(operation = %op, %err, "compute rejected");
            ServiceError::from(err)
        })
    }

    fn serve_metrics_report(&self) -> MetricsReport {
        info!("get_metrics_report invocation received");
        self.metrics.snapshot()
    }
}

impl RemoteService for MetricsService {
    async fn lookup(self, _: context::Context, name: String) -> bool {
        let bound = name == *self.name;
        debug!(%name, bound, "lookup received");
        bound
    }

    async fn get_time(self, _: context::Context) -> DateTime<Utc> {
        self.serve_time()
    }

    async fn echo(self, _: context::Context, message: String) -> String {
        self.serve_echo(&message)
    }

    async fn compute(self, _: context::Context, op: Operation) -> Result<f64, ServiceError> {
        self.serve_compute(&op)
    }

    async fn get_metrics_report(self, _: context::Context) -> MetricsReport {
        self.serve_metrics_report()
    }
}
