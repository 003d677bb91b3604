use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::{
    error::CallError,
    metrics::MetricsReport,
    operation::Operation,
    service::{Call, Reply},
    transport::Transport,
};

/// Typed view of the remote operations over any [`Transport`].
///
/// Every call is bounded by `call_timeout`. When the bound elapses the caller
/// gets [`CallError::TimeoutExceeded`]; whatever the service already did for
/// that call stands.
#[derive(Clone, Debug)]
pub struct ServiceClient<T> {
    transport: T,
    call_timeout: Duration,
}

impl<T: Transport> ServiceClient<T> {
    pub fn new(transport: T, call_timeout: Duration) -> Self {
        Self {
            transport,
            call_timeout,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Server wall-clock time.
    pub async fn get_time(&self) -> Result<DateTime<Utc>, CallError> {
        match self.call(Call::GetTime).await? {
            Reply::Time(time) => Ok(time),
            other => Err(unexpected("time", &other)),
        }
    }

    /// The message as echoed back behind the server's prefix.
    pub async fn echo(&self, message: &str) -> Result<String, CallError> {
        match self.call(Call::Echo(message.to_string())).await? {
            Reply::Echo(echoed) => Ok(echoed),
            other => Err(unexpected("echo", &other)),
        }
    }

    /// Result of `op`, or [`CallError::Remote`] when the service rejects it.
    pub async fn compute(&self, op: Operation) -> Result<f64, CallError> {
        match self.call(Call::Compute(op)).await? {
            Reply::Computed(value) => Ok(value),
            other => Err(unexpected("computed", &other)),
        }
    }

    /// Current invocation counters. Not itself counted.
    pub async fn get_metrics_report(&self) -> Result<MetricsReport, CallError> {
        match self.call(Call::GetMetricsReport).await? {
            Reply::Metrics(report) => Ok(report),
            other => Err(unexpected("metrics", &other)),
        }
    }

    async fn call(&self, call: Call) -> Result<Reply, CallError> {
        tokio::time::timeout(self.call_timeout, self.transport.dispatch(call))
            .await
            .map_err(|_| CallError::TimeoutExceeded(self.call_timeout))?
    }
}

fn unexpected(expected: &'static str, got: &Reply) -> CallError {
    CallError::UnexpectedReply {
        expected,
        got: got.name(),
    }
}
