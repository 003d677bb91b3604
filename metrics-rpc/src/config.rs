//! Command-line configuration for the server and client binaries.

use std::{net::SocketAddr, time::Duration};

use clap::Parser;

use crate::{
    harness::HarnessConfig,
    service::{DEFAULT_ECHO_PREFIX, SERVICE_NAME},
    transport::DEFAULT_CONNECT_TIMEOUT,
};

/// Address both sides agree on when none is given.
pub const DEFAULT_ADDR: &str = "127.0.0.1:1099";

#[derive(Clone, Debug, Parser)]
#[command(name = "metrics_server", about = "Serve echo, time, compute and metrics over tarpc")]
pub struct ServerConfig {
    /// Address to listen on.
    #[arg(short, long, default_value = DEFAULT_ADDR)]
    pub addr: SocketAddr,
    /// Name the service is registered under.
    #[arg(long, default_value = SERVICE_NAME)]
    pub service_name: String,
    /// Marker prepended to echoed messages.
    #[arg(long, default_value = DEFAULT_ECHO_PREFIX)]
    pub echo_prefix: String,
}

#[derive(Clone, Debug, Parser)]
#[command(name = "metrics_client", about = "Drive concurrent calls against a metrics server")]
pub struct ClientConfig {
    /// Address of the server.
    #[arg(short, long, default_value = DEFAULT_ADDR)]
    pub addr: SocketAddr,
    /// Name the service is expected to be registered under.
    #[arg(long, default_value = SERVICE_NAME)]
    pub service_name: String,
    /// Number of concurrent workers.
    #[arg(short, long, default_value_t = 5)]
    pub workers: usize,
    /// Rounds issued by each worker.
    #[arg(short, long, default_value_t = 3)]
    pub invocations: usize,
    /// Pause between rounds, in milliseconds.
    #[arg(long, default_value_t = 100)]
    pub think_time_ms: u64,
    /// Bound on connecting and looking up the service, in milliseconds.
    #[arg(long, default_value_t = DEFAULT_CONNECT_TIMEOUT.as_millis() as u64)]
    pub connect_timeout_ms: u64,
    /// Bound on a single call, in milliseconds.
    #[arg(long, default_value_t = 10_000)]
    pub call_timeout_ms: u64,
    /// Bound on the wait for all workers, in milliseconds.
    #[arg(long, default_value_t = 60_000)]
    pub completion_timeout_ms: u64,
}

impl ClientConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn harness(&self) -> HarnessConfig {
        HarnessConfig {
            workers: self.workers,
            invocations: self.invocations,
            think_time: Duration::from_millis(self.think_time_ms),
            call_timeout: Duration::from_millis(self.call_timeout_ms),
            completion_timeout: Duration::from_millis(self.completion_timeout_ms),
        }
    }
}
