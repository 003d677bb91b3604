use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use serde::{Deserialize, Serialize};

/// Metered remote operation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Invocation {
    Time,
    Echo,
    Compute,
}

impl Invocation {
    pub const ALL: [Invocation; 3] = [Invocation::Time, Invocation::Echo, Invocation::Compute];

    pub fn as_str(self) -> &'static str {
        match self {
            Invocation::Time => "get_time",
            Invocation::Echo => "echo",
            Invocation::Compute => "compute",
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-operation invocation tally shared by every call handler.
///
/// Counters only move forward; there is no reset.
#[derive(Debug, Default)]
pub struct MetricsCounter {
    time: AtomicU64,
    echo: AtomicU64,
    compute: AtomicU64,
}

impl MetricsCounter {
    /// All counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one invocation of `kind`.
    pub fn increment(&self, kind: Invocation) {
        self.slot(kind).fetch_add(1, Ordering::AcqRel);
    }

    /// Current count for `kind`.
    pub fn get(&self, kind: Invocation) -> u64 {
        self.slot(kind).load(Ordering::Acquire)
    }

    /// Point-in-time copy of all three counters.
    ///
    /// Each value is read independently, so a snapshot taken while calls are
    /// in flight may mix counters from slightly different instants.
    pub fn snapshot(&self) -> MetricsReport {
        MetricsReport {
            time_count: self.get(Invocation::Time),
            echo_count: self.get(Invocation::Echo),
            compute_count: self.get(Invocation::Compute),
        }
    }

    fn slot(&self, kind: Invocation) -> &AtomicU64 {
        match kind {
            Invocation::Time => &self.time,
            Invocation::Echo => &self.echo,
            Invocation::Compute => &self.compute,
        }
    }
}

/// Snapshot of the service's invocation counters.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub time_count: u64,
    pub echo_count: u64,
    pub compute_count: u64,
}

impl MetricsReport {
    /// Count captured for `kind`.
    pub fn count(&self, kind: Invocation) -> u64 {
        match kind {
            Invocation::Time => self.time_count,
            Invocation::Echo => self.echo_count,
            Invocation::Compute => self.compute_count,
        }
    }
}

impl fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Metrics Report ---")?;
        writeln!(f, "get_time() invocations: {}", self.time_count)?;
        writeln!(f, "echo() invocations: {}", self.echo_count)?;
        writeln!(f, "compute() invocations: {}", self.compute_count)?;
        write!(f, "----------------------")
    }
}
