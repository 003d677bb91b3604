use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use metrics_rpc::{
    Call, CallError, HarnessError, Invocation, LocalTransport, MetricsCounter, MetricsReport,
    MetricsService, Operation, OperationKind, Reply, Transport,
    harness::{self, HarnessConfig},
    in_process,
};

fn service() -> MetricsService {
    MetricsService::new(Arc::new(MetricsCounter::new()))
}

fn config(workers: usize, invocations: usize) -> HarnessConfig {
    HarnessConfig {
        workers,
        invocations,
        think_time: Duration::ZERO,
        ..HarnessConfig::default()
    }
}

/// Fails every echo as if the connection had dropped.
#[derive(Clone)]
struct EchoUnreachable(LocalTransport);

#[async_trait]
impl Transport for EchoUnreachable {
    async fn dispatch(&self, call: Call) -> Result<Reply, CallError> {
        match call {
            Call::Echo(_) => Err(CallError::TransportUnavailable("connection reset".into())),
            other => self.0.dispatch(other).await,
        }
    }
}

/// Rewrites every operation to a kind the service does not support.
#[derive(Clone)]
struct CorruptKind(LocalTransport);

#[async_trait]
impl Transport for CorruptKind {
    async fn dispatch(&self, call: Call) -> Result<Reply, CallError> {
        match call {
            Call::Compute(op) => {
                let corrupted =
                    Operation::new(OperationKind::Unknown(9), op.operand1(), op.operand2());
                self.0.dispatch(Call::Compute(corrupted)).await
            }
            other => self.0.dispatch(other).await,
        }
    }
}

/// Never answers anything.
#[derive(Clone)]
struct Stalled;

#[async_trait]
impl Transport for Stalled {
    async fn dispatch(&self, _call: Call) -> Result<Reply, CallError> {
        std::future::pending().await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn five_workers_three_rounds_over_tarpc() -> Result<(), HarnessError> {
    let report = harness::run(in_process(service()), &config(5, 3)).await?;

    assert_eq!(
        report.metrics,
        MetricsReport {
            time_count: 15,
            echo_count: 15,
            compute_count: 15,
        }
    );
    assert!(report.is_exact());
    assert_eq!(report.failed_calls(), 0);
    assert_eq!(report.outcomes.len(), 5);
    assert!(report.outcomes.iter().all(|o| o.rounds_completed == 3));
    report.verify()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn fifty_workers_with_think_time() -> Result<(), HarnessError> {
    let config = HarnessConfig {
        think_time: Duration::from_millis(1),
        ..config(50, 10)
    };
    let report = harness::run(LocalTransport::new(service()), &config).await?;

    for kind in Invocation::ALL {
        assert_eq!(report.metrics.count(kind), 500, "{kind}");
        assert_eq!(report.answered(kind), 500, "{kind}");
    }
    report.verify()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn outside_callers_only_raise_the_counts() -> Result<(), HarnessError> {
    let service = service();
    for _ in 0..7 {
        service
            .dispatch(Call::Echo("outsider".into()))
            .map_err(CallError::from)?;
    }

    let report = harness::run(LocalTransport::new(service), &config(2, 2)).await?;

    assert_eq!(report.metrics.echo_count, 11);
    assert_eq!(report.metrics.compute_count, 4);
    assert!(!report.is_exact());
    report.verify()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rejected_computes_are_reported_and_counted() -> Result<(), HarnessError> {
    let report = harness::run(CorruptKind(LocalTransport::new(service())), &config(3, 2)).await?;

    assert_eq!(report.metrics.compute_count, 6);
    assert_eq!(report.failed_calls(), 6);
    assert!(report.outcomes.iter().all(|o| o.rounds_completed == 2));
    assert!(report.outcomes.iter().all(|o| {
        o.errors
            .iter()
            .all(|(kind, err)| *kind == Invocation::Compute && matches!(err, CallError::Remote(_)))
    }));
    report.verify()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn lost_transport_ends_each_worker_early() -> Result<(), HarnessError> {
    let report =
        harness::run(EchoUnreachable(LocalTransport::new(service())), &config(4, 3)).await?;

    assert_eq!(report.metrics, MetricsReport::default());
    assert_eq!(report.failed_calls(), 4);
    assert!(report.outcomes.iter().all(|o| o.rounds_completed == 0));
    assert!(!report.is_exact());
    report.verify()
}

#[tokio::test(start_paused = true)]
async fn stalled_workers_hit_the_completion_bound() {
    let config = HarnessConfig {
        completion_timeout: Duration::from_millis(200),
        ..config(3, 1)
    };

    let result = harness::run(Stalled, &config).await;

    match result {
        Err(HarnessError::TimeoutExceeded {
            outstanding,
            waited,
        }) => {
            assert_eq!(outstanding, 3);
            assert_eq!(waited, Duration::from_millis(200));
        }
        other => panic!("expected a timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn invalid_config_is_rejected_before_any_call() {
    let service = service();
    let result = harness::run(LocalTransport::new(service.clone()), &config(3, 0)).await;

    assert!(matches!(result, Err(HarnessError::InvalidConfig(_))));
    assert_eq!(service.metrics().snapshot(), MetricsReport::default());
}
