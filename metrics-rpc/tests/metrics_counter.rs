use std::{
    sync::atomic::{AtomicBool, Ordering},
    thread,
};

use metrics_rpc::{Invocation, MetricsCounter};

fn hammer(counter: &MetricsCounter, kind: Invocation, workers: usize, per_worker: u64) {
    thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(move || {
                for _ in 0..per_worker {
                    counter.increment(kind);
                }
            });
        }
    });
}

#[test]
fn concurrent_increments_are_never_lost() {
    for per_worker in [1u64, 10, 1000] {
        for workers in [1usize, 5, 50] {
            let counter = MetricsCounter::new();
            counter.increment(Invocation::Compute);
            let before = counter.get(Invocation::Compute);

            hammer(&counter, Invocation::Compute, workers, per_worker);

            assert_eq!(
                counter.get(Invocation::Compute),
                before + per_worker * workers as u64,
                "per_worker={per_worker} workers={workers}"
            );
        }
    }
}

#[test]
fn kinds_do_not_interfere() {
    let counter = MetricsCounter::new();

    thread::scope(|scope| {
        for kind in Invocation::ALL {
            let counter = &counter;
            scope.spawn(move || hammer(counter, kind, 5, 200));
        }
    });

    let report = counter.snapshot();
    assert_eq!(report.time_count, 1000);
    assert_eq!(report.echo_count, 1000);
    assert_eq!(report.compute_count, 1000);
}

#[test]
fn snapshots_never_go_backwards() {
    let counter = MetricsCounter::new();
    let done = AtomicBool::new(false);

    thread::scope(|scope| {
        let observer = scope.spawn(|| {
            let mut last = counter.snapshot();
            while !done.load(Ordering::Acquire) {
                let next = counter.snapshot();
                for kind in Invocation::ALL {
                    assert!(next.count(kind) >= last.count(kind), "{kind} went backwards");
                }
                last = next;
            }
        });

        for kind in Invocation::ALL {
            hammer(&counter, kind, 8, 500);
        }
        done.store(true, Ordering::Release);
        observer.join().expect("observer thread panicked");
    });

    assert_eq!(counter.get(Invocation::Echo), 4000);
}
