use std::process::ExitCode;

use clap::Parser;
use metrics_rpc::{
    HarnessError, config::ClientConfig, connect_within,
    harness::{self, HarnessReport},
    logging,
};
use tracing::{error, info, warn};

// sysexits
const EXIT_USAGE: u8 = 64;
const EXIT_UNAVAILABLE: u8 = 69;

fn print_report(report: &HarnessReport) {
    for outcome in &report.outcomes {
        println!(
            "worker-{}: {} round(s), {} error(s)",
            outcome.worker,
            outcome.rounds_completed,
            outcome.errors.len()
        );
    }
    println!("{}", report.metrics);
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    logging::init();
    let config = ClientConfig::parse();

    let client = match connect_within(config.addr, &config.service_name, config.connect_timeout())
        .await
    {
        Ok(client) => client,
        Err(err) => {
            error!(addr = %config.addr, %err, "service lookup failed");
            return ExitCode::from(EXIT_UNAVAILABLE);
        }
    };
    info!(addr = %config.addr, service = %config.service_name, "connected");

    let report = match harness::run(client, &config.harness()).await {
        Ok(report) => report,
        Err(err @ HarnessError::InvalidConfig(_)) => {
            error!(%err, "refusing to run");
            return ExitCode::from(EXIT_USAGE);
        }
        Err(err) => {
            error!(%err, "harness run failed");
            return ExitCode::FAILURE;
        }
    };
    print_report(&report);

    if let Err(err) = report.verify() {
        error!(%err, "metrics do not account for every answered call");
        return ExitCode::FAILURE;
    }
    if report.failed_calls() > 0 {
        warn!(failed = report.failed_calls(), "some calls failed");
        return ExitCode::FAILURE;
    }
    if !report.is_exact() {
        // Other clients were calling the same server concurrently.
        info!(
            expected = report.config.expected_per_kind(),
            "counters exceed this run's calls"
        );
    }
    ExitCode::SUCCESS
}
