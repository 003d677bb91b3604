use std::{io, sync::Arc};

use clap::Parser;
use metrics_rpc::{MetricsCounter, MetricsService, config::ServerConfig, logging, serve};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> io::Result<()> {
    logging::init();
    let config = ServerConfig::parse();

    let metrics = Arc::new(MetricsCounter::new());
    let service = MetricsService::with_identity(&config.service_name, &config.echo_prefix, metrics);

    let listener = TcpListener::bind(config.addr).await?;
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, service = %config.service_name, "metrics server ready");
    println!("Serving `{}` on {local_addr}", config.service_name);

    tokio::select! {
        () = serve(listener, service.clone()) => Ok(()),
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!(final_metrics = ?service.metrics().snapshot(), "shutting down");
            Ok(())
        }
    }
}
