use std::{io, net::SocketAddr, time::Duration};

use async_trait::async_trait;
use futures::StreamExt;
use tarpc::{
    client::{self, RpcError},
    context,
    server::{BaseChannel, Channel},
    tokio_serde::formats::Bincode,
};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{TcpListener, TcpStream},
    time::Instant,
};
use tracing::{debug, warn};

use crate::{
    error::CallError,
    service::{Call, MetricsService, RemoteService, RemoteServiceClient, Reply},
};

/// Carries a [`Call`] to the service and its [`Reply`] back.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn dispatch(&self, call: Call) -> Result<Reply, CallError>;
}

/// Invokes the service directly, without serialization.
#[derive(Clone, Debug)]
pub struct LocalTransport {
    service: MetricsService,
}

impl LocalTransport {
    pub fn new(service: MetricsService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn dispatch(&self, call: Call) -> Result<Reply, CallError> {
        self.service.dispatch(call).map_err(CallError::from)
    }
}

#[async_trait]
impl Transport for RemoteServiceClient {
    async fn dispatch(&self, call: Call) -> Result<Reply, CallError> {
        let ctx = context::current();
        let started = Instant::now();
        let failed = |err| from_rpc_error(err, started.elapsed());
        let reply = match call {
            Call::GetTime => Reply::Time(self.get_time(ctx).await.map_err(failed)?),
            Call::Echo(message) => Reply::Echo(self.echo(ctx, message).await.map_err(failed)?),
            Call::Compute(op) => Reply::Computed(self.compute(ctx, op).await.map_err(failed)??),
            Call::GetMetricsReport => {
                Reply::Metrics(self.get_metrics_report(ctx).await.map_err(failed)?)
            }
        };
        Ok(reply)
    }
}

/// `waited` is how long the call was outstanding when it failed.
fn from_rpc_error(err: RpcError, waited: Duration) -> CallError {
    match err {
        RpcError::DeadlineExceeded => CallError::TimeoutExceeded(waited),
        other => CallError::TransportUnavailable(other.to_string()),
    }
}

/// Creates a tarpc transport that serializes messages with [`Bincode`] over
/// any byte stream.
pub fn bincode_transport<IO, Item, SinkItem>(
    io: IO,
) -> tarpc::serde_transport::Transport<IO, Item, SinkItem, Bincode<Item, SinkItem>>
where
    IO: AsyncRead + AsyncWrite,
    Item: for<'de> serde::Deserialize<'de>,
    SinkItem: serde::Serialize,
{
    tarpc::serde_transport::Transport::from((io, Bincode::default()))
}

/// Serves `service` on an in-process channel and returns a client bound to it.
///
/// Must be called from within a tokio runtime.
pub fn in_process(service: MetricsService) -> RemoteServiceClient {
    let (client_transport, server_transport) = tarpc::transport::channel::unbounded();
    tokio::spawn(
        BaseChannel::with_defaults(server_transport)
            .execute(service.serve())
            .for_each(|fut| async move {
                tokio::spawn(fut);
            }),
    );
    RemoteServiceClient::new(client::Config::default(), client_transport).spawn()
}

/// Pause before the next accept after a listener-level failure.
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Bound on dialing the server and completing the name lookup.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Accepts connections on `listener` until the returned future is dropped.
///
/// Every connection gets its own channel task and every request is spawned,
/// so calls from one or many clients execute in parallel. Accept failures
/// never stop the loop; failures of the listener itself, such as running out
/// of file descriptors, back off for [`ACCEPT_BACKOFF`] first.
pub async fn serve(listener: TcpListener, service: MetricsService) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                match accept_backoff(&err) {
                    Some(pause) => {
                        warn!(%err, ?pause, "accept failed, backing off");
                        tokio::time::sleep(pause).await;
                    }
                    None => warn!(%err, "accept failed"),
                }
                continue;
            }
        };
        if let Err(err) = stream.set_nodelay(true) {
            warn!(%peer, %err, "could not disable nagle");
        }
        debug!(%peer, "client connected");

        let service = service.clone();
        tokio::spawn(async move {
            BaseChannel::with_defaults(bincode_transport(stream))
                .execute(service.serve())
                .for_each(|fut| async move {
                    tokio::spawn(fut);
                })
                .await;
            debug!(%peer, "client disconnected");
        });
    }
}

/// Errors tied to one incoming connection retry at once; anything else is a
/// listener-level failure (EMFILE, ENFILE, ENOBUFS, ...) and waits.
fn accept_backoff(err: &io::Error) -> Option<Duration> {
    match err.kind() {
        io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::Interrupted
        | io::ErrorKind::WouldBlock => None,
        _ => Some(ACCEPT_BACKOFF),
    }
}

/// [`connect_within`] bounded by [`DEFAULT_CONNECT_TIMEOUT`].
pub async fn connect(
    addr: SocketAddr,
    service_name: &str,
) -> Result<RemoteServiceClient, CallError> {
    connect_within(addr, service_name, DEFAULT_CONNECT_TIMEOUT).await
}

/// Connects to the server at `addr` and checks that a service is bound there
/// under `service_name`.
///
/// Dialing and the lookup together must finish within `limit`, otherwise the
/// result is [`CallError::TimeoutExceeded`].
pub async fn connect_within(
    addr: SocketAddr,
    service_name: &str,
    limit: Duration,
) -> Result<RemoteServiceClient, CallError> {
    tokio::time::timeout(limit, dial(addr, service_name))
        .await
        .map_err(|_| {
            warn!(%addr, ?limit, "connect timed out");
            CallError::TimeoutExceeded(limit)
        })?
}

async fn dial(addr: SocketAddr, service_name: &str) -> Result<RemoteServiceClient, CallError> {
    let stream = TcpStream::connect(addr).await.map_err(|err| {
        CallError::TransportUnavailable(format!("cannot connect to {addr}: {err}"))
    })?;
    let transport = bincode_transport(stream);
    let client = RemoteServiceClient::new(client::Config::default(), transport).spawn();

    let started = Instant::now();
    let bound = client
        .lookup(context::current(), service_name.to_string())
        .await
        .map_err(|err| from_rpc_error(err, started.elapsed()))?;
    if !bound {
        return Err(CallError::TransportUnavailable(format!(
            "no service bound as `{service_name}` at {addr}"
        )));
    }

    debug!(%addr, service_name, "connected to service");
    Ok(client)
}
