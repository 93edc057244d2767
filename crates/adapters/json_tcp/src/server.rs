//! Connection manager and control loop.

use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use aquaria_app::ports::{Acquirer, Actuator, TickLog};
use aquaria_app::scheduler::{Scheduler, TICK_PERIOD, TickTimer};
use aquaria_domain::registry::Registry;
use aquaria_domain::time::{self, Timestamp};

use crate::decoder::Decoder;
use crate::dispatch::dispatch;
use crate::error::ProtocolError;
use crate::request::Request;
use crate::response::{Empty, Response};

const READ_CHUNK: usize = 1024;
const EVENT_QUEUE: usize = 64;

type ConnectionId = u64;

/// What a reader task reports to the control loop.
#[derive(Debug)]
enum Inbound {
    Data(ConnectionId, Vec<u8>),
    Closed(ConnectionId),
    Failed(ConnectionId, io::Error),
}

/// What woke the control loop up.
enum Wake {
    Shutdown,
    Timeout,
    Accepted(io::Result<(TcpStream, SocketAddr)>),
    Inbound(Inbound),
}

/// Why a connection is being torn down.
#[derive(Debug, thiserror::Error)]
enum Teardown {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

struct Connection {
    peer: SocketAddr,
    writer: OwnedWriteHalf,
    decoder: Decoder,
    reader: JoinHandle<()>,
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Owns the registry and runs ticks and client requests on one task.
///
/// Registry state is only touched from [`Server::serve`], so a request
/// always sees a fully applied tick and a tick never sees half a request.
pub struct Server<Q, A, L> {
    listener: TcpListener,
    registry: Registry,
    scheduler: Scheduler<Q, A, L>,
}

impl<Q, A, L> Server<Q, A, L>
where
    Q: Acquirer,
    A: Actuator,
    L: TickLog,
{
    /// Listen on `addr`.
    ///
    /// # Errors
    ///
    /// Returns the IO error when the address cannot be bound.
    pub async fn bind(
        addr: impl ToSocketAddrs,
        registry: Registry,
        scheduler: Scheduler<Q, A, L>,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            registry,
            scheduler,
        })
    }

    /// # Errors
    ///
    /// Returns the IO error reported by the listening socket.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run until `shutdown` resolves, then close every connection and return
    /// the registry.
    ///
    /// A tick runs whenever [`TICK_PERIOD`] passes without activity, and
    /// before any activity that arrives in a new wall-clock second.
    ///
    /// # Errors
    ///
    /// Returns the IO error when the listening address cannot be read.
    pub async fn serve(mut self, shutdown: impl Future<Output = ()>) -> io::Result<Registry> {
        let addr = self.listener.local_addr()?;
        tracing::info!(%addr, "server listening");

        let (inbound_tx, mut inbound) = mpsc::channel(EVENT_QUEUE);
        let mut connections: HashMap<ConnectionId, Connection> = HashMap::new();
        let mut next_id: ConnectionId = 0;
        let mut timer = TickTimer::new();
        tokio::pin!(shutdown);

        loop {
            let wake = tokio::select! {
                () = &mut shutdown => Wake::Shutdown,
                () = tokio::time::sleep(TICK_PERIOD) => Wake::Timeout,
                accepted = self.listener.accept() => Wake::Accepted(accepted),
                Some(event) = inbound.recv() => Wake::Inbound(event),
            };
            if matches!(wake, Wake::Shutdown) {
                break;
            }

            let now = time::now();
            if timer.is_due(now) {
                timer.mark(now);
                let report = self.scheduler.tick(&mut self.registry, now).await;
                tracing::debug!(
                    changes = report.changes.len(),
                    failed_sensors = report.failed_sensors.len(),
                    "tick"
                );
            }

            match wake {
                Wake::Shutdown | Wake::Timeout => {}
                Wake::Accepted(Ok((stream, peer))) => {
                    next_id += 1;
                    let connection = open(next_id, stream, peer, inbound_tx.clone());
                    connections.insert(next_id, connection);
                    tracing::info!(%peer, "client connected");
                }
                Wake::Accepted(Err(err)) => {
                    tracing::warn!(error = %err, "accept failed");
                }
                Wake::Inbound(Inbound::Data(id, bytes)) => {
                    let Some(connection) = connections.get_mut(&id) else {
                        continue;
                    };
                    let now = time::now();
                    if let Err(err) = service(&mut self.registry, connection, &bytes, now).await {
                        tracing::warn!(peer = %connection.peer, error = %err, "closing connection");
                        connections.remove(&id);
                    }
                }
                Wake::Inbound(Inbound::Closed(id)) => {
                    if let Some(connection) = connections.remove(&id) {
                        tracing::info!(peer = %connection.peer, "client disconnected");
                    }
                }
                Wake::Inbound(Inbound::Failed(id, err)) => {
                    if let Some(connection) = connections.remove(&id) {
                        tracing::warn!(peer = %connection.peer, error = %err, "read failed");
                    }
                }
            }
        }

        tracing::info!(clients = connections.len(), "server shutting down");
        Ok(self.registry)
    }
}

/// Answer every request completed by `bytes`, in order.
async fn service(
    registry: &mut Registry,
    connection: &mut Connection,
    bytes: &[u8],
    now: Timestamp,
) -> Result<(), Teardown> {
    connection.decoder.feed(bytes);
    loop {
        let outcome = match connection.decoder.next_request() {
            Ok(None) => return Ok(()),
            Ok(Some(raw)) => Request::try_from(raw)
                .and_then(|request| dispatch(registry, request, now)),
            Err(err) => Err(err),
        };
        match outcome {
            Ok(response) => {
                let line = response.encode().map_err(io::Error::other)?;
                connection.writer.write_all(&line).await?;
            }
            Err(err) => {
                if let Ok(line) = Response::Empty(Empty {}).encode() {
                    let _ = connection.writer.write_all(&line).await;
                }
                return Err(err.into());
            }
        }
    }
}

fn open(
    id: ConnectionId,
    stream: TcpStream,
    peer: SocketAddr,
    inbound: mpsc::Sender<Inbound>,
) -> Connection {
    let (read, writer) = stream.into_split();
    Connection {
        peer,
        writer,
        decoder: Decoder::new(),
        reader: tokio::spawn(read_loop(id, read, inbound)),
    }
}

/// Forward everything read from one socket to the control loop.
async fn read_loop(id: ConnectionId, mut read: OwnedReadHalf, inbound: mpsc::Sender<Inbound>) {
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        let event = match read.read(&mut chunk).await {
            Ok(0) => Inbound::Closed(id),
            Ok(n) => Inbound::Data(id, chunk[..n].to_vec()),
            Err(err) => Inbound::Failed(id, err),
        };
        let last = !matches!(event, Inbound::Data(..));
        if inbound.send(event).await.is_err() || last {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::sync::oneshot;

    use aquaria_app::ports::{Acquisition, NullTickLog};
    use aquaria_domain::command::Command;
    use aquaria_domain::device::{Actuation, DeviceState};
    use aquaria_domain::error::AquariaError;
    use aquaria_domain::id::SensorId;

    // ── Fakes ──────────────────────────────────────────────────────

    struct IdleAcquirer;

    impl Acquirer for IdleAcquirer {
        fn acquire(&mut self, _sensor: SensorId, _command: &Command) -> Acquisition {
            Acquisition::Pending
        }
    }

    struct NoopActuator;

    impl Actuator for NoopActuator {
        fn actuate(
            &self,
            _device: &str,
            _command: &Command,
            _state: DeviceState,
        ) -> impl Future<Output = Result<(), AquariaError>> + Send {
            async { Ok(()) }
        }
    }

    // ── Harness ────────────────────────────────────────────────────

    struct Running {
        addr: SocketAddr,
        stop: oneshot::Sender<()>,
        done: JoinHandle<io::Result<Registry>>,
    }

    impl Running {
        async fn stop(self) -> Registry {
            let _ = self.stop.send(());
            self.done.await.unwrap().unwrap()
        }
    }

    async fn start() -> Running {
        let mut registry = Registry::with_builtins();
        registry.add_device("Heater", Actuation::Noop).unwrap();
        let scheduler = Scheduler::new(IdleAcquirer, NoopActuator, NullTickLog);
        let server = Server::bind("127.0.0.1:0", registry, scheduler).await.unwrap();
        let addr = server.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();
        let done = tokio::spawn(server.serve(async {
            let _ = stopped.await;
        }));
        Running { addr, stop, done }
    }

    async fn exchange(stream: &mut BufReader<TcpStream>, request: &str) -> String {
        stream.get_mut().write_all(request.as_bytes()).await.unwrap();
        let mut line = String::new();
        stream.read_line(&mut line).await.unwrap();
        line
    }

    #[tokio::test]
    async fn should_answer_requests_on_same_connection() {
        let running = start().await;
        let mut stream = BufReader::new(TcpStream::connect(running.addr).await.unwrap());

        let line = exchange(&mut stream, r#"{"request":"get-sensor","name":"weekday"}"#).await;
        assert!(line.starts_with(r#"{"sensor":[{"name":"Weekday","type":"weekday""#));
        assert!(line.ends_with('\n'));

        let line = exchange(&mut stream, r#"{"request":"get-device"}"#).await;
        assert!(line.starts_with(r#"{"device":[{"name":"Heater""#));

        running.stop().await;
    }

    #[tokio::test]
    async fn should_answer_request_split_across_writes() {
        let running = start().await;
        let mut stream = BufReader::new(TcpStream::connect(running.addr).await.unwrap());

        stream.get_mut().write_all(br#"{"request":"get-dev"#).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let line = exchange(&mut stream, r#"ice","name":"nope"}"#).await;
        assert_eq!(line, "{\"device\":[]}\n");

        running.stop().await;
    }

    #[tokio::test]
    async fn should_apply_set_device_before_answering() {
        let running = start().await;
        let mut stream = BufReader::new(TcpStream::connect(running.addr).await.unwrap());

        let line = exchange(
            &mut stream,
            r#"{"request":"set-device","name":"Heater","active":true,"expire":60}"#,
        )
        .await;
        assert!(line.contains(r#""reason":{"input":"set","active":true"#));

        let registry = running.stop().await;
        let heater = registry.find_device("Heater").unwrap();
        assert_eq!(heater.manual_override.unwrap().state, DeviceState::On);
    }

    #[tokio::test]
    async fn should_answer_empty_object_and_close_on_bad_request() {
        let running = start().await;
        let mut stream = BufReader::new(TcpStream::connect(running.addr).await.unwrap());

        let line = exchange(&mut stream, r#"{"request":"reboot"}"#).await;
        assert_eq!(line, "{}\n");

        let mut rest = String::new();
        let read = stream.read_line(&mut rest).await.unwrap();
        assert_eq!(read, 0);

        running.stop().await;
    }

    #[tokio::test]
    async fn should_keep_other_connections_when_one_fails() {
        let running = start().await;
        let mut good = BufReader::new(TcpStream::connect(running.addr).await.unwrap());
        let mut bad = BufReader::new(TcpStream::connect(running.addr).await.unwrap());

        assert_eq!(exchange(&mut bad, "[1]").await, "{}\n");
        let line = exchange(&mut good, r#"{"request":"get-device","name":"heater"}"#).await;
        assert!(line.starts_with(r#"{"device":[{"name":"Heater""#));

        running.stop().await;
    }

    #[tokio::test]
    async fn should_tick_while_idle() {
        let running = start().await;
        tokio::time::sleep(Duration::from_millis(1200)).await;
        let registry = running.stop().await;

        let time = registry.find_sensor("Time").unwrap();
        assert!(time.reading.is_valid());
    }
}
