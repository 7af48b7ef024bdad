//! The connection manager: configuration, the client, its loops, and the
//! handle passed to event handlers.
//!
//! A [`Client`] owns at most one live session. Binding a transport spawns
//! three tasks — a read loop framing and dispatching inbound lines, a
//! write loop draining the outbound queue, and the keepalive monitor —
//! and [`Client::disconnect`] tears them down in a fixed order so
//! shutdown is deterministic no matter which loop stops first.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{self, AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_rustls::rustls;
use tokio_rustls::TlsConnector;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::builtin;
use crate::codes;
use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::event::{compose, Event};
use crate::line::{self, LineCodec};
use crate::monitor::Monitor;
use crate::state::{StateHandle, Status};

/// Outbound lines buffered between callers and the write loop.
const OUTBOUND_QUEUE_DEPTH: usize = 10;

/// Fatal loop errors buffered for [`Client::serve`].
const ERROR_QUEUE_DEPTH: usize = 2;

/// Connection settings.
///
/// `nickname` is the identity to register and defend; `username` doubles
/// as the ident and the `USERINFO` reply. The `version` string is what
/// CTCP `VERSION` queries see.
#[derive(Debug, Clone)]
pub struct Config {
    pub nickname: String,
    pub username: String,
    /// Sent as `PASS` before registration when present.
    pub password: Option<String>,
    /// TLS settings for [`Client::connect`]. `None` dials plain TCP;
    /// [`default_tls_config`] covers the usual public-server case.
    pub tls: Option<Arc<rustls::ClientConfig>>,
    pub version: String,
}

impl Config {
    pub fn new(nickname: &str, username: &str) -> Self {
        Config {
            nickname: nickname.to_string(),
            username: username.to_string(),
            password: None,
            tls: None,
            version: concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Immutable identity strings shared with handlers.
pub(crate) struct Identity {
    pub(crate) username: String,
    pub(crate) version: String,
}

/// Cheap cloneable handle given to event handlers.
///
/// Carries the full send surface plus the session state. The outbound
/// queue is held weakly: once teardown has closed the queue, every send
/// through an outstanding handle fails with [`Error::NotConnected`]
/// instead of keeping the write loop alive.
#[derive(Clone)]
pub struct SessionHandle {
    queue: mpsc::WeakSender<String>,
    state: StateHandle,
    identity: Arc<Identity>,
}

impl SessionHandle {
    pub(crate) fn new(
        queue: mpsc::WeakSender<String>,
        state: StateHandle,
        identity: Arc<Identity>,
    ) -> Self {
        SessionHandle {
            queue,
            state,
            identity,
        }
    }

    /// The session state: lifecycle status, tracked nickname, idle clock.
    pub fn state(&self) -> &StateHandle {
        &self.state
    }

    pub fn username(&self) -> &str {
        &self.identity.username
    }

    /// The string CTCP `VERSION` queries are answered with.
    pub fn version(&self) -> &str {
        &self.identity.version
    }

    /// The nickname the server currently knows this session by.
    pub async fn nickname(&self) -> String {
        self.state.current_nick().await
    }

    /// Queues one already-composed line, without its terminator.
    ///
    /// Embedded NUL/CR/LF are rejected here, before the line can reach
    /// the framing layer. Applies backpressure when the queue is full.
    pub async fn raw(&self, message: &str) -> Result<()> {
        line::check_line(message)?;
        let Some(queue) = self.queue.upgrade() else {
            return Err(Error::NotConnected);
        };
        queue
            .send(message.to_string())
            .await
            .map_err(|_| Error::NotConnected)
    }

    /// Composes and queues one command line.
    pub async fn command(&self, code: &str, message: &str, params: &[&str]) -> Result<()> {
        self.raw(&compose(code, message, params)).await
    }

    pub async fn privmsg(&self, target: &str, text: &str) -> Result<()> {
        self.command(codes::PRIVMSG, text, &[target]).await
    }

    pub async fn notice(&self, target: &str, text: &str) -> Result<()> {
        self.command(codes::NOTICE, text, &[target]).await
    }

    pub async fn join(&self, channels: &[&str]) -> Result<()> {
        if channels.is_empty() {
            return Ok(());
        }
        self.command(codes::JOIN, "", &[&channels.join(",")]).await
    }

    pub async fn part(&self, channels: &[&str]) -> Result<()> {
        if channels.is_empty() {
            return Ok(());
        }
        self.command(codes::PART, "", &[&channels.join(",")]).await
    }

    /// Requests a nickname change and records it as the desired one, so
    /// recapture chases the new name from now on.
    pub async fn nick(&self, nick: &str) -> Result<()> {
        self.state.set_desired(nick).await;
        self.command(codes::NICK, "", &[nick]).await
    }

    /// Sends a keepalive probe: `PING` with a timestamp parameter.
    pub async fn ping(&self) -> Result<()> {
        let token = chrono::Utc::now().timestamp_micros().to_string();
        self.command(codes::PING, "", &[&token]).await
    }
}

/// Everything owned by one live session.
struct Connection {
    session: SessionHandle,
    /// The only strong sender; dropping it closes and drains the queue.
    queue_tx: mpsc::Sender<String>,
    /// Held so the error channel outlives both loops and closes last.
    error_tx: mpsc::Sender<Error>,
    error_rx: Option<mpsc::Receiver<Error>>,
    keepalive_token: CancellationToken,
    read_token: CancellationToken,
    read_task: JoinHandle<()>,
    write_task: JoinHandle<()>,
    monitor_task: JoinHandle<()>,
}

/// A single-connection IRC client.
///
/// Handlers, the tracked nickname, and the dispatch table persist across
/// connections; binding a new transport after a disconnect reuses them
/// and re-registers under the desired nickname.
///
/// Constructing a client spawns its state actor, so [`Client::new`] must
/// run inside a Tokio runtime.
pub struct Client {
    config: Config,
    identity: Arc<Identity>,
    state: StateHandle,
    dispatcher: Arc<Dispatcher>,
    conn: Mutex<Option<Connection>>,
}

impl Client {
    pub fn new(config: Config) -> Self {
        let identity = Arc::new(Identity {
            username: config.username.clone(),
            version: config.version.clone(),
        });
        let state = StateHandle::spawn(&config.nickname);
        let dispatcher = Arc::new(Dispatcher::new());
        builtin::install(&dispatcher);
        Client {
            config,
            identity,
            state,
            dispatcher,
            conn: Mutex::new(None),
        }
    }

    /// Installs `handler` for `code`, replacing any previous handler for
    /// it, including the built-in ones.
    pub fn register<F, Fut>(&self, code: &str, handler: F)
    where
        F: Fn(Event, SessionHandle) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        self.dispatcher.register(code, handler);
    }

    /// Removes the handler for `code`. Returns whether one was present.
    pub fn unregister(&self, code: &str) -> bool {
        self.dispatcher.unregister(code)
    }

    /// Installs a handler for events no dedicated handler claims.
    pub fn set_fallback<F, Fut>(&self, handler: F)
    where
        F: Fn(Event, SessionHandle) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        self.dispatcher.set_fallback(handler);
    }

    /// Dials `addr` (`host:port`), performing a TLS handshake first when
    /// the configuration carries one, and binds the resulting stream.
    ///
    /// Refuses with [`Error::AlreadyConnected`] before dialing when a
    /// session is already live.
    pub async fn connect(&self, addr: &str) -> Result<()> {
        if self.conn.lock().await.is_some() {
            return Err(Error::AlreadyConnected);
        }

        let stream = TcpStream::connect(addr).await?;
        if let Err(e) = enable_keepalive(&stream) {
            warn!("failed to enable TCP keepalive: {}", e);
        }
        debug!(addr = %addr, tls = self.config.tls.is_some(), "connected");

        if let Some(tls) = &self.config.tls {
            let server_name = tls_server_name(addr)?;
            let connector = TlsConnector::from(tls.clone());
            let stream = connector.connect(server_name, stream).await?;
            self.bind(stream).await
        } else {
            self.bind(stream).await
        }
    }

    /// Binds an established transport: spawns the session loops and
    /// queues the registration sequence.
    ///
    /// The registration lines are buffered before the write loop starts,
    /// so the first bytes on the wire are always `PASS` (when
    /// configured), `NICK`, and `USER`, in that order.
    pub async fn bind<S>(&self, stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let mut slot = self.conn.lock().await;
        if slot.is_some() {
            return Err(Error::AlreadyConnected);
        }
        let Some(nickname) = self.state.connect().await else {
            return Err(Error::AlreadyConnected);
        };

        let (read_half, write_half) = io::split(stream);
        let (queue_tx, queue_rx) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);
        let (error_tx, error_rx) = mpsc::channel(ERROR_QUEUE_DEPTH);
        let keepalive_token = CancellationToken::new();
        let read_token = CancellationToken::new();

        let session = SessionHandle::new(
            queue_tx.downgrade(),
            self.state.clone(),
            self.identity.clone(),
        );

        let mut registration = Vec::with_capacity(3);
        if let Some(password) = &self.config.password {
            registration.push(compose(codes::PASS, "", &[password]));
        }
        registration.push(compose(codes::NICK, "", &[&nickname]));
        registration.push(compose(
            codes::USER,
            &self.config.username,
            &[&self.config.username, "0.0.0.0", "0.0.0.0"],
        ));
        for line in registration {
            if queue_tx.send(line).await.is_err() {
                self.state.disconnected().await;
                return Err(Error::NotConnected);
            }
        }

        let read_task = tokio::spawn(read_loop(
            FramedRead::new(read_half, LineCodec::new()),
            self.dispatcher.clone(),
            session.clone(),
            error_tx.clone(),
            read_token.clone(),
        ));
        let write_task = tokio::spawn(write_loop(
            FramedWrite::new(write_half, LineCodec::new()),
            queue_rx,
            error_tx.clone(),
        ));
        let monitor_task = tokio::spawn(
            Monitor::default().run(session.clone(), keepalive_token.clone()),
        );

        *slot = Some(Connection {
            session,
            queue_tx,
            error_tx,
            error_rx: Some(error_rx),
            keepalive_token,
            read_token,
            read_task,
            write_task,
            monitor_task,
        });
        debug!(nick = %nickname, "session loops started");
        Ok(())
    }

    /// Blocks until the session dies, reporting how.
    ///
    /// Returns the first fatal loop error, or `Ok(())` when the session
    /// ends through [`Client::disconnect`]. Only one caller may serve a
    /// given session.
    pub async fn serve(&self) -> Result<()> {
        let mut error_rx = {
            let mut slot = self.conn.lock().await;
            let conn = slot.as_mut().ok_or(Error::NotConnected)?;
            conn.error_rx.take().ok_or(Error::AlreadyServing)?
        };
        match error_rx.recv().await {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Tears the session down deterministically.
    ///
    /// Stops the keepalive timers, closes the outbound queue so the
    /// write loop drains what was already accepted, stops the read loop,
    /// then joins all three tasks before reporting disconnected. The
    /// error channel closes last, which is what unblocks
    /// [`Client::serve`] with `Ok(())`.
    pub async fn disconnect(&self) -> Result<()> {
        let conn = { self.conn.lock().await.take() };
        let Some(conn) = conn else {
            return Err(Error::NotConnected);
        };
        if !self.state.disconnect().await {
            debug!("disconnect with teardown already under way");
        }

        conn.keepalive_token.cancel();
        drop(conn.queue_tx);
        conn.read_token.cancel();

        for (name, task) in [
            ("read", conn.read_task),
            ("write", conn.write_task),
            ("monitor", conn.monitor_task),
        ] {
            if let Err(error) = task.await {
                warn!(task = name, error = %error, "session task failed");
            }
        }

        // Both transport halves were dropped when their loops returned,
        // so the socket is closed by the time we get here.
        self.state.disconnected().await;
        drop(conn.error_tx);
        debug!("disconnected");
        Ok(())
    }

    /// Sends `QUIT` and tears the session down. The quit line rides the
    /// queue drain, so it reaches the wire before the transport closes.
    pub async fn quit(&self, message: &str) -> Result<()> {
        self.session().await?.command(codes::QUIT, message, &[]).await?;
        self.disconnect().await
    }

    /// Current lifecycle status.
    pub async fn status(&self) -> Status {
        self.state.status().await
    }

    /// The nickname the server currently knows this client by.
    pub async fn nickname(&self) -> String {
        self.state.current_nick().await
    }

    async fn session(&self) -> Result<SessionHandle> {
        let slot = self.conn.lock().await;
        slot.as_ref()
            .map(|conn| conn.session.clone())
            .ok_or(Error::NotConnected)
    }

    /// Queues one already-composed line on the live session.
    pub async fn raw(&self, message: &str) -> Result<()> {
        self.session().await?.raw(message).await
    }

    /// Composes and queues one command line.
    pub async fn command(&self, code: &str, message: &str, params: &[&str]) -> Result<()> {
        self.session().await?.command(code, message, params).await
    }

    pub async fn privmsg(&self, target: &str, text: &str) -> Result<()> {
        self.session().await?.privmsg(target, text).await
    }

    pub async fn notice(&self, target: &str, text: &str) -> Result<()> {
        self.session().await?.notice(target, text).await
    }

    pub async fn join(&self, channels: &[&str]) -> Result<()> {
        self.session().await?.join(channels).await
    }

    pub async fn part(&self, channels: &[&str]) -> Result<()> {
        self.session().await?.part(channels).await
    }

    /// Requests a nickname change; the new name becomes the desired one.
    pub async fn nick(&self, nick: &str) -> Result<()> {
        self.session().await?.nick(nick).await
    }

    /// Sends a timestamped keepalive probe.
    pub async fn ping(&self) -> Result<()> {
        self.session().await?.ping().await
    }
}

async fn read_loop<S>(
    mut framed: FramedRead<ReadHalf<S>, LineCodec>,
    dispatcher: Arc<Dispatcher>,
    session: SessionHandle,
    error_tx: mpsc::Sender<Error>,
    token: CancellationToken,
) where
    S: AsyncRead + Send + 'static,
{
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            item = framed.next() => match item {
                Some(Ok(line)) => {
                    trace!(line = %line, "recv");
                    session.state().touch().await;
                    dispatcher.dispatch(Event::parse(&line), session.clone());
                }
                Some(Err(error)) => {
                    debug!(error = %error, "read loop failed");
                    let _ = error_tx.try_send(error);
                    break;
                }
                None => {
                    debug!("server closed the connection");
                    let _ = error_tx.try_send(Error::ConnectionClosed);
                    break;
                }
            },
        }
    }
    debug!("read loop stopped");
}

async fn write_loop<S>(
    mut framed: FramedWrite<WriteHalf<S>, LineCodec>,
    mut queue_rx: mpsc::Receiver<String>,
    error_tx: mpsc::Sender<Error>,
) where
    S: AsyncWrite + Send + 'static,
{
    // recv() drains the queue after the last sender drops, so lines
    // accepted before a disconnect still reach the wire.
    while let Some(line) = queue_rx.recv().await {
        trace!(line = %line, "send");
        if let Err(error) = framed.send(line).await {
            debug!(error = %error, "write loop failed");
            let _ = error_tx.try_send(error);
            break;
        }
    }
    let _ = framed.close().await;
    debug!("write loop stopped");
}

fn enable_keepalive(stream: &TcpStream) -> std::io::Result<()> {
    use socket2::{SockRef, TcpKeepalive};

    let sock = SockRef::from(stream);
    let keepalive = TcpKeepalive::new()
        .with_time(Duration::from_secs(120))
        .with_interval(Duration::from_secs(30));
    sock.set_tcp_keepalive(&keepalive)
}

/// Extracts the name to verify the TLS certificate against from a
/// `host:port` address. The host is everything before the last `:`,
/// with IPv6 brackets stripped, so `[::1]:6697` verifies against `::1`.
fn tls_server_name(addr: &str) -> Result<rustls::pki_types::ServerName<'static>> {
    let host = addr
        .rsplit_once(':')
        .map_or(addr, |(host, _)| host)
        .trim_start_matches('[')
        .trim_end_matches(']');
    if host.is_empty() {
        return Err(Error::InvalidServerName(addr.to_string()));
    }
    rustls::pki_types::ServerName::try_from(host.to_string())
        .map_err(|_| Error::InvalidServerName(host.to_string()))
}

/// A [`rustls::ClientConfig`] trusting the bundled webpki roots, for
/// [`Config::tls`] when the server presents a publicly-issued
/// certificate. Installs the ring provider as a side effect.
///
/// ```no_run
/// let mut config = slirc_session::Config::new("ada", "lovelace");
/// config.tls = Some(slirc_session::default_tls_config());
/// ```
pub fn default_tls_config() -> Arc<rustls::ClientConfig> {
    // Ignore the result: a provider may already be installed.
    let _ = rustls::crypto::ring::default_provider().install_default();
    let roots = rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    Arc::new(
        rustls::ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth(),
    )
}
