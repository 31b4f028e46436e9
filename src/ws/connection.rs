#![expect(
    clippy::module_name_repetitions,
    reason = "Connection types expose their domain in the name for clarity"
)]

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use futures::{FutureExt as _, SinkExt as _, StreamExt as _};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::{Notify, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval_at, sleep};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use url::Url;

use super::config::{Config, ReconnectSchedule};
use super::error::WsError;
use super::keepalive::{Probes, decode_probe, encode_probe, now_millis, round_trip};
use super::metrics::Metrics;
use super::traits::{ConnectionEvent, FrameHandler, Reaction, ReconnectFailure};
use crate::Result;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Close code reported when the server sent a close frame without a status.
pub const NO_STATUS_RECEIVED: u16 = 1005;
/// Close code reported when the transport dropped without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;

const CLIENT_DISCONNECT_REASON: &str = "client disconnect";

/// Connection state tracking.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Never connected, or the first connection attempt failed
    Disconnected,
    /// A transport is being established
    Connecting,
    /// The transport is open and frames flow
    Open {
        /// When the connection was established
        since: Instant,
    },
    /// Waiting to retry after an unexpected close
    Reconnecting {
        /// Current reconnection attempt number
        attempt: u32,
    },
    /// Closed on purpose, by the server's close code, or after the
    /// reconnect budget ran out
    Closed,
}

impl ConnectionState {
    /// Check if the connection is currently open.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open { .. })
    }

    const fn is_settled(self) -> bool {
        !matches!(self, Self::Connecting | Self::Reconnecting { .. })
    }
}

/// Handle to the transport of one live session.
#[derive(Debug)]
struct Session {
    outbound: mpsc::UnboundedSender<String>,
    token: CancellationToken,
    task: JoinHandle<()>,
}

enum Exit {
    Closed { code: u16, reason: String },
    /// The transport failed before reaching the open state
    Unopened,
    Cancelled,
}

struct Inner<H: FrameHandler> {
    endpoint: Url,
    config: Config,
    handler: Arc<H>,
    metrics: Arc<Metrics>,
    state_tx: watch::Sender<ConnectionState>,
    session: Mutex<Option<Session>>,
    retry_now: Notify,
}

/// Manages WebSocket connection lifecycle, reconnection, and keep-alive.
///
/// The manager owns the socket inside a background task that:
/// - writes the handler's replay frames each time the transport opens
/// - feeds every inbound text frame to the [`FrameHandler`]
/// - probes the server on a fixed interval while open and records round trips
/// - reconnects with exponential backoff after a retryable close
///
/// Frames are interpreted by the handler; the manager only knows close codes,
/// control frames and lifecycle.
///
/// # Example
///
/// ```ignore
/// let metrics = Arc::new(Metrics::new());
/// let connection = ConnectionManager::new(endpoint, Config::default(), handler, metrics);
/// connection.connect().await?;
/// connection.send(&frame)?;
/// ```
pub struct ConnectionManager<H: FrameHandler> {
    inner: Arc<Inner<H>>,
}

impl<H: FrameHandler> Clone for ConnectionManager<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<H: FrameHandler> ConnectionManager<H> {
    /// Create a manager in the [`ConnectionState::Disconnected`] state.
    ///
    /// Nothing is dialed until [`ConnectionManager::connect`] is called.
    #[must_use]
    pub fn new(endpoint: Url, config: Config, handler: Arc<H>, metrics: Arc<Metrics>) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);

        Self {
            inner: Arc::new(Inner {
                endpoint,
                config,
                handler,
                metrics,
                state_tx,
                session: Mutex::new(None),
                retry_now: Notify::new(),
            }),
        }
    }

    /// Open the transport.
    ///
    /// Resolves once the connection is open. Calling it while a connection is
    /// already open or being established does not dial a second transport; it
    /// waits for the pending attempt instead. While reconnecting, the pending
    /// backoff delay is skipped.
    ///
    /// A failure of this first attempt is returned to the caller and is not
    /// retried.
    pub async fn connect(&self) -> Result<()> {
        let mut claimed = false;
        self.inner.state_tx.send_if_modified(|state| {
            if matches!(
                state,
                ConnectionState::Disconnected | ConnectionState::Closed
            ) {
                *state = ConnectionState::Connecting;
                claimed = true;
                return true;
            }
            false
        });

        if claimed {
            return self.open_session().await;
        }

        if matches!(self.state(), ConnectionState::Reconnecting { .. }) {
            self.inner.retry_now.notify_one();
        }
        self.wait_settled().await
    }

    async fn open_session(&self) -> Result<()> {
        if let Some(stale) = self.inner.session().take() {
            stale.token.cancel();
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(host = ?self.inner.endpoint.host_str(), "Connecting");

        let stream = match connect_async(self.inner.endpoint.as_str()).await {
            Ok((stream, _)) => stream,
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %e, "Unable to connect");
                self.inner.state_tx.send_if_modified(|state| {
                    replace_if(
                        state,
                        ConnectionState::Connecting,
                        ConnectionState::Disconnected,
                    )
                });
                self.inner
                    .handler
                    .on_event(ConnectionEvent::Error(e.to_string()));
                return Err(WsError::Connection(e).into());
            }
        };

        {
            let mut session = self.inner.session();
            // disconnect() may have run while the handshake was in flight
            if *self.inner.state_tx.borrow() != ConnectionState::Connecting {
                return Err(WsError::ConnectionClosed.into());
            }

            let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
            let token = CancellationToken::new();
            let task = tokio::spawn(Arc::clone(&self.inner).run(stream, outbound_rx, token.clone()));
            *session = Some(Session {
                outbound: outbound_tx,
                token,
                task,
            });
        }

        self.wait_settled().await
    }

    async fn wait_settled(&self) -> Result<()> {
        let mut state_rx = self.inner.state_tx.subscribe();
        let state = *state_rx
            .wait_for(|state| state.is_settled())
            .await
            .map_err(|_e| WsError::ConnectionClosed)?;

        if state.is_open() {
            Ok(())
        } else {
            Err(WsError::ConnectionClosed.into())
        }
    }

    /// Close the transport on purpose.
    ///
    /// Stops keep-alive and any pending reconnect before the close frame
    /// (code 1000) is written. The state ends as [`ConnectionState::Closed`]
    /// and no reconnect is attempted until [`ConnectionManager::connect`] is
    /// called again.
    pub async fn disconnect(&self) {
        let (session, previous) = {
            let mut guard = self.inner.session();
            let previous = self.inner.state_tx.send_replace(ConnectionState::Closed);
            (guard.take(), previous)
        };

        if let Some(session) = session {
            session.token.cancel();
            drop(session.outbound);
            if let Err(e) = session.task.await {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %e, "Connection task ended abnormally");
                #[cfg(not(feature = "tracing"))]
                let _ = &e;
            }
        }

        // the task may have published a transition before it saw the cancellation
        self.inner.state_tx.send_replace(ConnectionState::Closed);

        if previous != ConnectionState::Closed {
            #[cfg(feature = "tracing")]
            tracing::debug!("Disconnected by client");
            self.inner.handler.on_event(ConnectionEvent::Disconnected {
                code: u16::from(CloseCode::Normal),
                reason: CLIENT_DISCONNECT_REASON.to_owned(),
            });
        }
    }

    /// Stop the session without waiting for the connection task.
    ///
    /// Used when the owner goes away: keep-alive and any pending reconnect stop,
    /// and the task writes its close frame and exits on its own. No
    /// [`ConnectionEvent::Disconnected`] is raised.
    pub(crate) fn shutdown(&self) {
        let session = {
            let mut guard = self.inner.session();
            self.inner.state_tx.send_replace(ConnectionState::Closed);
            guard.take()
        };

        if let Some(session) = session {
            #[cfg(feature = "tracing")]
            tracing::debug!("Connection owner dropped, stopping session");
            session.token.cancel();
        }
    }

    /// Serialize and send a frame over the open transport.
    ///
    /// Fails with [`WsError::NotConnected`] unless the state is open.
    pub fn send<R: Serialize>(&self, request: &R) -> Result<()> {
        if !self.state().is_open() {
            return Err(WsError::NotConnected.into());
        }
        self.queue(request)
    }

    /// Queue a frame for the current session without checking the state.
    ///
    /// Frames still queued when the transport closes are discarded.
    pub(crate) fn queue<R: Serialize>(&self, request: &R) -> Result<()> {
        let json = serde_json::to_string(request)?;
        let session = self.inner.session();
        let session = session.as_ref().ok_or(WsError::NotConnected)?;
        session
            .outbound
            .send(json)
            .map_err(|_e| WsError::ConnectionClosed)?;
        Ok(())
    }

    /// Get the current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.inner.state_tx.borrow()
    }

    /// Subscribe to connection state changes.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    /// Counters shared with the frame handler.
    #[must_use]
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.inner.metrics
    }
}

/// Discard a retry request stored while nobody was waiting for it.
fn drain_retry(retry: &Notify) {
    _ = retry.notified().now_or_never();
}

fn replace_if(
    state: &mut ConnectionState,
    expected: ConnectionState,
    next: ConnectionState,
) -> bool {
    if *state == expected {
        *state = next;
        return true;
    }
    false
}

impl<H: FrameHandler> Inner<H> {
    fn session(&self) -> MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish a transition unless the session has been cancelled.
    fn set_state(&self, token: &CancellationToken, state: ConnectionState) {
        if !token.is_cancelled() {
            self.state_tx.send_replace(state);
        }
    }

    /// Connection task: serve the transport, then reconnect until cancelled,
    /// closed with a non-retryable code, or out of attempts.
    async fn run(
        self: Arc<Self>,
        mut stream: WsStream,
        mut outbound: mpsc::UnboundedReceiver<String>,
        token: CancellationToken,
    ) {
        let mut schedule = ReconnectSchedule::new(&self.config.reconnect);
        let mut initial = true;

        loop {
            let opened = Instant::now();
            let exit = self.serve(stream, &mut outbound, &token).await;
            self.handler.on_close();
            self.metrics.connection_closed();

            let (code, reason) = match exit {
                Exit::Cancelled => return,
                Exit::Unopened if initial => {
                    // connect() is still waiting on this attempt and reports it
                    self.abandon_initial(&token);
                    return;
                }
                Exit::Unopened => (ABNORMAL_CLOSURE, String::new()),
                Exit::Closed { code, reason } => (code, reason),
            };
            initial = false;

            #[cfg(feature = "tracing")]
            tracing::debug!(code, %reason, "Connection closed");
            self.handler
                .on_event(ConnectionEvent::Disconnected { code, reason });

            if !self.config.reconnect.is_retryable(code) {
                self.give_up(&token, ReconnectFailure::NotRetryable { code });
                return;
            }

            if opened.elapsed() >= self.config.reconnect.reset_after {
                schedule.reset();
            }

            match self.reconnect(&mut schedule, &token).await {
                Some(next) => stream = next,
                None => return,
            }
        }
    }

    /// Drive one open transport until it closes or the session is cancelled.
    async fn serve(
        &self,
        stream: WsStream,
        outbound: &mut mpsc::UnboundedReceiver<String>,
        token: &CancellationToken,
    ) -> Exit {
        let (mut write, mut read) = stream.split();

        // Frames queued for the previous transport are stale; the replay
        // below carries the desired state instead.
        while outbound.try_recv().is_ok() {}

        let replay = self.handler.on_open();
        #[cfg(feature = "tracing")]
        tracing::debug!(frames = replay.len(), "Replaying subscriptions");
        for frame in replay {
            if let Err(e) = write.send(Message::Text(frame.into())).await {
                self.transport_failed(&e);
                return Exit::Unopened;
            }
        }

        self.set_state(
            token,
            ConnectionState::Open {
                since: Instant::now(),
            },
        );
        self.metrics.connection_opened();
        self.handler.on_event(ConnectionEvent::Connected);

        let period = self.config.keepalive_interval;
        let mut keepalive = interval_at(tokio::time::Instant::now() + period, period);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut probes = Probes::default();

        loop {
            tokio::select! {
                biased;

                () = token.cancelled() => {
                    let frame = CloseFrame {
                        code: CloseCode::Normal,
                        reason: CLIENT_DISCONNECT_REASON.into(),
                    };
                    _ = write.send(Message::Close(Some(frame))).await;
                    return Exit::Cancelled;
                }

                message = read.next() => match message {
                    Some(Ok(Message::Text(text))) => {
                        #[cfg(feature = "tracing")]
                        tracing::trace!(%text, "Received WebSocket text message");

                        match self.handler.on_text(text.as_str()) {
                            Reaction::Reply(reply) => {
                                if let Err(e) = write.send(Message::Text(reply.into())).await {
                                    return self.transport_failed(&e);
                                }
                            }
                            Reaction::ProbeAnswered { sent_at: Some(sent_at) } => {
                                self.probe_answered(&mut probes, sent_at);
                            }
                            _ => {}
                        }
                    }
                    Some(Ok(Message::Pong(payload))) => {
                        if let Some(sent_at) = decode_probe(&payload) {
                            self.probe_answered(&mut probes, sent_at);
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = frame.map_or_else(
                            || (NO_STATUS_RECEIVED, String::new()),
                            |f| (u16::from(f.code), f.reason.as_str().to_owned()),
                        );
                        return Exit::Closed { code, reason };
                    }
                    Some(Ok(_)) => {
                        // Binary frames carry nothing for us; pings are answered by tungstenite.
                    }
                    Some(Err(e)) => return self.transport_failed(&e),
                    None => {
                        return Exit::Closed {
                            code: ABNORMAL_CLOSURE,
                            reason: String::new(),
                        };
                    }
                },

                Some(text) = outbound.recv() => {
                    if let Err(e) = write.send(Message::Text(text.into())).await {
                        return self.transport_failed(&e);
                    }
                }

                _ = keepalive.tick() => {
                    let now = now_millis();
                    if let Some(limit) = self.config.stale_after
                        && let Some(waiting) = probes.oldest_pending(now)
                        && waiting > limit
                    {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(?waiting, "Keep-alive timeout, dropping connection");
                        return Exit::Closed {
                            code: ABNORMAL_CLOSURE,
                            reason: "keep-alive timeout".to_owned(),
                        };
                    }

                    probes.sent(now);
                    let payload = encode_probe(now).to_vec();
                    if let Err(e) = write.send(Message::Ping(payload.into())).await {
                        return self.transport_failed(&e);
                    }
                }
            }
        }
    }

    fn probe_answered(&self, probes: &mut Probes, sent_at: i64) {
        let now = now_millis();
        if probes.answered(sent_at) {
            self.metrics.record_latency(round_trip(sent_at, now));
        }
    }

    fn transport_failed(&self, error: &tokio_tungstenite::tungstenite::Error) -> Exit {
        #[cfg(feature = "tracing")]
        tracing::warn!(%error, "WebSocket transport error");
        self.handler
            .on_event(ConnectionEvent::Error(error.to_string()));

        Exit::Closed {
            code: ABNORMAL_CLOSURE,
            reason: String::new(),
        }
    }

    /// Move a first attempt that never opened back to
    /// [`ConnectionState::Disconnected`].
    fn abandon_initial(&self, token: &CancellationToken) {
        if token.is_cancelled() {
            return;
        }
        self.state_tx.send_if_modified(|state| {
            replace_if(
                state,
                ConnectionState::Connecting,
                ConnectionState::Disconnected,
            )
        });
    }

    /// Wait out the backoff schedule until a transport opens.
    ///
    /// Returns `None` when the session was cancelled or the budget ran out.
    async fn reconnect(
        &self,
        schedule: &mut ReconnectSchedule,
        token: &CancellationToken,
    ) -> Option<WsStream> {
        drain_retry(&self.retry_now);

        loop {
            let Some((attempt, delay)) = schedule.next_attempt() else {
                self.give_up(
                    token,
                    ReconnectFailure::AttemptsExhausted {
                        attempts: schedule.attempts(),
                    },
                );
                return None;
            };

            self.set_state(token, ConnectionState::Reconnecting { attempt });
            self.metrics.record_reconnect_attempt();
            #[cfg(feature = "tracing")]
            tracing::debug!(attempt, ?delay, "Scheduling reconnect");
            self.handler
                .on_event(ConnectionEvent::Reconnecting { attempt, delay });

            tokio::select! {
                biased;
                () = token.cancelled() => return None,
                () = sleep(delay) => {}
                () = self.retry_now.notified() => {}
            }

            self.set_state(token, ConnectionState::Connecting);
            let result = tokio::select! {
                biased;
                () = token.cancelled() => return None,
                result = connect_async(self.endpoint.as_str()) => result,
            };

            match result {
                Ok((stream, _)) => return Some(stream),
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(attempt, error = %e, "Reconnect attempt failed");
                    self.handler
                        .on_event(ConnectionEvent::Error(e.to_string()));
                }
            }
        }
    }

    fn give_up(&self, token: &CancellationToken, failure: ReconnectFailure) {
        if token.is_cancelled() {
            return;
        }

        #[cfg(feature = "tracing")]
        tracing::warn!(?failure, "Giving up on the connection");
        self.set_state(token, ConnectionState::Closed);
        self.handler
            .on_event(ConnectionEvent::ReconnectFailed(failure));
    }
}
