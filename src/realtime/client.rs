use std::env;
use std::fmt;
use std::sync::Arc;

use async_stream::try_stream;
use futures::{Stream, StreamExt as _};
use secrecy::{ExposeSecret as _, SecretString};
use tokio::sync::{broadcast, watch};
use tokio::sync::broadcast::error::RecvError;
use url::Url;

use super::events::Event;
use super::handler::Dispatcher;
use super::notify::{NoopNotifier, Notifier};
use super::subscription::{SubscriptionManager, Subscriptions};
use super::types::request::{OutboundFrame, PreferencesUpdate};
use super::types::response::{
    CoachingSuggestion, MatchUpdate, PerformanceUpdate, RankUpdate, ServerError,
    SystemNotification,
};
use crate::Result;
use crate::error::Error;
use crate::ws::config::Config;
use crate::ws::connection::{ConnectionManager, ConnectionState};
use crate::ws::{Metrics, MetricsSnapshot, WsError};

/// Broadcast channel capacity for caller-facing events.
const EVENT_CAPACITY: usize = 1024;

/// Environment variable holding the user id, read by [`Identity::from_env`].
pub const USER_ID_VAR: &str = "HERALD_USER_ID";
/// Environment variable holding the bearer token, read by [`Identity::from_env`].
pub const TOKEN_VAR: &str = "HERALD_TOKEN";

/// Who the connection is opened for.
///
/// The token is kept in a [`SecretString`] and never shown by `Debug`.
#[non_exhaustive]
#[derive(Clone)]
pub struct Identity {
    pub user_id: String,
    pub token: SecretString,
}

impl Identity {
    pub fn new<U: Into<String>, T: Into<String>>(user_id: U, token: T) -> Result<Self> {
        let user_id = user_id.into();
        if user_id.trim().is_empty() {
            return Err(Error::validation("user id must not be empty"));
        }

        Ok(Self {
            user_id,
            token: SecretString::from(token.into()),
        })
    }

    /// Read the identity from `HERALD_USER_ID` and `HERALD_TOKEN`.
    pub fn from_env() -> Result<Self> {
        let user_id = env::var(USER_ID_VAR)
            .map_err(|e| Error::validation(format!("{USER_ID_VAR}: {e}")))?;
        let token =
            env::var(TOKEN_VAR).map_err(|e| Error::validation(format!("{TOKEN_VAR}: {e}")))?;

        Self::new(user_id, token)
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("user_id", &self.user_id)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Build the WebSocket URL for `identity` from a base URL.
///
/// `http` becomes `ws` and `https` becomes `wss`; `ws` and `wss` are kept and
/// any other scheme is rejected. Existing query parameters are preserved and
/// `user_id` and `token` are appended.
pub fn endpoint(base: &str, identity: &Identity) -> Result<Url> {
    let mut url = Url::parse(base)?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(Error::validation(format!("unsupported scheme {other}"))),
    };
    url.set_scheme(scheme)
        .map_err(|()| Error::validation(format!("cannot use scheme {scheme} for {base}")))?;

    url.query_pairs_mut()
        .append_pair("user_id", &identity.user_id)
        .append_pair("token", identity.token.expose_secret());

    Ok(url)
}

/// Real-time update client for gaming-session events.
///
/// Owns one reconnecting WebSocket connection, the desired subscription state
/// that is replayed every time the connection opens, and the event stream.
/// Cloning is cheap; clones share the same connection.
///
/// # Examples
///
/// ```rust, no_run
/// use futures::StreamExt as _;
/// use herald_realtime::realtime::{Client, Event, Identity};
/// use herald_realtime::ws::Config;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let identity = Identity::from_env()?;
///     let client = Client::new("https://live.herald.lol/ws", identity, Config::default())?;
///
///     let mut events = Box::pin(client.events());
///     client.connect().await?;
///     client.subscribe_global();
///     client.watch_match("EUW1_6543210");
///
///     while let Some(event) = events.next().await {
///         if let Event::MatchUpdate(update) = event? {
///             println!("{} at {}s", update.status, update.game_time);
///         }
///     }
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    identity: Identity,
    connection: ConnectionManager<Dispatcher>,
    subscriptions: Arc<SubscriptionManager>,
    events: broadcast::Sender<Event>,
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        self.connection.shutdown();
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("identity", &self.inner.identity)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client for `base_url`. No connection is made until
    /// [`Client::connect`].
    pub fn new(base_url: &str, identity: Identity, config: Config) -> Result<Self> {
        Self::with_notifier(base_url, identity, config, Arc::new(NoopNotifier))
    }

    /// Like [`Client::new`], delivering rank promotions and demotions to `notifier`.
    pub fn with_notifier(
        base_url: &str,
        identity: Identity,
        config: Config,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let url = endpoint(base_url, &identity)?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let metrics = Arc::new(Metrics::new());
        let subscriptions = Arc::new(SubscriptionManager::new());

        let dispatcher = Dispatcher::new(
            Arc::clone(&subscriptions),
            events.clone(),
            Arc::clone(&metrics),
            notifier,
        );
        let connection = ConnectionManager::new(url, config, Arc::new(dispatcher), metrics);

        Ok(Self {
            inner: Arc::new(ClientInner {
                identity,
                connection,
                subscriptions,
                events,
            }),
        })
    }

    /// Open the connection and replay the desired subscription state.
    ///
    /// Returns once the connection is open. A no-op while already open or
    /// connecting. A failure of this first attempt is returned and not retried;
    /// later drops are retried automatically.
    pub async fn connect(&self) -> Result<()> {
        self.inner.connection.connect().await
    }

    /// Close the connection on purpose and forget every subscription.
    ///
    /// No reconnect follows; call [`Client::connect`] to start over.
    pub async fn disconnect(&self) {
        self.inner.connection.disconnect().await;
        self.inner.subscriptions.clear();
    }

    /// Send a registry change if the registry says it must go out now.
    fn apply(&self, frame: Option<OutboundFrame>) {
        if let Some(frame) = frame
            && let Err(e) = self.inner.connection.queue(&frame)
        {
            self.send_failed(&frame, &e);
        }
    }

    fn send_failed(&self, frame: &OutboundFrame, error: &Error) {
        #[cfg(feature = "tracing")]
        tracing::warn!(action = %frame.action, %error, "Failed to send frame");
        _ = self.inner.events.send(Event::SendError {
            action: frame.action,
            reason: error.to_string(),
        });
    }

    /// Receive the user's global update feed.
    pub fn subscribe_global(&self) {
        self.apply(self.inner.subscriptions.subscribe_global());
    }

    pub fn unsubscribe_global(&self) {
        self.apply(self.inner.subscriptions.unsubscribe_global());
    }

    pub fn join_room(&self, room_id: &str) {
        self.apply(self.inner.subscriptions.join_room(room_id));
    }

    pub fn leave_room(&self, room_id: &str) {
        self.apply(self.inner.subscriptions.leave_room(room_id));
    }

    /// Receive live updates for a match.
    pub fn watch_match(&self, match_id: &str) {
        self.apply(self.inner.subscriptions.watch_match(match_id));
    }

    pub fn unwatch_match(&self, match_id: &str) {
        self.apply(self.inner.subscriptions.unwatch_match(match_id));
    }

    /// Change some notification preferences; the merged record is sent.
    pub fn update_preferences(&self, update: PreferencesUpdate) {
        self.apply(self.inner.subscriptions.update_preferences(&update));
    }

    /// Ask the server for connection statistics.
    ///
    /// Reported as [`Event::SendError`] when the connection is not open.
    pub fn request_stats(&self) {
        let frame = OutboundFrame::get_stats();
        if let Err(e) = self.inner.connection.send(&frame) {
            self.send_failed(&frame, &e);
        }
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.connection.state()
    }

    /// Subscribe to connection state changes.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection.state_receiver()
    }

    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.connection.metrics().snapshot()
    }

    pub fn reset_metrics(&self) {
        self.inner.connection.metrics().reset();
    }

    /// Desired subscription state, as it will be replayed on the next open.
    #[must_use]
    pub fn subscriptions(&self) -> Subscriptions {
        self.inner.subscriptions.snapshot()
    }

    /// Stream of every [`Event`] from now on.
    ///
    /// Each call returns an independent stream. A stream that falls behind
    /// yields [`WsError::Lagged`] and then continues with newer events.
    pub fn events(&self) -> impl Stream<Item = Result<Event>> + use<> {
        let mut rx = self.inner.events.subscribe();

        try_stream! {
            loop {
                match rx.recv().await {
                    Ok(event) => yield event,
                    Err(RecvError::Lagged(count)) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!("Event stream lagged, missed {count} events");
                        Err(WsError::Lagged { count })?;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    fn typed<T>(&self, select: fn(Event) -> Option<T>) -> impl Stream<Item = Result<T>> + use<T> {
        self.events().filter_map(move |event| async move {
            match event {
                Ok(event) => select(event).map(Ok),
                Err(e) => Some(Err(e)),
            }
        })
    }

    pub fn match_updates(&self) -> impl Stream<Item = Result<MatchUpdate>> + use<> {
        self.typed(|event| match event {
            Event::MatchUpdate(update) => Some(update),
            _ => None,
        })
    }

    pub fn performance_updates(&self) -> impl Stream<Item = Result<PerformanceUpdate>> + use<> {
        self.typed(|event| match event {
            Event::PerformanceUpdate(update) => Some(update),
            _ => None,
        })
    }

    pub fn rank_updates(&self) -> impl Stream<Item = Result<RankUpdate>> + use<> {
        self.typed(|event| match event {
            Event::RankUpdate { update, .. } => Some(update),
            _ => None,
        })
    }

    pub fn coaching_suggestions(&self) -> impl Stream<Item = Result<CoachingSuggestion>> + use<> {
        self.typed(|event| match event {
            Event::CoachingSuggestion(suggestion) => Some(suggestion),
            _ => None,
        })
    }

    pub fn system_notifications(&self) -> impl Stream<Item = Result<SystemNotification>> + use<> {
        self.typed(|event| match event {
            Event::SystemNotification(notification) => Some(notification),
            _ => None,
        })
    }

    pub fn server_errors(&self) -> impl Stream<Item = Result<ServerError>> + use<> {
        self.typed(|event| match event {
            Event::ServerError(error) => Some(error),
            _ => None,
        })
    }
}
