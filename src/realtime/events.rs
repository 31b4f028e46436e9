use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::rank::RankChange;
use super::types::request::Action;
use super::types::response::{
    CoachingSuggestion, Envelope, MatchUpdate, PerformanceUpdate, RankUpdate, ServerError,
    SystemNotification,
};
use crate::ws::ReconnectFailure;

/// Everything the client reports to its caller, in the order it happened.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub enum Event {
    /// The transport opened and the subscription state was replayed
    Connected,
    /// The transport closed, on purpose or not
    Disconnected { code: u16, reason: String },
    /// A reconnect attempt has been scheduled after `delay`
    Reconnecting { attempt: u32, delay: Duration },
    /// The client gave up; [`super::Client::connect`] is needed to resume
    ReconnectFailed(ReconnectFailure),
    /// Transport-level error; a close event follows when the transport drops
    Error(String),

    /// Every well-formed frame of a known type, before its typed event
    Message(Arc<Envelope>),
    MatchUpdate(MatchUpdate),
    PerformanceUpdate(PerformanceUpdate),
    /// Rank update, with the promotion or demotion it represents if any
    RankUpdate {
        update: RankUpdate,
        change: Option<RankChange>,
    },
    FriendActivity(Map<String, Value>),
    LiveMatch(Map<String, Value>),
    CoachingSuggestion(CoachingSuggestion),
    ChampionMastery(Map<String, Value>),
    SystemNotification(SystemNotification),
    /// The server reported an error for one of our requests
    ServerError(ServerError),
    /// The server probed us; a pong has already been sent
    Ping { timestamp: DateTime<Utc> },

    /// A frame could not be sent because no transport is open
    SendError { action: Action, reason: String },
    /// An inbound frame could not be decoded and was dropped
    ParseError { reason: String },
}
