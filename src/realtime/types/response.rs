use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::{DefaultOnNull, serde_as};

use crate::serde_helpers::TimestampFromAny;

/// Inbound frame type.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InboundType {
    MatchUpdate,
    PerformanceUpdate,
    RankUpdate,
    FriendActivity,
    LiveMatch,
    CoachingSuggestion,
    ChampionMastery,
    SystemNotification,
    Error,
    /// Server liveness probe, must be answered
    Ping,
    /// Server answer to a client liveness probe
    Pong,
    /// A type this client does not know (captures the raw value for debugging).
    #[serde(untagged)]
    Unknown(String),
}

impl InboundType {
    /// Wire name of the type.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::MatchUpdate => "match_update",
            Self::PerformanceUpdate => "performance_update",
            Self::RankUpdate => "rank_update",
            Self::FriendActivity => "friend_activity",
            Self::LiveMatch => "live_match",
            Self::CoachingSuggestion => "coaching_suggestion",
            Self::ChampionMastery => "champion_mastery",
            Self::SystemNotification => "system_notification",
            Self::Error => "error",
            Self::Ping => "ping",
            Self::Pong => "pong",
            Self::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for InboundType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level server message wrapper.
///
/// Every inbound text frame is decoded into this struct before its `data` is
/// interpreted according to `kind`.
#[serde_as]
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: InboundType,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub match_id: Option<String>,
    #[serde(default)]
    pub room_id: Option<String>,
    /// Type-specific payload
    #[serde(default)]
    pub data: Value,
    /// RFC 3339 text or epoch milliseconds on the wire
    #[serde_as(as = "TimestampFromAny")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub id: String,
}

/// Live game state pushed for a watched match.
///
/// List fields accept `null` as empty.
#[serde_as]
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MatchUpdate {
    pub game_id: String,
    /// Game phase as reported by the server, e.g. `in_progress`
    pub status: String,
    /// Seconds since the game started
    pub game_time: u64,
    #[serde_as(as = "DefaultOnNull")]
    pub participants: Vec<Participant>,
    pub team_stats: TeamStats,
    /// Event-specific extra data (objective taken, multi-kill, ...)
    pub event_data: Option<Value>,
}

#[serde_as]
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Participant {
    pub summoner_name: String,
    pub champion_name: String,
    pub level: u32,
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    pub cs: u32,
    pub gold: u32,
    #[serde_as(as = "DefaultOnNull")]
    pub items: Vec<u32>,
    pub kda: f64,
}

#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TeamStats {
    pub blue_team: TeamData,
    pub red_team: TeamData,
}

#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TeamData {
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    pub gold: u32,
    pub dragons: u32,
    pub barons: u32,
    pub towers: u32,
    pub inhibitors: u32,
}

/// Rolling performance figures for the connected player.
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PerformanceUpdate {
    pub user_id: String,
    pub current_kda: f64,
    pub average_kda: f64,
    pub cs_per_minute: f64,
    pub vision_score: f64,
    /// Fraction of team damage, 0.0 to 1.0
    pub damage_share: f64,
    pub gold_efficiency: f64,
    #[serde(rename = "improvement_suggestion")]
    pub improvement: String,
}

/// Ranked standing change.
///
/// `old_rank` and `new_rank` are free text such as `"GOLD II"`; see
/// [`crate::realtime::rank`] for the ordering used to classify the change.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RankUpdate {
    pub old_rank: String,
    pub new_rank: String,
    /// Ranked queue, e.g. `RANKED_SOLO_5x5`
    #[serde(default)]
    pub queue: Option<String>,
    /// League points after the change
    #[serde(default)]
    pub lp: Option<i32>,
    #[serde(default)]
    pub old_lp: Option<i32>,
    #[serde(default)]
    pub new_lp: Option<i32>,
    #[serde(default)]
    pub lp_change: Option<i32>,
    /// Promotion series in progress, if any
    #[serde(default)]
    pub series: Option<RankedSeries>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RankedSeries {
    /// Rank the series promotes into, e.g. `PLATINUM IV`
    pub target: String,
    pub wins: u32,
    pub losses: u32,
    /// Game outcomes so far, e.g. `WLN` (win, loss, not played)
    pub progress: String,
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CoachingSuggestion {
    pub message: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SystemNotification {
    pub message: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Severity, e.g. `info` or `warning`
    #[serde(default)]
    pub level: Option<String>,
}

/// Error reported by the server for a previous request.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServerError {
    #[serde(alias = "message")]
    pub error: String,
    #[serde(default)]
    pub code: Option<String>,
}

/// Body of an inbound `pong`.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProbeEcho {
    /// Client send time echoed back, epoch milliseconds
    pub timestamp: Option<i64>,
}
