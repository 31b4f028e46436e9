//! Classification of inbound text frames.
//!
//! [`route`] is pure: it decodes a frame into a [`Routed`] value and leaves
//! counting, replying and dispatch to the caller.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::types::response::{
    CoachingSuggestion, Envelope, InboundType, MatchUpdate, PerformanceUpdate, ProbeEcho,
    RankUpdate, ServerError, SystemNotification,
};
use crate::Result;
use crate::serde_helpers::deserialize_with_warnings;
use crate::ws::WsError;

/// Typed payload of a known inbound frame.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    MatchUpdate(MatchUpdate),
    PerformanceUpdate(PerformanceUpdate),
    RankUpdate(RankUpdate),
    FriendActivity(Map<String, Value>),
    LiveMatch(Map<String, Value>),
    CoachingSuggestion(CoachingSuggestion),
    ChampionMastery(Map<String, Value>),
    SystemNotification(SystemNotification),
    ServerError(ServerError),
}

/// Outcome of routing one well-formed frame.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub enum Routed {
    /// Answer to one of our liveness probes; consumed by keep-alive only
    ProbeResponse {
        /// Probe send time echoed back, if the server included it
        sent_at: Option<i64>,
    },
    /// Server liveness probe; must be answered and is also forwarded
    Ping(Box<Envelope>),
    /// Known domain frame
    Message {
        envelope: Box<Envelope>,
        payload: Inbound,
    },
    /// Frame type this client does not know
    Unknown(Box<Envelope>),
}

fn decode<T: DeserializeOwned>(envelope: &Envelope) -> Result<T> {
    deserialize_with_warnings(&envelope.data)
}

/// Decode and classify one inbound text frame.
///
/// Fails when the frame is not a valid envelope or when a known type carries
/// a payload of the wrong shape.
pub fn route(text: &str) -> Result<Routed> {
    let envelope: Envelope = serde_json::from_str(text).map_err(WsError::MessageParse)?;

    let payload = match envelope.kind {
        InboundType::Pong => {
            let echo: Option<ProbeEcho> = decode(&envelope)?;
            return Ok(Routed::ProbeResponse {
                sent_at: echo.and_then(|echo| echo.timestamp),
            });
        }
        InboundType::Ping => return Ok(Routed::Ping(Box::new(envelope))),
        InboundType::Unknown(_) => return Ok(Routed::Unknown(Box::new(envelope))),
        InboundType::MatchUpdate => Inbound::MatchUpdate(decode(&envelope)?),
        InboundType::PerformanceUpdate => Inbound::PerformanceUpdate(decode(&envelope)?),
        InboundType::RankUpdate => Inbound::RankUpdate(decode(&envelope)?),
        InboundType::FriendActivity => Inbound::FriendActivity(decode(&envelope)?),
        InboundType::LiveMatch => Inbound::LiveMatch(decode(&envelope)?),
        InboundType::CoachingSuggestion => Inbound::CoachingSuggestion(decode(&envelope)?),
        InboundType::ChampionMastery => Inbound::ChampionMastery(decode(&envelope)?),
        InboundType::SystemNotification => Inbound::SystemNotification(decode(&envelope)?),
        InboundType::Error => Inbound::ServerError(decode(&envelope)?),
    };

    Ok(Routed::Message {
        envelope: Box::new(envelope),
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(kind: &str, data: &Value) -> String {
        serde_json::json!({
            "type": kind,
            "data": data,
            "timestamp": "2024-05-01T10:30:00Z",
            "id": "evt-1",
        })
        .to_string()
    }

    #[test]
    fn pong_is_a_probe_response() {
        let routed = route(&frame("pong", &serde_json::json!({"timestamp": 1_000}))).unwrap();
        assert!(
            matches!(routed, Routed::ProbeResponse { sent_at: Some(1_000) }),
            "got {routed:?}"
        );

        let routed = route(&frame("pong", &Value::Null)).unwrap();
        assert!(
            matches!(routed, Routed::ProbeResponse { sent_at: None }),
            "got {routed:?}"
        );
    }

    #[test]
    fn ping_is_routed_for_reply() {
        let routed = route(&frame("ping", &Value::Null)).unwrap();
        assert!(matches!(routed, Routed::Ping(_)), "got {routed:?}");
    }

    #[test]
    fn rank_update_is_typed() {
        let routed = route(&frame(
            "rank_update",
            &serde_json::json!({"old_rank": "GOLD II", "new_rank": "GOLD I"}),
        ))
        .unwrap();

        match routed {
            Routed::Message {
                payload: Inbound::RankUpdate(update),
                ..
            } => assert_eq!(update.new_rank, "GOLD I"),
            other => panic!("expected a rank update, got {other:?}"),
        }
    }

    #[test]
    fn match_update_with_null_items_is_typed() {
        let routed = route(&frame(
            "match_update",
            &serde_json::json!({
                "game_id": "EUW1_6543210",
                "status": "in_progress",
                "game_time": 754,
                "participants": [
                    {"summoner_name": "Caps", "champion_name": "Sylas", "items": null, "kda": 6.5}
                ],
                "team_stats": {"blue_team": {"kills": 5}, "red_team": {"kills": 2}}
            }),
        ))
        .unwrap();

        match routed {
            Routed::Message {
                payload: Inbound::MatchUpdate(update),
                ..
            } => {
                assert_eq!(update.participants[0].champion_name, "Sylas");
                assert!(update.participants[0].items.is_empty(), "null items are empty");
            }
            other => panic!("expected a match update, got {other:?}"),
        }
    }

    #[test]
    fn rank_update_with_series_is_typed() {
        let routed = route(&frame(
            "rank_update",
            &serde_json::json!({
                "old_rank": "GOLD I",
                "new_rank": "GOLD I",
                "lp": 100,
                "series": {"target": "PLATINUM IV", "wins": 1, "losses": 0, "progress": "WNN"}
            }),
        ))
        .unwrap();

        match routed {
            Routed::Message {
                payload: Inbound::RankUpdate(update),
                ..
            } => assert_eq!(update.series.unwrap().target, "PLATINUM IV"),
            other => panic!("expected a rank update, got {other:?}"),
        }
    }

    #[test]
    fn server_error_is_typed() {
        let routed = route(&frame(
            "error",
            &serde_json::json!({"error": "Invalid message format"}),
        ))
        .unwrap();

        match routed {
            Routed::Message {
                payload: Inbound::ServerError(error),
                ..
            } => assert_eq!(error.error, "Invalid message format"),
            other => panic!("expected a server error, got {other:?}"),
        }
    }

    #[test]
    fn untyped_categories_keep_their_object() {
        let routed = route(&frame(
            "friend_activity",
            &serde_json::json!({"friend": "Caps", "activity": "in_game"}),
        ))
        .unwrap();

        match routed {
            Routed::Message {
                payload: Inbound::FriendActivity(data),
                envelope,
            } => {
                assert_eq!(data.get("friend"), Some(&Value::from("Caps")));
                assert_eq!(envelope.id, "evt-1");
            }
            other => panic!("expected friend activity, got {other:?}"),
        }
    }

    #[test]
    fn unknown_type_is_not_an_error() {
        let routed = route(&frame("room_joined", &serde_json::json!({"room_id": "r1"}))).unwrap();
        assert!(matches!(routed, Routed::Unknown(_)), "got {routed:?}");
    }

    #[test]
    fn malformed_frames_fail() {
        assert!(route("not json").is_err(), "not JSON");
        assert!(route(r#"{"data": {}}"#).is_err(), "no type");
        assert!(
            route(&frame("rank_update", &serde_json::json!({"new_rank": "GOLD I"}))).is_err(),
            "rank update without old rank"
        );
        assert!(
            route(&frame("system_notification", &Value::from(42))).is_err(),
            "notification that is not an object"
        );
    }
}
