use bon::Builder;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Outbound action vocabulary.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Action {
    /// Subscribe to the user's global update feed
    Subscribe,
    /// Leave the global update feed
    Unsubscribe,
    JoinRoom,
    LeaveRoom,
    WatchMatch,
    UnwatchMatch,
    /// Replace the server-side notification preferences
    UpdatePreferences,
    /// Answer to a server liveness probe
    Pong,
    /// Ask the server for connection statistics
    GetStats,
}

/// Payload attached to an outbound frame.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FrameData {
    Room { room_id: String },
    Match { match_id: String },
    Preferences(Preferences),
    Pong { timestamp: i64 },
}

/// Client-to-server frame: `{ "action": ..., "data": ... }`.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OutboundFrame {
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<FrameData>,
}

impl OutboundFrame {
    const fn bare(action: Action) -> Self {
        Self { action, data: None }
    }

    #[must_use]
    pub const fn subscribe() -> Self {
        Self::bare(Action::Subscribe)
    }

    #[must_use]
    pub const fn unsubscribe() -> Self {
        Self::bare(Action::Unsubscribe)
    }

    #[must_use]
    pub fn join_room<S: Into<String>>(room_id: S) -> Self {
        Self {
            action: Action::JoinRoom,
            data: Some(FrameData::Room {
                room_id: room_id.into(),
            }),
        }
    }

    #[must_use]
    pub fn leave_room<S: Into<String>>(room_id: S) -> Self {
        Self {
            action: Action::LeaveRoom,
            data: Some(FrameData::Room {
                room_id: room_id.into(),
            }),
        }
    }

    #[must_use]
    pub fn watch_match<S: Into<String>>(match_id: S) -> Self {
        Self {
            action: Action::WatchMatch,
            data: Some(FrameData::Match {
                match_id: match_id.into(),
            }),
        }
    }

    #[must_use]
    pub fn unwatch_match<S: Into<String>>(match_id: S) -> Self {
        Self {
            action: Action::UnwatchMatch,
            data: Some(FrameData::Match {
                match_id: match_id.into(),
            }),
        }
    }

    /// Carries the full preference record, not just the changed fields.
    #[must_use]
    pub const fn update_preferences(preferences: Preferences) -> Self {
        Self {
            action: Action::UpdatePreferences,
            data: Some(FrameData::Preferences(preferences)),
        }
    }

    /// Reply to a server ping, stamped with the client clock in epoch milliseconds.
    #[must_use]
    pub const fn pong(timestamp: i64) -> Self {
        Self {
            action: Action::Pong,
            data: Some(FrameData::Pong { timestamp }),
        }
    }

    #[must_use]
    pub const fn get_stats() -> Self {
        Self::bare(Action::GetStats)
    }

    /// JSON text of the frame.
    ///
    /// Serializing an [`OutboundFrame`] cannot fail: every field is a string,
    /// integer or boolean.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Which categories of updates the server should push.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[expect(
    clippy::struct_excessive_bools,
    reason = "Mirrors the server's preference record"
)]
pub struct Preferences {
    pub match_updates: bool,
    pub rank_updates: bool,
    pub friend_activity: bool,
    pub coaching_suggestions: bool,
    pub system_notifications: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            match_updates: true,
            rank_updates: true,
            friend_activity: true,
            coaching_suggestions: true,
            system_notifications: true,
        }
    }
}

impl Preferences {
    #[must_use]
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the fields present in `update`, returning whether anything changed.
    pub fn merge(&mut self, update: &PreferencesUpdate) -> bool {
        let before = *self;

        let fields = [
            (&mut self.match_updates, update.match_updates),
            (&mut self.rank_updates, update.rank_updates),
            (&mut self.friend_activity, update.friend_activity),
            (&mut self.coaching_suggestions, update.coaching_suggestions),
            (&mut self.system_notifications, update.system_notifications),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                *field = value;
            }
        }

        before != *self
    }
}

/// Partial preference change; absent fields keep their current value.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Builder)]
pub struct PreferencesUpdate {
    pub match_updates: Option<bool>,
    pub rank_updates: Option<bool>,
    pub friend_activity: Option<bool>,
    pub coaching_suggestions: Option<bool>,
    pub system_notifications: Option<bool>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn as_value(frame: &OutboundFrame) -> serde_json::Value {
        serde_json::from_str(&frame.to_json()).unwrap()
    }

    #[test]
    fn bare_actions_omit_data() {
        assert_eq!(
            as_value(&OutboundFrame::subscribe()),
            json!({"action": "subscribe"})
        );
        assert_eq!(
            as_value(&OutboundFrame::get_stats()),
            json!({"action": "get_stats"})
        );
    }

    #[test]
    fn room_and_match_frames_carry_their_id() {
        assert_eq!(
            as_value(&OutboundFrame::join_room("r1")),
            json!({"action": "join_room", "data": {"room_id": "r1"}})
        );
        assert_eq!(
            as_value(&OutboundFrame::unwatch_match("m42")),
            json!({"action": "unwatch_match", "data": {"match_id": "m42"}})
        );
    }

    #[test]
    fn pong_carries_timestamp() {
        assert_eq!(
            as_value(&OutboundFrame::pong(1_700_000_000_000)),
            json!({"action": "pong", "data": {"timestamp": 1_700_000_000_000_i64}})
        );
    }

    #[test]
    fn preferences_frame_sends_full_record() {
        let mut preferences = Preferences::default();
        preferences.merge(&PreferencesUpdate::builder().rank_updates(false).build());

        assert_eq!(
            as_value(&OutboundFrame::update_preferences(preferences)),
            json!({
                "action": "update_preferences",
                "data": {
                    "match_updates": true,
                    "rank_updates": false,
                    "friend_activity": true,
                    "coaching_suggestions": true,
                    "system_notifications": true,
                }
            })
        );
    }

    #[test]
    fn merge_reports_change_only_when_values_differ() {
        let mut preferences = Preferences::default();

        assert!(!preferences.merge(&PreferencesUpdate::builder().match_updates(true).build()));
        assert!(preferences.is_default());

        assert!(preferences.merge(&PreferencesUpdate::builder().friend_activity(false).build()));
        assert!(!preferences.friend_activity);
        assert!(!preferences.is_default());

        assert!(!preferences.merge(&PreferencesUpdate::default()));
    }

    #[test]
    fn action_display_matches_wire_name() {
        assert_eq!(Action::UpdatePreferences.to_string(), "update_preferences");
        assert_eq!(Action::JoinRoom.to_string(), "join_room");
    }
}
