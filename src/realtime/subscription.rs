#![expect(
    clippy::module_name_repetitions,
    reason = "Subscription types deliberately include the module name for clarity"
)]

use std::sync::{Mutex, MutexGuard, PoisonError};

use super::types::request::{OutboundFrame, Preferences, PreferencesUpdate};

/// What the client wants the server to push, independent of whether a
/// transport is currently open.
///
/// Rooms and matches are sets that remember insertion order, so replay is
/// deterministic.
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subscriptions {
    pub global: bool,
    pub rooms: Vec<String>,
    pub matches: Vec<String>,
    pub preferences: Preferences,
}

impl Subscriptions {
    /// Frames that rebuild this state on a fresh transport: global feed,
    /// rooms, matches, then preferences when they differ from the defaults.
    #[must_use]
    pub fn replay(&self) -> Vec<OutboundFrame> {
        let mut frames = Vec::with_capacity(self.rooms.len() + self.matches.len() + 2);

        if self.global {
            frames.push(OutboundFrame::subscribe());
        }
        frames.extend(self.rooms.iter().map(OutboundFrame::join_room));
        frames.extend(self.matches.iter().map(OutboundFrame::watch_match));
        if !self.preferences.is_default() {
            frames.push(OutboundFrame::update_preferences(self.preferences));
        }

        frames
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn insert(set: &mut Vec<String>, id: &str) -> bool {
    if set.iter().any(|existing| existing == id) {
        return false;
    }
    set.push(id.to_owned());
    true
}

fn remove(set: &mut Vec<String>, id: &str) -> bool {
    let before = set.len();
    set.retain(|existing| existing != id);
    set.len() != before
}

#[derive(Debug, Default)]
struct Registry {
    desired: Subscriptions,
    /// Set while a transport is open; mutations made while unset are left
    /// to the next replay.
    live: bool,
}

/// Desired subscription state shared by the caller and the connection task.
///
/// Every mutator updates the desired state and returns the frame to send
/// only when the state changed and a transport is open. When no transport is
/// open the change is carried by the replay that follows the next open, so
/// nothing is lost and nothing is sent twice.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    registry: Mutex<Registry>,
}

impl SubscriptionManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mutate<F>(&self, change: F) -> Option<OutboundFrame>
    where
        F: FnOnce(&mut Subscriptions) -> Option<OutboundFrame>,
    {
        let mut registry = self.registry();
        let frame = change(&mut registry.desired)?;
        registry.live.then_some(frame)
    }

    pub fn subscribe_global(&self) -> Option<OutboundFrame> {
        self.mutate(|desired| {
            (!desired.global).then(|| {
                desired.global = true;
                OutboundFrame::subscribe()
            })
        })
    }

    pub fn unsubscribe_global(&self) -> Option<OutboundFrame> {
        self.mutate(|desired| {
            desired.global.then(|| {
                desired.global = false;
                OutboundFrame::unsubscribe()
            })
        })
    }

    pub fn join_room(&self, room_id: &str) -> Option<OutboundFrame> {
        self.mutate(|desired| {
            insert(&mut desired.rooms, room_id).then(|| OutboundFrame::join_room(room_id))
        })
    }

    pub fn leave_room(&self, room_id: &str) -> Option<OutboundFrame> {
        self.mutate(|desired| {
            remove(&mut desired.rooms, room_id).then(|| OutboundFrame::leave_room(room_id))
        })
    }

    pub fn watch_match(&self, match_id: &str) -> Option<OutboundFrame> {
        self.mutate(|desired| {
            insert(&mut desired.matches, match_id).then(|| OutboundFrame::watch_match(match_id))
        })
    }

    pub fn unwatch_match(&self, match_id: &str) -> Option<OutboundFrame> {
        self.mutate(|desired| {
            remove(&mut desired.matches, match_id).then(|| OutboundFrame::unwatch_match(match_id))
        })
    }

    /// Merge `update` into the stored preferences; the frame carries the full
    /// merged record.
    pub fn update_preferences(&self, update: &PreferencesUpdate) -> Option<OutboundFrame> {
        self.mutate(|desired| {
            desired
                .preferences
                .merge(update)
                .then_some(OutboundFrame::update_preferences(desired.preferences))
        })
    }

    /// Mark the transport open and return the frames that rebuild the
    /// desired state on it.
    ///
    /// The flag flips under the same lock as the snapshot, so a concurrent
    /// mutation lands either in this replay or in its own frame, never both.
    pub fn go_live(&self) -> Vec<OutboundFrame> {
        let mut registry = self.registry();
        registry.live = true;
        registry.desired.replay()
    }

    pub fn go_offline(&self) {
        self.registry().live = false;
    }

    /// Forget everything. Used after an intentional disconnect.
    pub fn clear(&self) {
        self.registry().desired = Subscriptions::default();
    }

    #[must_use]
    pub fn snapshot(&self) -> Subscriptions {
        self.registry().desired.clone()
    }
}
