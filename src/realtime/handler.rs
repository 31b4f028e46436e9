use std::sync::Arc;

use tokio::sync::broadcast;

use super::events::Event;
use super::notify::Notifier;
use super::router::{Inbound, Routed, route};
use super::subscription::SubscriptionManager;
use super::types::request::OutboundFrame;
use crate::ws::keepalive::now_millis;
use crate::ws::{ConnectionEvent, FrameHandler, Metrics, Reaction};

/// Frame handler for the gaming-session vocabulary.
///
/// Replays the subscription registry when the transport opens, routes every
/// inbound frame, keeps the counters and publishes [`Event`]s.
pub(crate) struct Dispatcher {
    subscriptions: Arc<SubscriptionManager>,
    events: broadcast::Sender<Event>,
    metrics: Arc<Metrics>,
    notifier: Arc<dyn Notifier>,
}

impl Dispatcher {
    pub(crate) fn new(
        subscriptions: Arc<SubscriptionManager>,
        events: broadcast::Sender<Event>,
        metrics: Arc<Metrics>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            subscriptions,
            events,
            metrics,
            notifier,
        }
    }

    fn emit(&self, event: Event) {
        // No receivers is fine: events are best effort for observers.
        _ = self.events.send(event);
    }

    fn dispatch(&self, payload: Inbound) {
        let event = match payload {
            Inbound::MatchUpdate(update) => Event::MatchUpdate(update),
            Inbound::PerformanceUpdate(update) => Event::PerformanceUpdate(update),
            Inbound::RankUpdate(update) => {
                let change = update.change();
                if let Some(change) = &change {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(summary = %change.summary(), "Rank changed");
                    self.notifier.rank_changed(change);
                }
                Event::RankUpdate { update, change }
            }
            Inbound::FriendActivity(data) => Event::FriendActivity(data),
            Inbound::LiveMatch(data) => Event::LiveMatch(data),
            Inbound::CoachingSuggestion(suggestion) => Event::CoachingSuggestion(suggestion),
            Inbound::ChampionMastery(data) => Event::ChampionMastery(data),
            Inbound::SystemNotification(notification) => Event::SystemNotification(notification),
            Inbound::ServerError(error) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %error.error, code = ?error.code, "Server reported an error");
                Event::ServerError(error)
            }
        };
        self.emit(event);
    }
}

impl FrameHandler for Dispatcher {
    fn on_open(&self) -> Vec<String> {
        self.subscriptions
            .go_live()
            .iter()
            .map(OutboundFrame::to_json)
            .collect()
    }

    fn on_close(&self) {
        self.subscriptions.go_offline();
    }

    fn on_text(&self, text: &str) -> Reaction {
        let routed = match route(text) {
            Ok(routed) => routed,
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(%text, error = %e, "Failed to parse inbound frame");
                self.metrics.record_parse_error();
                self.emit(Event::ParseError {
                    reason: e.to_string(),
                });
                return Reaction::Nothing;
            }
        };

        self.metrics.record_message();

        match routed {
            Routed::ProbeResponse { sent_at } => Reaction::ProbeAnswered { sent_at },
            Routed::Ping(envelope) => {
                let reply = OutboundFrame::pong(now_millis()).to_json();
                self.emit(Event::Ping {
                    timestamp: envelope.timestamp,
                });
                self.emit(Event::Message(Arc::from(envelope)));
                Reaction::Reply(reply)
            }
            Routed::Message { envelope, payload } => {
                self.emit(Event::Message(Arc::from(envelope)));
                self.dispatch(payload);
                Reaction::Nothing
            }
            Routed::Unknown(envelope) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(kind = %envelope.kind, "Dropping frame of unknown type");
                #[cfg(not(feature = "tracing"))]
                let _ = &envelope;
                Reaction::Nothing
            }
        }
    }

    fn on_event(&self, event: ConnectionEvent) {
        let event = match event {
            ConnectionEvent::Connected => Event::Connected,
            ConnectionEvent::Disconnected { code, reason } => Event::Disconnected { code, reason },
            ConnectionEvent::Reconnecting { attempt, delay } => {
                Event::Reconnecting { attempt, delay }
            }
            ConnectionEvent::ReconnectFailed(failure) => Event::ReconnectFailed(failure),
            ConnectionEvent::Error(message) => Event::Error(message),
        };
        self.emit(event);
    }
}
