#![expect(
    clippy::module_name_repetitions,
    reason = "Re-exported names intentionally match their modules for API clarity"
)]

//! Real-time update client for gaming sessions.
//!
//! [`Client`] keeps one WebSocket connection to the update service open,
//! remembers what the caller subscribed to and replays it every time the
//! connection (re)opens, then turns inbound frames into typed [`Event`]s.
//!
//! # Update categories
//!
//! - **Match updates**: live state of a watched match
//! - **Performance updates**: per-player scoring with suggestions
//! - **Rank updates**: tier and division changes, with promotion detection
//! - **Coaching suggestions** and **system notifications**
//! - **Friend activity**, **live match** and **champion mastery**, passed through untyped
//!
//! # Example
//!
//! ```rust, no_run
//! use std::sync::Arc;
//!
//! use futures::StreamExt as _;
//! use herald_realtime::realtime::{Client, Identity, RankChange};
//! use herald_realtime::ws::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let notifier = Arc::new(|change: &RankChange| println!("{}", change.summary()));
//!     let client = Client::with_notifier(
//!         "https://live.herald.lol/ws",
//!         Identity::from_env()?,
//!         Config::default(),
//!         notifier,
//!     )?;
//!
//!     client.connect().await?;
//!     client.subscribe_global();
//!
//!     let mut ranks = Box::pin(client.rank_updates());
//!     while let Some(update) = ranks.next().await {
//!         let update = update?;
//!         println!("{} -> {}", update.old_rank, update.new_rank);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod events;
pub(crate) mod handler;
pub mod notify;
pub mod rank;
pub mod router;
pub mod subscription;
pub mod types;

pub use client::{Client, Identity, endpoint};
pub use events::Event;
pub use notify::{NoopNotifier, Notifier};
pub use rank::{Direction, Division, Rank, RankChange, Tier};
pub use subscription::{SubscriptionManager, Subscriptions};
pub use types::request::{Action, OutboundFrame, Preferences, PreferencesUpdate};
pub use types::response::{
    CoachingSuggestion, Envelope, InboundType, MatchUpdate, Participant, PerformanceUpdate,
    RankUpdate, RankedSeries, ServerError, SystemNotification, TeamData, TeamStats,
};
