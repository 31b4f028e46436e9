//! Live feed explorer for the real-time update service.
//!
//! Connects with the identity from `HERALD_USER_ID` / `HERALD_TOKEN`, joins
//! the global feed and optionally watches one match, then logs every event
//! together with the session metrics.
//!
//! Run with tracing enabled:
//! ```sh
//! RUST_LOG=info,herald_realtime=debug cargo run --example live_feed --features tracing -- \
//!     https://live.herald.lol/ws EUW1_6543210
//! ```

use std::env;
use std::time::Duration;

use futures::StreamExt as _;
use herald_realtime::realtime::{Client, Event, Identity};
use herald_realtime::ws::Config;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_ENDPOINT: &str = "ws://localhost:8080/ws";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = env::args().skip(1);
    let endpoint = args.next().unwrap_or_else(|| DEFAULT_ENDPOINT.to_owned());
    let match_id = args.next();

    let client = Client::new(&endpoint, Identity::from_env()?, Config::default())?;
    let mut events = Box::pin(client.events());

    client.connect().await?;
    info!(state = ?client.state(), "Connected");

    client.subscribe_global();
    if let Some(match_id) = &match_id {
        client.watch_match(match_id);
    }
    client.request_stats();

    while let Ok(Some(event)) = timeout(Duration::from_secs(60), events.next()).await {
        match event {
            Ok(Event::MatchUpdate(update)) => info!(
                stream = "match_update",
                game_id = %update.game_id,
                status = %update.status,
                game_time = update.game_time,
                blue_kills = update.team_stats.blue_team.kills,
                red_kills = update.team_stats.red_team.kills,
            ),
            Ok(Event::PerformanceUpdate(update)) => info!(
                stream = "performance_update",
                kda = update.current_kda,
                cs_per_minute = update.cs_per_minute,
                suggestion = %update.improvement,
            ),
            Ok(Event::RankUpdate { update, change }) => info!(
                stream = "rank_update",
                old = %update.old_rank,
                new = %update.new_rank,
                change = ?change.map(|change| change.summary()),
            ),
            Ok(Event::CoachingSuggestion(suggestion)) => {
                info!(stream = "coaching", message = %suggestion.message);
            }
            Ok(Event::SystemNotification(notification)) => {
                info!(stream = "system", message = %notification.message);
            }
            Ok(Event::ServerError(error)) => warn!(error = %error.error, code = ?error.code),
            Ok(Event::Disconnected { code, reason }) => warn!(code, %reason, "Disconnected"),
            Ok(Event::Reconnecting { attempt, delay }) => {
                info!(attempt, ?delay, "Reconnecting");
            }
            Ok(Event::ReconnectFailed(failure)) => {
                warn!(?failure, "Gave up reconnecting");
                break;
            }
            Ok(Event::Message(_)) => {}
            Ok(other) => debug!(event = ?other),
            Err(e) => warn!(error = %e, "Event stream error"),
        }
    }

    let metrics = client.metrics();
    info!(
        messages = metrics.messages_received,
        parse_errors = metrics.parse_errors,
        reconnects = metrics.reconnect_count,
        latency = ?metrics.average_latency,
        rate = metrics.messages_per_second,
        "Session metrics"
    );

    client.disconnect().await;

    Ok(())
}
