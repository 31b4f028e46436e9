//! Prints a line for every promotion or demotion of the configured player.
//!
//! ```sh
//! HERALD_USER_ID=... HERALD_TOKEN=... cargo run --example rank_alerts -- https://live.herald.lol/ws
//! ```

use std::env;
use std::sync::Arc;

use futures::StreamExt as _;
use herald_realtime::realtime::{Client, Direction, Identity, PreferencesUpdate, RankChange};
use herald_realtime::ws::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let endpoint = env::args()
        .nth(1)
        .unwrap_or_else(|| "ws://localhost:8080/ws".to_owned());

    let notifier = Arc::new(|change: &RankChange| {
        let marker = match change.direction {
            Direction::Promotion => '+',
            _ => '-',
        };
        println!("[{marker}] {}", change.summary());
    });
    let client = Client::with_notifier(&endpoint, Identity::from_env()?, Config::default(), notifier)?;

    client.update_preferences(
        PreferencesUpdate::builder()
            .match_updates(false)
            .friend_activity(false)
            .coaching_suggestions(false)
            .build(),
    );
    client.subscribe_global();
    client.connect().await?;

    let mut ranks = Box::pin(client.rank_updates());
    while let Some(update) = ranks.next().await {
        let update = update?;
        if let Some(lp_change) = update.lp_change {
            println!("    {} ({lp_change:+} LP)", update.new_rank);
        }
    }

    Ok(())
}
