use super::rank::RankChange;

/// Receives rank promotions and demotions as they are detected.
///
/// Called on the connection task, once per rank update that moved the player;
/// implementations should hand the work off rather than block.
///
/// Any `Fn(&RankChange) + Send + Sync` closure is a notifier:
///
/// ```ignore
/// let client = Client::with_notifier(endpoint, identity, config, Arc::new(|change: &RankChange| {
///     desktop::notify(&change.summary());
/// }))?;
/// ```
pub trait Notifier: Send + Sync + 'static {
    fn rank_changed(&self, change: &RankChange);
}

impl<F> Notifier for F
where
    F: Fn(&RankChange) + Send + Sync + 'static,
{
    fn rank_changed(&self, change: &RankChange) {
        self(change);
    }
}

/// Notifier that drops every change.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn rank_changed(&self, _change: &RankChange) {}
}
