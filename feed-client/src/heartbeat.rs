//! Background heartbeat task.
//!
//! Polls the endpoint on an interval and feeds each tick to the change
//! detector until a shutdown signal arrives.

use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::endpoint::FeedEndpoint;
use crate::manager::FeedManager;
use crate::render::RenderAdapter;

/// Spawn the heartbeat loop.
///
/// The first poll happens one interval after start. A zero interval
/// disables the loop. Poll errors are logged and the loop keeps going.
pub fn spawn_heartbeat<E, R>(
    manager: Arc<FeedManager<E, R>>,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()>
where
    E: FeedEndpoint + 'static,
    R: RenderAdapter + 'static,
{
    tokio::spawn(async move {
        let period = manager.config().heartbeat_interval;
        if period.is_zero() {
            tracing::info!("Heartbeat disabled");
            return;
        }

        tracing::info!("Heartbeat started (interval: {:?})", period);
        let mut timer = interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        timer.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Heartbeat stopped");
                    break;
                }
                _ = timer.tick() => {
                    match manager.poll_heartbeat().await {
                        Ok(counts) if counts.is_empty() => {
                            tracing::debug!("Heartbeat: feed in sync");
                        }
                        Ok(counts) => {
                            tracing::debug!(
                                "Heartbeat: {} inserts and {} removes pending",
                                counts.inserts,
                                counts.removes
                            );
                        }
                        Err(e) => {
                            tracing::warn!("Heartbeat poll failed: {}", e);
                        }
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::MockEndpoint;
    use crate::manager::ManagerConfig;
    use crate::render::NullRenderer;
    use feedq_core::QueueCounts;
    use feedq_types::{PostId, Snapshot};
    use std::time::Duration;

    fn manager(interval: Duration) -> Arc<FeedManager<MockEndpoint, NullRenderer>> {
        let config = ManagerConfig::default().with_heartbeat_interval(interval);
        Arc::new(FeedManager::new(config, MockEndpoint::new(), NullRenderer, vec![]).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_observes_remote_feed() {
        let manager = manager(Duration::from_secs(15));
        manager.endpoint().add_post("1", "One");
        manager
            .endpoint()
            .set_feed(Snapshot::new(vec![PostId::from("1")], vec![]));

        let (tx, rx) = broadcast::channel(1);
        let handle = spawn_heartbeat(Arc::clone(&manager), rx);

        // Nothing before the first interval elapses
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(manager.counts().await.is_empty());

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(manager.counts().await, QueueCounts::new(1, 0));

        tx.send(()).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_survives_poll_errors() {
        let manager = manager(Duration::from_secs(1));
        manager.endpoint().fail_next_heartbeat("offline");
        manager.endpoint().publish("1", "One");

        let (tx, rx) = broadcast::channel(1);
        let handle = spawn_heartbeat(Arc::clone(&manager), rx);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(manager.counts().await, QueueCounts::new(1, 0));

        tx.send(()).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn zero_interval_disables_loop() {
        let manager = manager(Duration::ZERO);
        let (_tx, rx) = broadcast::channel(1);

        let handle = spawn_heartbeat(manager, rx);
        handle.await.unwrap();
    }
}
