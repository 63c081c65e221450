//! Periodic background reconcile.
//!
//! Every request already reconciles before it acts, so this task only makes
//! expiry and promotion visible to live subscribers without waiting for the
//! next request. Stopping it changes nothing about correctness.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::engine::TurnEngine;

/// Reconcile `engine` every `period` until `shutdown` turns `true` or its
/// sender is dropped.
pub async fn run_reconciler(
    engine: Arc<TurnEngine>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(period_ms = period.as_millis(), "Reconciler starting");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match engine.reconcile().await {
                    Ok(true) => debug!("Background reconcile advanced the turn"),
                    Ok(false) => {}
                    Err(e) => warn!(error = %e, "Background reconcile failed"),
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    info!("Reconciler stopped");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{DateTime, Utc};
    use continuum_types::LiveEvent;

    use super::*;
    use crate::clock::ManualClock;
    use crate::scheduler::TurnTimings;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn background_tick_expires_idle_turn() {
        let clock = Arc::new(ManualClock::new(
            DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
        ));
        let engine = Arc::new(
            TurnEngine::open(
                TurnTimings::default(),
                clock.clone(),
                Arc::new(MemoryStore::new()),
                50,
            )
            .unwrap(),
        );
        let a = engine.register("A").await.unwrap().id;
        engine.join(a).await.unwrap();

        let mut events = engine.subscribe();
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(run_reconciler(
            engine.clone(),
            Duration::from_millis(5),
            stop_rx,
        ));

        clock.advance_secs(121);
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event, LiveEvent::TurnUpdate { holder: None, .. }));

        stop_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn stops_when_sender_dropped() {
        let engine = Arc::new(
            TurnEngine::open(
                TurnTimings::default(),
                Arc::new(ManualClock::new(Utc::now())),
                Arc::new(MemoryStore::new()),
                50,
            )
            .unwrap(),
        );
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(run_reconciler(engine, Duration::from_millis(5), stop_rx));

        drop(stop_tx);
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
    }
}
