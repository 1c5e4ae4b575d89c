//! Periodic removal of expired dialog sessions

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use cold_call_agent::DialogOrchestrator;
use tokio::sync::watch;

/// Sweep every `interval` until `true` is sent on the returned channel
pub fn start_sweep_task(
    orchestrator: Arc<DialogOrchestrator>,
    interval: Duration,
) -> watch::Sender<bool> {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        let mut interval_timer = tokio::time::interval(interval);
        interval_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval_timer.tick() => {
                    let removed = orchestrator.sweep(Utc::now());
                    if removed > 0 {
                        tracing::info!(
                            removed,
                            remaining = orchestrator.active_sessions(),
                            "Session sweep removed expired sessions"
                        );
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!("Session sweep task shutting down");
                        break;
                    }
                }
            }
        }
    });

    shutdown_tx
}
