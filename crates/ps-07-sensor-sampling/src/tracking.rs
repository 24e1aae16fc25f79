//! # Continuous Tracking
//!
//! A spawned task that samples on a trigger and pushes readings into a
//! bounded channel. `TrackingHandle::stop` guarantees no new sample starts;
//! one already in flight completes and is delivered. The receiver sees the
//! channel close once the task has exited.

use std::sync::Arc;

use shared_types::{GpsFix, Reading, ReadingPayload, SensorKind};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::{TrackingConfig, TrackingTrigger};
use crate::domain::{haversine_m, SamplingError};
use crate::ports::inbound::SamplingApi;

/// Counters reported by a finished tracking task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackingSummary {
    /// Readings delivered to the channel.
    pub emitted: u64,
    /// GPS fixes dropped for not moving far enough.
    pub stationary: u64,
    /// Sampling calls that failed.
    pub failures: u64,
}

/// Control side of a tracking task.
pub struct TrackingHandle {
    kind: SensorKind,
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<TrackingSummary>,
}

impl TrackingHandle {
    /// Tracked kind.
    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    /// Stop taking new samples. Idempotent.
    pub fn stop(&self) {
        // Err only when the task already exited
        let _ = self.stop_tx.send(true);
    }

    /// Whether the loop has exited.
    pub fn is_stopped(&self) -> bool {
        *self.stop_tx.borrow() || self.task.is_finished()
    }

    /// Stop and wait for the task to exit.
    pub async fn shutdown(self) -> TrackingSummary {
        self.stop();
        match self.task.await {
            Ok(summary) => summary,
            Err(e) => {
                warn!("[ps-07] {} tracking task ended abnormally: {}", self.kind, e);
                TrackingSummary::default()
            }
        }
    }
}

fn gps_fix(reading: &Reading) -> Option<&GpsFix> {
    match &reading.payload {
        ReadingPayload::Gps(fix) => Some(fix),
        _ => None,
    }
}

/// Start tracking `kind`.
///
/// # Errors
/// * `SamplingError::InvalidTrigger` - movement trigger on a non-GPS kind
pub fn spawn_tracking<A>(
    sampler: Arc<A>,
    kind: SensorKind,
    config: TrackingConfig,
) -> Result<(TrackingHandle, mpsc::Receiver<Reading>), SamplingError>
where
    A: SamplingApi + 'static,
{
    let min_distance_m = match config.trigger {
        TrackingTrigger::Movement { .. } if kind != SensorKind::Gps => {
            return Err(SamplingError::InvalidTrigger(kind));
        }
        TrackingTrigger::Movement { min_distance_m, .. } => Some(min_distance_m),
        TrackingTrigger::Interval { .. } => None,
    };

    let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
    let (stop_tx, mut stop_rx) = watch::channel(false);
    let period = config.trigger.period();

    let task = tokio::spawn(async move {
        let mut summary = TrackingSummary::default();
        let mut last_emitted: Option<GpsFix> = None;
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("[ps-07] Tracking {} every {:?}", kind, period);

        loop {
            tokio::select! {
                biased;
                // Stop requested, or the handle was dropped
                _ = stop_rx.changed() => break,
                _ = ticker.tick() => {}
            }
            if *stop_rx.borrow() {
                break;
            }

            // Not raced against stop: an in-flight sample always completes
            let reading = match sampler.sample(kind).await {
                Ok(reading) => reading,
                Err(e) => {
                    summary.failures += 1;
                    warn!("[ps-07] Tracking sample of {} failed: {}", kind, e);
                    continue;
                }
            };

            if let (Some(threshold), Some(fix)) = (min_distance_m, gps_fix(&reading)) {
                if let Some(previous) = &last_emitted {
                    let moved = haversine_m(previous, fix);
                    if moved < threshold {
                        summary.stationary += 1;
                        debug!("[ps-07] Moved {:.1} m (< {:.1} m), not emitting", moved, threshold);
                        continue;
                    }
                }
                last_emitted = Some(fix.clone());
            }

            if tx.send(reading).await.is_err() {
                debug!("[ps-07] Tracking receiver dropped");
                break;
            }
            summary.emitted += 1;
        }

        info!(
            "[ps-07] Tracking {} stopped ({} emitted, {} failures)",
            kind, summary.emitted, summary.failures
        );
        summary
    });

    Ok((
        TrackingHandle {
            kind,
            stop_tx,
            task,
        },
        rx,
    ))
}
