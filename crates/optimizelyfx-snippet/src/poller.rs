// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Background refresh of the datafile.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::datafile::{DatafileStore, StoreOutcome};
use crate::fetcher::{DatafileClient, DatafileError, DatafileSource};

/// Shortest period the poller accepts.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Converts a requested period in milliseconds into the one actually used.
///
/// Returns `None` for values that are not finite or do not fit a [`Duration`], otherwise the
/// period and whether it was raised to [`MIN_POLL_INTERVAL`].
pub fn clamp_interval(requested_ms: f64) -> Option<(Duration, bool)> {
    if !requested_ms.is_finite() {
        return None;
    }
    let min_ms = MIN_POLL_INTERVAL.as_millis() as f64;
    if requested_ms < min_ms {
        return Some((MIN_POLL_INTERVAL, true));
    }
    Duration::try_from_secs_f64(requested_ms / 1000.0)
        .ok()
        .map(|period| (period, false))
}

pub struct DatafilePoller {
    client: Arc<DatafileClient>,
    source: DatafileSource,
    store: DatafileStore,
    period: Duration,
}

impl DatafilePoller {
    pub fn new(
        client: Arc<DatafileClient>,
        source: DatafileSource,
        store: DatafileStore,
        period: Duration,
    ) -> Self {
        Self {
            client,
            source,
            store,
            period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Fetches once and swaps the datafile in if its revision moved.
    pub async fn poll_once(&self) -> Result<StoreOutcome, DatafileError> {
        let datafile = self.client.fetch(&self.source).await?;
        let revision = datafile.revision.clone();
        let outcome = self.store.replace_if_changed(datafile).await;
        match &outcome {
            StoreOutcome::Unchanged => {
                debug!(revision = %revision, "Datafile revision unchanged");
            }
            StoreOutcome::Replaced { previous } => {
                info!(
                    previous = previous.as_deref().unwrap_or("none"),
                    revision = %revision,
                    "Datafile updated"
                );
            }
        }
        Ok(outcome)
    }

    /// Runs the poll loop on the current runtime until `cancel` fires.
    ///
    /// The first tick happens one full period after spawning, since the datafile was just
    /// fetched by the caller.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await; // discard first tick, which is instantaneous

            debug!(period_ms = self.period.as_millis() as u64, "Datafile poller started");
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("Datafile poller stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        tokio::select! {
                            _ = cancel.cancelled() => {
                                debug!("Datafile poller stopped during fetch");
                                break;
                            }
                            result = self.poll_once() => {
                                if let Err(e) = result {
                                    error!("Datafile poll failed: {e}");
                                }
                            }
                        }
                    }
                }
            }
        })
    }
}
