use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::analytics::{Analytics, Forecast, RankedOutage, Statistics};
use super::ledger::{LossReport, OutageLedger, RestoreReport, StatusReport};
use super::record::OutageRecord;
use crate::clock::Clock;

/// Shared handle to the outage ledger.
///
/// Transitions take the write lock, queries the read lock. The clock is read
/// once per call while the lock is held, so a report always describes a
/// single instant.
#[derive(Clone)]
pub struct PowerMonitor {
    ledger: Arc<RwLock<OutageLedger>>,
    clock: Arc<dyn Clock>,
}

impl PowerMonitor {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger: Arc::new(RwLock::new(OutageLedger::new())),
            clock,
        }
    }

    pub async fn power_lost(&self) -> LossReport {
        self.power_lost_with(|_| {}).await
    }

    /// Records a loss and hands the report to `on_report` before the write
    /// lock is released, so follow-up work is ordered like the transitions.
    /// `on_report` must not block or await.
    pub async fn power_lost_with<F>(&self, on_report: F) -> LossReport
    where
        F: FnOnce(&LossReport),
    {
        let report = {
            let mut ledger = self.ledger.write().await;
            let report = ledger.record_lost(self.clock.now());
            on_report(&report);
            report
        };

        if report.was_down {
            warn!(at = %report.at, "power lost while already down; restarting outage timer");
        } else {
            info!(
                at = %report.at,
                outages_today = report.outages_today,
                "power lost"
            );
        }
        report
    }

    pub async fn power_restored(&self) -> RestoreReport {
        self.power_restored_with(|_| {}).await
    }

    /// Restore counterpart of [`PowerMonitor::power_lost_with`].
    pub async fn power_restored_with<F>(&self, on_report: F) -> RestoreReport
    where
        F: FnOnce(&RestoreReport),
    {
        let report = {
            let mut ledger = self.ledger.write().await;
            let report = ledger.record_restored(self.clock.now());
            on_report(&report);
            report
        };

        if report.matched {
            info!(
                at = %report.at,
                duration_secs = report.duration.num_seconds(),
                outages_today = report.outages_today,
                "power restored"
            );
        } else {
            warn!(at = %report.at, "power restored without a recorded loss");
        }
        report
    }

    pub async fn status(&self) -> StatusReport {
        let ledger = self.ledger.read().await;
        ledger.status_report(self.clock.now())
    }

    pub async fn today_records(&self) -> Vec<OutageRecord> {
        let ledger = self.ledger.read().await;
        ledger.today_records(self.clock.now())
    }

    /// Today's outages with their durations, the active one last.
    pub async fn history(&self) -> Vec<RankedOutage> {
        let ledger = self.ledger.read().await;
        let now = self.clock.now();
        ledger
            .today_records(now)
            .into_iter()
            .map(|record| RankedOutage {
                record,
                duration: record.duration(now),
            })
            .collect()
    }

    pub async fn statistics(&self) -> Option<Statistics> {
        let ledger = self.ledger.read().await;
        ledger.statistics(self.clock.now())
    }

    pub async fn analytics(&self) -> Option<Analytics> {
        let ledger = self.ledger.read().await;
        ledger.analytics(self.clock.now())
    }

    pub async fn forecast(&self) -> Forecast {
        let ledger = self.ledger.read().await;
        let forecast = ledger.forecast(self.clock.now());
        debug!(?forecast, "forecast computed");
        forecast
    }
}
