use chrono::{Duration, NaiveDateTime};

use super::analytics::{self, Analytics, Forecast, Statistics};
use super::record::{OutageRecord, PowerStatus};

/// Snapshot taken when a loss signal is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LossReport {
    pub at: NaiveDateTime,
    /// The ledger was already down; the active outage timer was restarted.
    pub was_down: bool,
    /// Completed outages today, not counting the one that just started.
    pub outages_today: usize,
}

/// Snapshot taken when a restore signal is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreReport {
    pub at: NaiveDateTime,
    /// Length of the outage that just ended, zero when nothing was active.
    pub duration: Duration,
    /// A loss was pending and a record was appended.
    pub matched: bool,
    pub outages_today: usize,
    pub total_down_today: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    pub status: PowerStatus,
    pub since: Option<NaiveDateTime>,
    pub current_duration: Duration,
    pub last_outage: Option<OutageRecord>,
    pub outages_today: usize,
}

/// In-memory outage history for the running process.
///
/// `history` only ever holds completed records in the order they were
/// restored; the outage in progress lives in `active_outage_start`.
#[derive(Debug, Clone)]
pub struct OutageLedger {
    status: PowerStatus,
    active_outage_start: Option<NaiveDateTime>,
    history: Vec<OutageRecord>,
}

impl Default for OutageLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl OutageLedger {
    pub fn new() -> Self {
        Self {
            status: PowerStatus::Up,
            active_outage_start: None,
            history: Vec::new(),
        }
    }

    pub fn status(&self) -> PowerStatus {
        self.status
    }

    pub fn active_outage_start(&self) -> Option<NaiveDateTime> {
        self.active_outage_start
    }

    pub fn history(&self) -> &[OutageRecord] {
        &self.history
    }

    /// Marks power as lost. A repeated loss while already down restarts the
    /// active outage at `now`.
    pub fn record_lost(&mut self, now: NaiveDateTime) -> LossReport {
        let was_down = self.status == PowerStatus::Down;
        self.status = PowerStatus::Down;
        self.active_outage_start = Some(now);

        LossReport {
            at: now,
            was_down,
            outages_today: self.completed_today(now).count(),
        }
    }

    /// Marks power as restored and closes the active outage, if any.
    /// A restore without a pending loss appends nothing.
    pub fn record_restored(&mut self, now: NaiveDateTime) -> RestoreReport {
        let today = now.date();
        self.history.retain(|r| r.start.date() >= today);

        let closed = self
            .active_outage_start
            .take()
            .map(|start| OutageRecord::completed(start, now));
        self.status = PowerStatus::Up;

        let duration = match closed {
            Some(record) => {
                self.history.push(record);
                record.duration(now)
            }
            None => Duration::zero(),
        };

        let completed: Vec<OutageRecord> = self.completed_today(now).copied().collect();
        RestoreReport {
            at: now,
            duration,
            matched: closed.is_some(),
            outages_today: completed.len(),
            total_down_today: analytics::total_duration(&completed, now),
        }
    }

    pub fn current_duration(&self, now: NaiveDateTime) -> Duration {
        match (self.status, self.active_outage_start) {
            (PowerStatus::Down, Some(start)) => OutageRecord::in_progress(start).duration(now),
            _ => Duration::zero(),
        }
    }

    fn completed_today(&self, now: NaiveDateTime) -> impl Iterator<Item = &OutageRecord> {
        let today = now.date();
        self.history.iter().filter(move |r| r.start.date() == today)
    }

    /// Today's completed outages in chronological order, followed by the
    /// outage in progress when power is down.
    pub fn today_records(&self, now: NaiveDateTime) -> Vec<OutageRecord> {
        let mut records: Vec<OutageRecord> = self.completed_today(now).copied().collect();
        if let Some(start) = self.active_outage_start {
            records.push(OutageRecord::in_progress(start));
        }
        records
    }

    pub fn status_report(&self, now: NaiveDateTime) -> StatusReport {
        StatusReport {
            status: self.status,
            since: self.active_outage_start,
            current_duration: self.current_duration(now),
            last_outage: self.completed_today(now).last().copied(),
            outages_today: self.completed_today(now).count(),
        }
    }

    pub fn statistics(&self, now: NaiveDateTime) -> Option<Statistics> {
        analytics::statistics(&self.today_records(now), now)
    }

    pub fn analytics(&self, now: NaiveDateTime) -> Option<Analytics> {
        analytics::analytics(&self.today_records(now), now)
    }

    pub fn forecast(&self, now: NaiveDateTime) -> Forecast {
        analytics::forecast(&self.today_records(now), self.status, now)
    }
}
