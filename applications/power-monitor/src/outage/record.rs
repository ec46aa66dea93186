use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerStatus {
    Up,
    Down,
}

/// One outage interval. `end` is absent while the outage is still in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutageRecord {
    pub start: NaiveDateTime,
    pub end: Option<NaiveDateTime>,
}

impl OutageRecord {
    /// Completed outage. An `end` earlier than `start` is pinned to `start`.
    pub fn completed(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            start,
            end: Some(end.max(start)),
        }
    }

    pub fn in_progress(start: NaiveDateTime) -> Self {
        Self { start, end: None }
    }

    pub fn is_in_progress(&self) -> bool {
        self.end.is_none()
    }

    /// Length of the outage; in-progress outages are measured up to `now`.
    pub fn duration(&self, now: NaiveDateTime) -> Duration {
        let end = self.end.unwrap_or(now);
        (end - self.start).max(Duration::zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 15)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_completed_duration_ignores_now() {
        let record = OutageRecord::completed(at(8, 0), at(8, 30));
        assert_eq!(record.duration(at(23, 0)), Duration::minutes(30));
        assert!(!record.is_in_progress());
    }

    #[test]
    fn test_in_progress_duration_reads_now() {
        let record = OutageRecord::in_progress(at(9, 0));
        assert!(record.is_in_progress());
        assert_eq!(record.duration(at(9, 45)), Duration::minutes(45));
    }

    #[test]
    fn test_end_before_start_is_pinned() {
        let record = OutageRecord::completed(at(10, 0), at(9, 0));
        assert_eq!(record.end, Some(at(10, 0)));
        assert_eq!(record.duration(at(12, 0)), Duration::zero());
    }

    #[test]
    fn test_in_progress_never_negative() {
        let record = OutageRecord::in_progress(at(10, 0));
        assert_eq!(record.duration(at(9, 0)), Duration::zero());
    }
}
