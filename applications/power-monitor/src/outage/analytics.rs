//! Derivations over the today-window.
//!
//! Every function here is pure: it takes the chronologically ordered records
//! of the day plus the instant the report is computed for. The last record
//! may be in progress, in which case its duration is read against `now`.

use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};

use super::record::{OutageRecord, PowerStatus};

/// Number of outages compared at each end of the day for the trend.
const TREND_WINDOW: usize = 3;
const TREND_MIN_RECORDS: usize = 2 * TREND_WINDOW;
const FORECAST_MIN_RECORDS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankedOutage {
    pub record: OutageRecord,
    pub duration: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statistics {
    pub count: usize,
    pub total: Duration,
    pub average: Duration,
    pub longest: RankedOutage,
    pub shortest: RankedOutage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendDirection {
    Longer,
    Shorter,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trend {
    pub direction: TrendDirection,
    pub earliest_average: Duration,
    pub recent_average: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Analytics {
    pub worst_hour: u32,
    pub worst_hour_count: usize,
    pub average_interval: Option<Duration>,
    pub percent_of_day_down: Option<f64>,
    pub trend: Option<Trend>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForecastUnavailable {
    /// Forecasting is not attempted while an outage is in progress.
    PowerDown,
    /// Fewer than two outages recorded today.
    InsufficientData,
    /// No positive gap between consecutive outages.
    NoIntervals,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forecast {
    Predicted {
        next_outage_at: NaiveDateTime,
        time_until: Duration,
        average_interval: Duration,
    },
    /// The predicted onset is already in the past.
    Overdue {
        next_outage_at: NaiveDateTime,
        average_interval: Duration,
    },
    Unavailable(ForecastUnavailable),
}

pub fn start_of_day(now: NaiveDateTime) -> NaiveDateTime {
    now.date().and_time(NaiveTime::MIN)
}

pub fn total_duration(records: &[OutageRecord], now: NaiveDateTime) -> Duration {
    records
        .iter()
        .fold(Duration::zero(), |acc, r| acc + r.duration(now))
}

fn mean(total: Duration, count: usize) -> Duration {
    match i32::try_from(count) {
        Ok(0) => Duration::zero(),
        Ok(n) => total / n,
        Err(_) => Duration::zero(),
    }
}

pub fn statistics(records: &[OutageRecord], now: NaiveDateTime) -> Option<Statistics> {
    let mut ranked = records.iter().map(|record| RankedOutage {
        record: *record,
        duration: record.duration(now),
    });
    let first = ranked.next()?;

    let mut longest = first;
    let mut shortest = first;
    let mut total = first.duration;
    let mut count = 1;

    // Strict comparisons keep the earliest record on ties.
    for item in ranked {
        if item.duration > longest.duration {
            longest = item;
        }
        if item.duration < shortest.duration {
            shortest = item;
        }
        total = total + item.duration;
        count += 1;
    }

    Some(Statistics {
        count,
        total,
        average: mean(total, count),
        longest,
        shortest,
    })
}

/// Mean gap between the end of one outage and the start of the next.
/// Back-to-back or overlapping pairs are left out.
pub fn average_interval(records: &[OutageRecord]) -> Option<Duration> {
    let gaps: Vec<Duration> = records
        .windows(2)
        .filter_map(|pair| pair[0].end.map(|end| pair[1].start - end))
        .filter(|gap| *gap > Duration::zero())
        .collect();

    if gaps.is_empty() {
        return None;
    }

    let total = gaps.iter().fold(Duration::zero(), |acc, gap| acc + *gap);
    Some(mean(total, gaps.len()))
}

struct HourBucket {
    hour: u32,
    count: usize,
    downtime: Duration,
}

/// Hour of day in which the most outages started.
///
/// Equal counts go to the hour with more downtime; if that ties as well, the
/// hour seen first in the day wins, so a day of single outages at 08:00,
/// 12:00 and 18:00 (30m, 10m, 1h) reports 18:00. An outage carried
/// over from yesterday counts as starting at midnight.
fn worst_hour(records: &[OutageRecord], now: NaiveDateTime) -> Option<(u32, usize)> {
    let day_start = start_of_day(now);
    let mut buckets: Vec<HourBucket> = Vec::new();
    for record in records {
        let hour = record.start.max(day_start).hour();
        let duration = record.duration(now);
        match buckets.iter_mut().find(|b| b.hour == hour) {
            Some(bucket) => {
                bucket.count += 1;
                bucket.downtime = bucket.downtime + duration;
            }
            None => buckets.push(HourBucket {
                hour,
                count: 1,
                downtime: duration,
            }),
        }
    }

    let mut worst: Option<&HourBucket> = None;
    for bucket in &buckets {
        worst = match worst {
            Some(current) if (bucket.count, bucket.downtime) <= (current.count, current.downtime) => {
                Some(current)
            }
            _ => Some(bucket),
        };
    }
    worst.map(|b| (b.hour, b.count))
}

fn percent_of_day_down(total: Duration, now: NaiveDateTime) -> Option<f64> {
    let elapsed = now - start_of_day(now);
    if elapsed <= Duration::zero() {
        return None;
    }
    let ratio = total.num_milliseconds() as f64 / elapsed.num_milliseconds() as f64;
    let percent = (ratio * 1000.0).round() / 10.0;
    Some(percent.min(100.0))
}

fn trend(records: &[OutageRecord], now: NaiveDateTime) -> Option<Trend> {
    if records.len() < TREND_MIN_RECORDS {
        return None;
    }
    let earliest = total_duration(&records[..TREND_WINDOW], now);
    let recent = total_duration(&records[records.len() - TREND_WINDOW..], now);

    let direction = if recent > earliest {
        TrendDirection::Longer
    } else if recent < earliest {
        TrendDirection::Shorter
    } else {
        TrendDirection::Stable
    };

    Some(Trend {
        direction,
        earliest_average: mean(earliest, TREND_WINDOW),
        recent_average: mean(recent, TREND_WINDOW),
    })
}

pub fn analytics(records: &[OutageRecord], now: NaiveDateTime) -> Option<Analytics> {
    let (worst_hour, worst_hour_count) = worst_hour(records, now)?;
    let total = total_duration(records, now);

    Some(Analytics {
        worst_hour,
        worst_hour_count,
        average_interval: average_interval(records),
        percent_of_day_down: percent_of_day_down(total, now),
        trend: trend(records, now),
    })
}

pub fn forecast(records: &[OutageRecord], status: PowerStatus, now: NaiveDateTime) -> Forecast {
    if status == PowerStatus::Down {
        return Forecast::Unavailable(ForecastUnavailable::PowerDown);
    }
    if records.len() < FORECAST_MIN_RECORDS {
        return Forecast::Unavailable(ForecastUnavailable::InsufficientData);
    }
    let Some(average_interval) = average_interval(records) else {
        return Forecast::Unavailable(ForecastUnavailable::NoIntervals);
    };
    let Some(last_end) = records.last().and_then(|r| r.end) else {
        return Forecast::Unavailable(ForecastUnavailable::PowerDown);
    };

    let next_outage_at = last_end + average_interval;
    if next_outage_at > now {
        Forecast::Predicted {
            next_outage_at,
            time_until: next_outage_at - now,
            average_interval,
        }
    } else {
        Forecast::Overdue {
            next_outage_at,
            average_interval,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 15)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn outage(start: (u32, u32), minutes: i64) -> OutageRecord {
        let start = at(start.0, start.1);
        OutageRecord::completed(start, start + Duration::minutes(minutes))
    }

    #[test]
    fn test_statistics_empty_is_none() {
        assert!(statistics(&[], at(12, 0)).is_none());
    }

    #[test]
    fn test_statistics_ties_keep_first_occurrence() {
        let records = [outage((8, 0), 20), outage((10, 0), 40), outage((12, 0), 40), outage((14, 0), 20)];
        let stats = statistics(&records, at(20, 0)).unwrap();

        assert_eq!(stats.count, 4);
        assert_eq!(stats.total, Duration::minutes(120));
        assert_eq!(stats.average, Duration::minutes(30));
        assert_eq!(stats.longest.record, records[1]);
        assert_eq!(stats.shortest.record, records[0]);
    }

    #[test]
    fn test_statistics_include_in_progress_record() {
        let records = [outage((8, 0), 10), OutageRecord::in_progress(at(9, 0))];
        let stats = statistics(&records, at(10, 0)).unwrap();

        assert_eq!(stats.count, 2);
        assert_eq!(stats.total, Duration::minutes(70));
        assert_eq!(stats.longest.duration, Duration::minutes(60));
        assert!(stats.longest.record.is_in_progress());
    }

    #[test]
    fn test_average_interval_skips_non_positive_gaps() {
        // 08:00-09:00, back-to-back 09:00-09:30, overlapping 09:15-09:45, then 11:45-12:00
        let records = [
            outage((8, 0), 60),
            outage((9, 0), 30),
            outage((9, 15), 30),
            outage((11, 45), 15),
        ];
        assert_eq!(average_interval(&records), Some(Duration::hours(2)));
    }

    #[test]
    fn test_average_interval_none_without_gaps() {
        assert_eq!(average_interval(&[outage((8, 0), 30)]), None);
        assert_eq!(average_interval(&[outage((8, 0), 30), outage((8, 30), 30)]), None);
    }

    #[test]
    fn test_worst_hour_prefers_count() {
        let records = [outage((7, 0), 120), outage((9, 0), 5), outage((9, 30), 5)];
        let analytics = analytics(&records, at(12, 0)).unwrap();
        assert_eq!(analytics.worst_hour, 9);
        assert_eq!(analytics.worst_hour_count, 2);
    }

    #[test]
    fn test_worst_hour_full_tie_keeps_first_hour() {
        let records = [outage((8, 0), 30), outage((13, 0), 30)];
        let analytics = analytics(&records, at(14, 0)).unwrap();
        assert_eq!(analytics.worst_hour, 8);
        assert_eq!(analytics.worst_hour_count, 1);
    }

    #[test]
    fn test_worst_hour_counts_carried_over_outage_at_midnight() {
        let yesterday = at(23, 30) - Duration::days(1);
        let records = [OutageRecord::in_progress(yesterday)];
        let analytics = analytics(&records, at(0, 30)).unwrap();
        assert_eq!(analytics.worst_hour, 0);
        assert_eq!(analytics.worst_hour_count, 1);
    }

    #[test]
    fn test_worst_hour_equal_counts_prefer_downtime() {
        let records = [outage((8, 0), 30), outage((12, 0), 10), outage((18, 0), 60)];
        let analytics = analytics(&records, at(20, 0)).unwrap();
        assert_eq!(analytics.worst_hour, 18);
    }

    #[test]
    fn test_percent_of_day_down_rounds_to_one_decimal() {
        // 1h down out of 6h elapsed = 16.666..%
        let records = [outage((1, 0), 60)];
        let analytics = analytics(&records, at(6, 0)).unwrap();
        assert_eq!(analytics.percent_of_day_down, Some(16.7));
    }

    #[test]
    fn test_percent_of_day_down_undefined_at_midnight() {
        let records = [OutageRecord::in_progress(at(0, 0))];
        let analytics = analytics(&records, at(0, 0)).unwrap();
        assert_eq!(analytics.percent_of_day_down, None);
    }

    #[test]
    fn test_percent_of_day_down_is_capped() {
        let yesterday = at(22, 0) - Duration::days(1);
        let records = [OutageRecord::in_progress(yesterday)];
        let analytics = analytics(&records, at(1, 0)).unwrap();
        assert_eq!(analytics.percent_of_day_down, Some(100.0));
    }

    #[test]
    fn test_trend_requires_six_records() {
        let records: Vec<OutageRecord> = (0..5).map(|i| outage((8 + i, 0), 10)).collect();
        assert_eq!(analytics(&records, at(20, 0)).unwrap().trend, None);
    }

    #[test]
    fn test_trend_longer_shorter_stable() {
        let build = |minutes: [i64; 6]| -> Vec<OutageRecord> {
            minutes
                .iter()
                .enumerate()
                .map(|(i, m)| outage((8 + i as u32, 0), *m))
                .collect()
        };

        let longer = analytics(&build([10, 10, 10, 20, 20, 20]), at(20, 0)).unwrap();
        let trend = longer.trend.unwrap();
        assert_eq!(trend.direction, TrendDirection::Longer);
        assert_eq!(trend.earliest_average, Duration::minutes(10));
        assert_eq!(trend.recent_average, Duration::minutes(20));

        let shorter = analytics(&build([30, 30, 30, 5, 5, 5]), at(20, 0)).unwrap();
        assert_eq!(shorter.trend.unwrap().direction, TrendDirection::Shorter);

        let stable = analytics(&build([10, 20, 30, 30, 20, 10]), at(20, 0)).unwrap();
        assert_eq!(stable.trend.unwrap().direction, TrendDirection::Stable);
    }

    #[test]
    fn test_forecast_unavailable_reasons() {
        let one = [outage((8, 0), 30)];
        assert_eq!(
            forecast(&one, PowerStatus::Up, at(12, 0)),
            Forecast::Unavailable(ForecastUnavailable::InsufficientData)
        );

        let back_to_back = [outage((8, 0), 30), outage((8, 30), 30)];
        assert_eq!(
            forecast(&back_to_back, PowerStatus::Up, at(12, 0)),
            Forecast::Unavailable(ForecastUnavailable::NoIntervals)
        );

        assert_eq!(
            forecast(&back_to_back, PowerStatus::Down, at(12, 0)),
            Forecast::Unavailable(ForecastUnavailable::PowerDown)
        );
    }

    #[test]
    fn test_forecast_overdue_has_no_negative_duration() {
        // gap of 1h, last ends 10:00, predicted 11:00, asked at 13:00
        let records = [outage((8, 0), 60), outage((10, 0), 0)];
        assert_eq!(
            forecast(&records, PowerStatus::Up, at(13, 0)),
            Forecast::Overdue {
                next_outage_at: at(11, 0),
                average_interval: Duration::hours(1),
            }
        );
    }

    #[test]
    fn test_forecast_at_predicted_instant_is_overdue() {
        let records = [outage((8, 0), 60), outage((10, 0), 60)];
        assert!(matches!(
            forecast(&records, PowerStatus::Up, at(12, 0)),
            Forecast::Overdue { .. }
        ));
    }
}
