//! Chat message rendering.
//!
//! Output targets Telegram's HTML parse mode, so any operator-supplied text
//! is escaped before it is embedded.

use chrono::{Duration, NaiveDateTime};

use crate::outage::{
    Analytics, Forecast, ForecastUnavailable, LossReport, PowerStatus, RankedOutage,
    RestoreReport, Statistics, StatusReport, TrendDirection,
};

const TIME_FORMAT: &str = "%H:%M";
const TIME_SECONDS_FORMAT: &str = "%H:%M:%S";
const DATE_FORMAT: &str = "%d.%m.%Y";

/// Hours and minutes, seconds truncated: `"2h 5m"`, or `"45m"` under an hour.
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.num_seconds().max(0);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn ordinal(n: usize) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}

pub fn welcome(group_label: &str) -> String {
    format!(
        "👋 Hi! I monitor mains power.\n\n\
         🏠 Tracking group: <b>{}</b>\n\n\
         Commands:\n\
         /status - current status\n\
         /stats - today's statistics\n\
         /history - today's outages\n\
         /analytics - patterns and trend\n\
         /forecast - next outage estimate\n\n\
         Or use the buttons:",
        escape_html(group_label)
    )
}

pub fn power_lost(report: &LossReport, group_label: &str) -> String {
    let mut msg = String::from("🔴 <b>POWER LOST!</b>\n\n");
    msg.push_str(&format!("⏰ Time: {}\n", report.at.format(TIME_SECONDS_FORMAT)));
    msg.push_str(&format!("📅 Date: {}\n", report.at.format(DATE_FORMAT)));
    msg.push_str(&format!("🏠 Group: <b>{}</b>\n", escape_html(group_label)));
    if report.outages_today > 0 {
        msg.push_str(&format!(
            "\n📊 This is the {} outage today",
            ordinal(report.outages_today + 1)
        ));
    }
    msg
}

pub fn power_restored(report: &RestoreReport) -> String {
    let mut msg = String::from("🟢 <b>POWER RESTORED!</b>\n\n");
    msg.push_str(&format!("⏰ Time: {}\n", report.at.format(TIME_SECONDS_FORMAT)));
    msg.push_str(&format!("📅 Date: {}\n", report.at.format(DATE_FORMAT)));
    if report.duration > Duration::zero() {
        msg.push_str(&format!(
            "\n⏱ <b>Duration:</b> {}\n",
            format_duration(report.duration)
        ));
    }
    if report.outages_today > 0 {
        msg.push_str(&format!(
            "\n📊 <b>Today:</b>\nOutages: {}\nWithout power: {}",
            report.outages_today,
            format_duration(report.total_down_today)
        ));
    }
    msg
}

pub fn status(report: &StatusReport) -> String {
    let mut msg = String::new();
    match (report.status, report.since) {
        (PowerStatus::Down, Some(since)) => {
            msg.push_str("🔴 <b>NO POWER</b>\n\n");
            msg.push_str(&format!(
                "⏱ Without power: <b>{}</b>\n",
                format_duration(report.current_duration)
            ));
            msg.push_str(&format!("⏰ Lost at: {}\n", since.format(TIME_SECONDS_FORMAT)));
        }
        _ => {
            msg.push_str("🟢 <b>POWER IS ON</b>\n");
            if let Some(last) = report.last_outage {
                let duration = last
                    .end
                    .map(|end| end - last.start)
                    .unwrap_or_else(Duration::zero);
                msg.push_str(&format!(
                    "\n⏰ Last outage:\n   {} • {}\n",
                    last.start.format(TIME_FORMAT),
                    format_duration(duration)
                ));
            }
            if report.outages_today > 0 {
                msg.push_str(&format!("\n📊 Outages today: {}", report.outages_today));
            }
        }
    }
    msg
}

/// One-line status used for inline button callbacks.
pub fn status_short(report: &StatusReport) -> String {
    match report.status {
        PowerStatus::Up => "🟢 Power is on".to_string(),
        PowerStatus::Down => format!(
            "🔴 No power\n⏱ {}",
            format_duration(report.current_duration)
        ),
    }
}

pub fn statistics(stats: Option<&Statistics>) -> String {
    let Some(stats) = stats else {
        return "📊 No outages today yet 🎉".to_string();
    };

    let mut msg = String::from("📊 <b>TODAY'S STATISTICS</b>\n\n");
    msg.push_str(&format!("📈 Outages: <b>{}</b>\n", stats.count));
    msg.push_str(&format!("⏱ Total time: <b>{}</b>\n", format_duration(stats.total)));
    msg.push_str(&format!("⌀ Average: {}\n", format_duration(stats.average)));
    msg.push_str(&format!(
        "⬆️ Longest: {} at {}\n",
        format_duration(stats.longest.duration),
        stats.longest.record.start.format(TIME_FORMAT)
    ));
    msg.push_str(&format!(
        "⬇️ Shortest: {} at {}",
        format_duration(stats.shortest.duration),
        stats.shortest.record.start.format(TIME_FORMAT)
    ));
    msg
}

/// Compact statistics used for inline button callbacks.
pub fn statistics_short(stats: Option<&Statistics>) -> String {
    match stats {
        Some(stats) => format!(
            "📊 <b>STATISTICS</b>\n\nOutages: {}\nTotal time: {}",
            stats.count,
            format_duration(stats.total)
        ),
        None => "📊 No outages today 🎉".to_string(),
    }
}

pub fn history(entries: &[RankedOutage]) -> String {
    if entries.is_empty() {
        return "📋 No outages today yet 🎉".to_string();
    }

    let mut msg = String::from("📋 <b>HISTORY</b>\n");
    for (i, entry) in entries.iter().enumerate() {
        msg.push_str(&format!(
            "\n{}. {} • {}",
            i + 1,
            entry.record.start.format(TIME_FORMAT),
            format_duration(entry.duration)
        ));
        if entry.record.is_in_progress() {
            msg.push_str(" (ongoing)");
        }
    }
    msg
}

pub fn analytics(analytics: Option<&Analytics>) -> String {
    let Some(analytics) = analytics else {
        return "📈 Not enough data for analytics yet".to_string();
    };

    let mut msg = String::from("📈 <b>ANALYTICS</b>\n\n");
    msg.push_str(&format!(
        "🕐 Worst hour: {:02}:00 ({} outage{})\n",
        analytics.worst_hour,
        analytics.worst_hour_count,
        if analytics.worst_hour_count == 1 { "" } else { "s" }
    ));
    if let Some(interval) = analytics.average_interval {
        msg.push_str(&format!("↔️ Average gap: {}\n", format_duration(interval)));
    }
    if let Some(percent) = analytics.percent_of_day_down {
        msg.push_str(&format!("🌑 Day without power: {:.1}%\n", percent));
    }
    match analytics.trend {
        Some(trend) => {
            let direction = match trend.direction {
                TrendDirection::Longer => "📈 outages are getting longer",
                TrendDirection::Shorter => "📉 outages are getting shorter",
                TrendDirection::Stable => "➡️ outages are stable",
            };
            msg.push_str(&format!(
                "Trend: {} ({} → {})",
                direction,
                format_duration(trend.earliest_average),
                format_duration(trend.recent_average)
            ));
        }
        None => msg.push_str("Trend: needs at least 6 outages"),
    }
    msg
}

fn format_moment(at: NaiveDateTime) -> String {
    at.format(TIME_FORMAT).to_string()
}

pub fn forecast(forecast: &Forecast) -> String {
    match forecast {
        Forecast::Predicted {
            next_outage_at,
            time_until,
            average_interval,
        } => format!(
            "🔮 <b>FORECAST</b>\n\n\
             Next outage expected around <b>{}</b>\n\
             ⏳ In: {}\n\
             ↔️ Based on average gap: {}",
            format_moment(*next_outage_at),
            format_duration(*time_until),
            format_duration(*average_interval)
        ),
        Forecast::Overdue {
            next_outage_at,
            average_interval,
        } => format!(
            "🔮 <b>FORECAST</b>\n\n\
             Next outage was expected around <b>{}</b>; the prediction window has already passed\n\
             ↔️ Average gap: {}",
            format_moment(*next_outage_at),
            format_duration(*average_interval)
        ),
        Forecast::Unavailable(reason) => {
            let why = match reason {
                ForecastUnavailable::PowerDown => "power is currently down",
                ForecastUnavailable::InsufficientData => "need at least 2 outages today",
                ForecastUnavailable::NoIntervals => "no gaps between outages yet",
            };
            format!("🔮 Forecast unavailable: {}", why)
        }
    }
}
