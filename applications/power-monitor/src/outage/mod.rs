pub mod analytics;
pub mod ledger;
pub mod monitor;
pub mod record;

pub use analytics::{
    Analytics, Forecast, ForecastUnavailable, RankedOutage, Statistics, Trend, TrendDirection,
};
pub use ledger::{LossReport, OutageLedger, RestoreReport, StatusReport};
pub use monitor::PowerMonitor;
pub use record::{OutageRecord, PowerStatus};
