pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod keepalive;
pub mod notify;
pub mod outage;
pub mod render;
pub mod telegram;

// Re-export commonly used items
pub use api::{create_router, AppState};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{AppError, Result};
pub use notify::{NotificationGateway, Notifier};
pub use outage::{OutageLedger, OutageRecord, PowerMonitor, PowerStatus};
