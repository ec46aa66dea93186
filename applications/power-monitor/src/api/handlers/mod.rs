pub mod health;
pub mod power;

use crate::notify::Notifier;
use crate::outage::PowerMonitor;

/// Shared state for the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub monitor: PowerMonitor,
    pub notifier: Notifier,
    pub group_label: String,
}
