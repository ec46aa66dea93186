use axum::extract::State;

use super::AppState;
use crate::render;

/// Webhook fired by the sensor when mains power drops.
///
/// The alert is queued while the ledger is still locked, so alerts leave in
/// the same order as the transitions they describe. Queueing never waits and
/// delivery never affects the response.
pub async fn power_lost(State(state): State<AppState>) -> &'static str {
    state
        .monitor
        .power_lost_with(|report| {
            state
                .notifier
                .dispatch(render::power_lost(report, &state.group_label));
        })
        .await;
    "OK"
}

/// Webhook fired by the sensor when mains power returns.
pub async fn power_restored(State(state): State<AppState>) -> &'static str {
    state
        .monitor
        .power_restored_with(|report| {
            state.notifier.dispatch(render::power_restored(report));
        })
        .await;
    "OK"
}
