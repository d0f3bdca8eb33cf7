use tracing::{debug, warn};

use crate::{dto::health::HealthResponse, state::SharedState};

/// Ping the installed store, if any, and report the degraded flag.
///
/// A failed ping is only logged; the storage supervisor owns the flag.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let Some(store) = state.jam_store().await else {
        warn!("healthcheck without an installed store");
        return HealthResponse::from_degraded(true);
    };

    match store.health_check().await {
        Ok(()) => debug!("healthcheck ping succeeded"),
        Err(err) => warn!(error = %err, "healthcheck ping failed"),
    }
    HealthResponse::from_degraded(state.is_degraded())
}
