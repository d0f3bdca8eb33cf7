use serde::Serialize;
use utoipa::ToSchema;

/// Whether the API can currently reach its store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// The store answers; every endpoint is served.
    Ok,
    /// No usable store; data endpoints answer 503.
    Degraded,
}

/// Body of `GET /healthcheck`.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Current status.
    pub status: HealthStatus,
}

impl HealthResponse {
    /// Response matching the degraded flag.
    pub fn from_degraded(degraded: bool) -> Self {
        let status = if degraded {
            HealthStatus::Degraded
        } else {
            HealthStatus::Ok
        };
        Self { status }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_lowercase() {
        let body = serde_json::to_value(HealthResponse::from_degraded(true)).unwrap();
        assert_eq!(body, serde_json::json!({"status": "degraded"}));
    }
}
