use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report the backend health, probing the session store when one is installed.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.session_store().await {
        Some(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "session store health check failed");
            }
        }
        None => warn!("session store unavailable (degraded mode)"),
    }

    if state.is_degraded() {
        HealthResponse::degraded()
    } else {
        HealthResponse::ok()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig, dao::session_store::memory::MemorySessionStore,
        dto::health::HealthStatus, state::AppState,
    };

    #[tokio::test]
    async fn reports_degraded_without_store() {
        let state = AppState::new(AppConfig::default());
        assert_eq!(health_status(&state).await.status, HealthStatus::Degraded);
    }

    #[tokio::test]
    async fn reports_ok_with_memory_store() {
        let state =
            AppState::with_store(AppConfig::default(), Arc::new(MemorySessionStore::new())).await;
        assert_eq!(health_status(&state).await.status, HealthStatus::Ok);
    }
}
