//! Health check handler.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use uptrack_core::progress::Progress;
use uptrack_core::store::TokenStore;
use uuid::Uuid;

use super::response::MonitorStatus;
use crate::service::ServiceState;

/// Tracing target for monitor operations.
const TRACING_TARGET: &str = "uptrack_server::handler::monitors";

/// Namespace used for health check tokens.
const HEALTH_NAMESPACE: &str = "health";

/// Lifetime of a check token left behind by an interrupted check.
const CHECK_EXPIRY: Duration = Duration::from_secs(5);

/// Writes, reads back and evicts a throwaway token.
async fn check_token_store(store: &dyn TokenStore<Progress>) -> uptrack_core::Result<bool> {
    let name = Uuid::new_v4().simple().to_string();
    let marker = Progress::idle();

    let entry = store
        .put(&name, Some(HEALTH_NAMESPACE), marker, Some(CHECK_EXPIRY))
        .await?;
    let read_back = store.get(&name, Some(HEALTH_NAMESPACE)).await?;
    let evicted = store.force_expire(&entry.identity).await?;

    Ok(read_back == Some(marker) && evicted)
}

#[tracing::instrument(skip_all)]
async fn health_status(
    State(token_store): State<Arc<dyn TokenStore<Progress>>>,
) -> (StatusCode, Json<MonitorStatus>) {
    let is_healthy = match check_token_store(token_store.as_ref()).await {
        Ok(is_healthy) => is_healthy,
        Err(err) => {
            tracing::warn!(
                target: TRACING_TARGET,
                error = %err,
                "Token store health check failed"
            );
            false
        }
    };

    let status_code = if is_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    tracing::debug!(
        target: TRACING_TARGET,
        is_healthy = is_healthy,
        status_code = status_code.as_u16(),
        "Health status response prepared"
    );

    (status_code, Json(MonitorStatus::new(is_healthy)))
}

/// Returns a [`Router`] with all health monitoring routes.
pub fn routes() -> Router<ServiceState> {
    Router::new().route("/health", get(health_status))
}
