use axum::Router;

use crate::state::SharedState;

pub mod docs;
pub mod health;
pub mod identity;
pub mod sessions;
pub mod sse;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(sse::router())
        .merge(sessions::router())
        .merge(docs::router());

    api_router.with_state(state)
}
