//! Router construction for the interview server.

use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Extension, Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::bearer_auth;
use crate::handlers;
use crate::SharedState;

/// Build the full axum router with all routes and middleware.
pub fn build_router(state: SharedState) -> Router {
    // Routes that require bearer authentication
    let protected = Router::new()
        .route("/interviews", get(handlers::interviews::list_interviews))
        .route(
            "/interviews/:interview_id",
            get(handlers::interviews::get_interview).post(handlers::interviews::start_interview),
        )
        .route("/result", post(handlers::result::result))
        .layer(axum_mw::from_fn(bearer_auth));

    // The update endpoint is public: the encrypted state is self-auth
    let public = Router::new().route("/update", post(handlers::update::update));

    public
        .merge(protected)
        .layer(Extension(state))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
