pub mod applications;
pub mod auth;
pub mod chat;
pub mod connections;
pub mod jobs;
pub mod middleware;
pub mod profile;
pub mod protocol;
pub mod rest;
pub mod state;
pub mod ws_handler;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub use middleware::require_auth;
pub use rest::ApiDoc;
pub use state::AppState;
pub use ws_handler::ws_handler;

/// Builds every API route. CORS and the Swagger UI are layered on by the binary.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(rest::health_handler))
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/roles/{role}/defaults", get(jobs::role_defaults_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route(
            "/profile",
            get(profile::get_profile_handler)
                .put(profile::put_profile_handler)
                .delete(profile::delete_profile_handler),
        )
        .route("/jobs", get(jobs::list_jobs_handler))
        .route("/jobs/refresh", post(jobs::refresh_jobs_handler))
        .route("/jobs/{id}", get(jobs::get_job_handler))
        .route("/jobs/{id}/apply", post(applications::apply_handler))
        .route("/applications", get(applications::list_applications_handler))
        .route(
            "/applications/{id}/withdraw",
            post(applications::withdraw_handler),
        )
        .route("/connections", get(connections::overview_handler))
        .route(
            "/connections/{user_id}",
            axum::routing::delete(connections::remove_handler),
        )
        .route(
            "/connections/{user_id}/request",
            post(connections::request_handler),
        )
        .route(
            "/connections/{user_id}/accept",
            post(connections::accept_handler),
        )
        .route(
            "/connections/{user_id}/decline",
            post(connections::decline_handler),
        )
        .route(
            "/connections/{user_id}/cancel",
            post(connections::cancel_handler),
        )
        .route(
            "/chat/{user_id}/messages",
            get(chat::list_messages_handler).post(chat::send_message_handler),
        )
        .route("/ws/chat", get(ws_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(app_state)
}
