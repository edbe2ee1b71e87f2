pub mod error;
pub mod plans;
pub mod posts;
pub mod social;
pub mod users;

pub use error::{ApiError, ApiResult};

use axum::{
    routing::{get, post},
    Router,
};
use chirp_types::Email;
use chrono::{DateTime, SubsecRound, Utc};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::state::AppState;

/// Build the HTTP router over the given state
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/register", post(users::register))
        // User routes
        .route("/users", get(users::list_users))
        .route("/users/:email", get(users::get_user).patch(users::update_profile))
        .route("/users/:email/posts", get(users::get_user_posts))
        .route("/users/:email/badges", get(users::get_badges))
        .route("/users/:email/badges/evaluate", post(users::evaluate_badges))
        .route("/users/:email/follow", post(social::toggle_follow))
        // Plan routes
        .route("/users/:email/plan", post(plans::update_plan))
        .route("/users/:email/plan/downgrade", post(plans::downgrade))
        .route("/users/:email/plan/check-expiry", post(plans::check_expiry))
        .route("/users/:email/post-remains", get(plans::get_post_remains))
        .route(
            "/users/:email/post-remains/decrement",
            post(plans::decrement_post_remains),
        )
        // Post routes
        .route("/posts", get(posts::get_posts).post(posts::create_post))
        .route("/posts/:id", get(posts::get_post))
        .route("/posts/:id/like", post(posts::toggle_like))
        // Points
        .route("/points/transfer", post(social::transfer_points))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn health_check() -> &'static str {
    "OK"
}

/// Current time at the precision the database keeps, so a response and a
/// later read of the same record agree
pub(crate) fn request_time() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Parse an email from a path segment or request body field
pub(crate) fn parse_email(raw: &str) -> ApiResult<Email> {
    Email::parse(raw).map_err(|e| ApiError::BadRequest(e.to_string()))
}

pub(crate) fn parse_post_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ApiError::BadRequest(format!("Invalid post id: {}", raw)))
}
