use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    api::{parse_email, request_time, ApiError, ApiResult},
    db::SqliteStore,
    engine::{self, ExpiryOutcome, PlanTerms, QuotaOutcome},
    state::AppState,
};
use chirp_types::{Plan, PostRemainsResponse, UpdatePlanRequest};

/// POST /users/:email/plan - Switch to a plan, resetting quota and expiry
pub async fn update_plan(
    State(state): State<AppState>,
    Path(email): Path<String>,
    Json(payload): Json<UpdatePlanRequest>,
) -> ApiResult<Json<PlanTerms>> {
    let email = parse_email(&email)?;
    let plan = Plan::parse(&payload.plan)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown plan: {}", payload.plan)))?;

    let terms = state
        .db
        .transaction(|store| engine::apply_plan(store, &email, plan, request_time()))?;
    Ok(Json(terms))
}

/// POST /users/:email/plan/downgrade
pub async fn downgrade(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Json<PlanTerms>> {
    let email = parse_email(&email)?;
    let terms = state
        .db
        .transaction(|store| engine::downgrade(store, &email, request_time()))?;
    Ok(Json(terms))
}

/// POST /users/:email/plan/check-expiry
pub async fn check_expiry(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Json<ExpiryOutcome>> {
    let email = parse_email(&email)?;
    let outcome = state
        .db
        .transaction(|store| engine::check_expiry(store, &email, request_time()))?;
    Ok(Json(outcome))
}

/// GET /users/:email/post-remains
pub async fn get_post_remains(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Json<PostRemainsResponse>> {
    let email = parse_email(&email)?;
    let conn = state.db.connection()?;
    let post_remains = engine::post_remains(&SqliteStore::new(&conn), &email)?;
    Ok(Json(PostRemainsResponse { post_remains }))
}

/// POST /users/:email/post-remains/decrement
///
/// An unknown user changes nothing and is answered with 404.
pub async fn decrement_post_remains(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Json<PostRemainsResponse>> {
    let email = parse_email(&email)?;
    let outcome = state
        .db
        .transaction(|store| engine::decrement_post_quota(store, &email))?;

    match outcome {
        QuotaOutcome::Decremented { post_remains } => Ok(Json(PostRemainsResponse { post_remains })),
        QuotaOutcome::NoChanges => Err(ApiError::NotFound(format!("No changes for {}", email))),
    }
}
