use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    api::{parse_email, request_time, ApiResult},
    engine::{self, FollowOutcome, TransferOutcome},
    state::AppState,
};
use chirp_types::{FollowRequest, TransferPointsRequest};

/// POST /users/:email/follow - Follow the user, or unfollow if already following
pub async fn toggle_follow(
    State(state): State<AppState>,
    Path(email): Path<String>,
    Json(payload): Json<FollowRequest>,
) -> ApiResult<Json<FollowOutcome>> {
    let target = parse_email(&email)?;
    let follower = parse_email(&payload.follower_email)?;

    let outcome = state
        .db
        .transaction(|store| engine::toggle_follow(store, &target, &follower, request_time()))?;

    Ok(Json(outcome))
}

/// POST /points/transfer - Move the configured amount from sender to receiver
pub async fn transfer_points(
    State(state): State<AppState>,
    Json(payload): Json<TransferPointsRequest>,
) -> ApiResult<Json<TransferOutcome>> {
    let sender = parse_email(&payload.sender_email)?;
    let receiver = parse_email(&payload.receiver_email)?;
    let amount = state.transfer_amount;

    let outcome = state.db.transaction(|store| {
        engine::transfer_points(store, &sender, &receiver, amount, request_time())
    })?;

    tracing::info!(
        "Transferred {} points from {} to {}",
        outcome.amount,
        outcome.sender,
        outcome.receiver
    );
    Ok(Json(outcome))
}
