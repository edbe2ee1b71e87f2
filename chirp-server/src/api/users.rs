use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    api::{parse_email, request_time, ApiResult},
    db::SqliteStore,
    engine::{self, EngagementError, NewUser, ProfileUpdate, Store},
    state::AppState,
};
use chirp_types::{Badge, BadgeKind, Post, RegisterRequest, UpdateProfileRequest, User};

/// POST /register - Create an account on the basic plan
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let new_user = NewUser {
        email: parse_email(&payload.email)?,
        name: payload.name,
        username: payload.username,
    };

    let user = state
        .db
        .transaction(|store| engine::register_user(store, new_user, request_time()))?;

    tracing::info!("Registered {}", user.email);
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /users - All users, ordered by username
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    let conn = state.db.connection()?;
    let users = SqliteStore::new(&conn).list_users()?;
    Ok(Json(users))
}

/// GET /users/:email
pub async fn get_user(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Json<User>> {
    let email = parse_email(&email)?;
    let conn = state.db.connection()?;

    let user = SqliteStore::new(&conn)
        .get_user(&email)?
        .ok_or_else(|| EngagementError::user_not_found(&email))?;

    Ok(Json(user))
}

/// PATCH /users/:email - Change display name and/or username
pub async fn update_profile(
    State(state): State<AppState>,
    Path(email): Path<String>,
    Json(payload): Json<UpdateProfileRequest>,
) -> ApiResult<Json<User>> {
    let email = parse_email(&email)?;
    let update = ProfileUpdate {
        name: payload.name,
        username: payload.username,
    };

    let user = state
        .db
        .transaction(|store| engine::update_profile(store, &email, update))?;
    Ok(Json(user))
}

/// GET /users/:email/posts - The user's posts, newest first
pub async fn get_user_posts(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Json<Vec<Post>>> {
    let email = parse_email(&email)?;
    let conn = state.db.connection()?;
    let store = SqliteStore::new(&conn);

    if store.get_user(&email)?.is_none() {
        return Err(EngagementError::user_not_found(&email).into());
    }

    Ok(Json(store.posts_by_author(&email)?))
}

/// GET /users/:email/badges - Badge log, oldest award first
pub async fn get_badges(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Json<Vec<Badge>>> {
    let email = parse_email(&email)?;
    let conn = state.db.connection()?;
    let store = SqliteStore::new(&conn);

    if store.get_user(&email)?.is_none() {
        return Err(EngagementError::user_not_found(&email).into());
    }

    Ok(Json(store.badge_log(&email)?))
}

/// POST /users/:email/badges/evaluate - Award any badges the stored counters earn
pub async fn evaluate_badges(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Json<Vec<BadgeKind>>> {
    let email = parse_email(&email)?;
    let awarded = state
        .db
        .transaction(|store| engine::evaluate_user_badges(store, &email, request_time()))?;
    Ok(Json(awarded))
}
