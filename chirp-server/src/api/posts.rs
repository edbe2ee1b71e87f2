use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::{
    api::{parse_email, parse_post_id, request_time, ApiResult},
    db::SqliteStore,
    engine::{self, EngagementError, LikeOutcome, NewPost, PostOutcome, Store},
    state::AppState,
};
use chirp_types::{CreatePostRequest, LikeRequest, Post};

/// Upper bound on `?limit=`
const MAX_PAGE_SIZE: usize = 100;

#[derive(Deserialize)]
pub struct GetPostsQuery {
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    25
}

/// GET /posts - Newest posts first, `limit` per page (default 25, at most 100)
pub async fn get_posts(
    State(state): State<AppState>,
    Query(query): Query<GetPostsQuery>,
) -> ApiResult<Json<Vec<Post>>> {
    let conn = state.db.connection()?;
    let posts = SqliteStore::new(&conn).posts(query.limit.min(MAX_PAGE_SIZE))?;
    Ok(Json(posts))
}

/// GET /posts/:id
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Post>> {
    let post_id = parse_post_id(&id)?;
    let conn = state.db.connection()?;

    let post = SqliteStore::new(&conn)
        .get_post(&post_id)?
        .ok_or_else(|| EngagementError::post_not_found(&post_id))?;

    Ok(Json(post))
}

/// POST /posts - Publish a post and credit its author
pub async fn create_post(
    State(state): State<AppState>,
    Json(payload): Json<CreatePostRequest>,
) -> ApiResult<(StatusCode, Json<PostOutcome>)> {
    let draft = NewPost {
        author: parse_email(&payload.email)?,
        body: payload.body,
        photo: payload.photo,
        video: payload.video,
    };

    let outcome = state
        .db
        .transaction(|store| engine::create_post(store, draft, request_time()))?;

    Ok((StatusCode::CREATED, Json(outcome)))
}

/// POST /posts/:id/like - Like the post, or take the like back
pub async fn toggle_like(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<LikeRequest>,
) -> ApiResult<Json<LikeOutcome>> {
    let post_id = parse_post_id(&id)?;
    let author = parse_email(&payload.post_email)?;
    let liker = parse_email(&payload.liked_by_email)?;

    let outcome = state.db.transaction(|store| {
        engine::toggle_like(store, &post_id, &author, &liker, request_time())
    })?;

    tracing::debug!(
        "{} {} post {}",
        liker,
        if outcome.liked { "liked" } else { "unliked" },
        post_id
    );
    Ok(Json(outcome))
}
