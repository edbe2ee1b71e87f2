use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use uuid::Uuid;

use chirp_types::{BadgeKind, Email, Post, User};

use super::badges::{evaluate_badges, EngagementStats};
use super::error::{EngagementError, EngagementResult};
use super::store::{LikeChange, PostPatch, Store, UserPatch};

/// Points credited to an author for each new post
pub const POST_POINTS: i64 = 2;
pub const MAX_POST_LENGTH: usize = 280;
pub const DEFAULT_TRANSFER_AMOUNT: i64 = 2;

fn require_user<S: Store + ?Sized>(store: &S, email: &Email) -> EngagementResult<User> {
    store
        .get_user(email)?
        .ok_or_else(|| EngagementError::user_not_found(email))
}

fn require_post<S: Store + ?Sized>(store: &S, post_id: &Uuid) -> EngagementResult<Post> {
    store
        .get_post(post_id)?
        .ok_or_else(|| EngagementError::post_not_found(post_id))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Upvotes a post starts with: one for an attached video, zero otherwise
pub fn video_bonus(video: Option<&str>) -> i64 {
    match video {
        Some(url) if !url.trim().is_empty() => 1,
        _ => 0,
    }
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub author: Email,
    pub body: String,
    pub photo: Option<String>,
    pub video: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostOutcome {
    pub post: Post,
    pub awarded: Vec<BadgeKind>,
}

pub fn create_post<S: Store + ?Sized>(
    store: &S,
    draft: NewPost,
    now: DateTime<Utc>,
) -> EngagementResult<PostOutcome> {
    let body = draft.body.trim();
    if body.is_empty() {
        return Err(EngagementError::invalid("Post content cannot be empty"));
    }
    let length = body.chars().count();
    if length > MAX_POST_LENGTH {
        return Err(EngagementError::invalid(format!(
            "Post content exceeds {} character limit (current: {})",
            MAX_POST_LENGTH, length
        )));
    }

    let author = require_user(store, &draft.author)?;
    let bonus = video_bonus(draft.video.as_deref());

    let post = Post {
        id: Uuid::new_v4(),
        author: author.email.clone(),
        body: body.to_string(),
        photo: non_blank(draft.photo),
        video: non_blank(draft.video),
        liked: BTreeSet::new(),
        upvotes: bonus,
        created_at: now,
    };
    store.insert_post(&post)?;

    let patch = UserPatch {
        post_count: 1,
        points: POST_POINTS,
        upvotes: bonus,
        ..Default::default()
    };
    store.update_user(&author.email, &patch)?;

    let author = require_user(store, &author.email)?;
    let awarded = evaluate_badges(store, &author.email, EngagementStats::of(&author), now)?;

    tracing::debug!("Created post {} by {}", post.id, author.email);
    Ok(PostOutcome { post, awarded })
}

/// What a like toggle does, decided from the post as currently stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LikeTransition {
    Like(Email),
    Unlike(Email),
}

impl LikeTransition {
    pub fn for_post(post: &Post, liker: &Email) -> Self {
        if post.liked.contains(liker) {
            LikeTransition::Unlike(liker.clone())
        } else {
            LikeTransition::Like(liker.clone())
        }
    }

    pub fn delta(&self) -> i64 {
        match self {
            LikeTransition::Like(_) => 1,
            LikeTransition::Unlike(_) => -1,
        }
    }

    pub fn post_patch(&self) -> PostPatch {
        let like = match self {
            LikeTransition::Like(email) => LikeChange::Add(email.clone()),
            LikeTransition::Unlike(email) => LikeChange::Remove(email.clone()),
        };
        PostPatch {
            upvotes: self.delta(),
            like: Some(like),
        }
    }

    /// Author upvotes and points move with every like and unlike. Points are
    /// not floored, so unlikes can take them below zero.
    pub fn author_patch(&self) -> UserPatch {
        UserPatch {
            upvotes: self.delta(),
            points: self.delta(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LikeOutcome {
    pub post_id: Uuid,
    pub liked: bool,
    pub post_upvotes: i64,
    pub author_upvotes: i64,
    pub author_points: i64,
    pub awarded: Vec<BadgeKind>,
}

pub fn toggle_like<S: Store + ?Sized>(
    store: &S,
    post_id: &Uuid,
    post_author: &Email,
    liker: &Email,
    now: DateTime<Utc>,
) -> EngagementResult<LikeOutcome> {
    let post = require_post(store, post_id)?;
    if &post.author != post_author {
        return Err(EngagementError::invalid(format!(
            "Post {} was not written by {}",
            post_id, post_author
        )));
    }
    require_user(store, post_author)?;
    require_user(store, liker)?;

    let transition = LikeTransition::for_post(&post, liker);
    store.update_post(post_id, &transition.post_patch())?;
    store.update_user(post_author, &transition.author_patch())?;

    let post = require_post(store, post_id)?;
    let author = require_user(store, post_author)?;
    let awarded = evaluate_badges(store, post_author, EngagementStats::of(&author), now)?;

    Ok(LikeOutcome {
        post_id: post.id,
        liked: matches!(transition, LikeTransition::Like(_)),
        post_upvotes: post.upvotes,
        author_upvotes: author.upvotes,
        author_points: author.points,
        awarded,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct FollowOutcome {
    pub target: Email,
    pub follower: Email,
    /// Whether `follower` follows `target` after the toggle
    pub following: bool,
    pub follower_count: usize,
    pub awarded: Vec<BadgeKind>,
}

/// Follow `target` if `follower` does not already, otherwise unfollow.
///
/// The store keeps one edge per relationship, so the target's followers and
/// the follower's following change together.
pub fn toggle_follow<S: Store + ?Sized>(
    store: &S,
    target: &Email,
    follower: &Email,
    now: DateTime<Utc>,
) -> EngagementResult<FollowOutcome> {
    if target == follower {
        return Err(EngagementError::invalid("Users cannot follow themselves"));
    }

    let target_user = require_user(store, target)?;
    require_user(store, follower)?;

    let following = if target_user.followers.contains(follower) {
        store.remove_follow(follower, target)?;
        false
    } else {
        store.add_follow(follower, target)?;
        true
    };

    let target_user = require_user(store, target)?;
    let awarded = evaluate_badges(store, target, EngagementStats::of(&target_user), now)?;

    tracing::debug!(
        "{} {} {}",
        follower,
        if following { "followed" } else { "unfollowed" },
        target
    );
    Ok(FollowOutcome {
        target: target.clone(),
        follower: follower.clone(),
        following,
        follower_count: target_user.follower_count(),
        awarded,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct TransferOutcome {
    pub sender: Email,
    pub receiver: Email,
    pub amount: i64,
    pub sender_points: i64,
    pub receiver_points: i64,
    pub transferred_at: DateTime<Utc>,
}

/// Same UTC calendar day, regardless of how many hours apart
pub fn transferred_today(last_transfer: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    last_transfer.is_some_and(|last| last.date_naive() == now.date_naive())
}

pub fn transfer_points<S: Store + ?Sized>(
    store: &S,
    sender: &Email,
    receiver: &Email,
    amount: i64,
    now: DateTime<Utc>,
) -> EngagementResult<TransferOutcome> {
    if amount <= 0 {
        return Err(EngagementError::invalid("Transfer amount must be positive"));
    }

    let sender_user = require_user(store, sender)?;
    require_user(store, receiver)?;

    if sender == receiver {
        return Err(EngagementError::invalid("Cannot transfer points to yourself"));
    }
    if sender_user.points < amount {
        return Err(EngagementError::InsufficientPoints {
            available: sender_user.points,
            required: amount,
        });
    }
    if transferred_today(sender_user.last_transfer_date, now) {
        return Err(EngagementError::AlreadyTransferredToday);
    }

    let debit = UserPatch {
        points: -amount,
        last_transfer_date: Some(now),
        ..Default::default()
    };
    let credit = UserPatch {
        points: amount,
        ..Default::default()
    };
    store.update_user(sender, &debit)?;
    store.update_user(receiver, &credit)?;

    let sender_user = require_user(store, sender)?;
    let receiver_user = require_user(store, receiver)?;

    tracing::info!("{} transferred {} points to {}", sender, amount, receiver);
    Ok(TransferOutcome {
        sender: sender.clone(),
        receiver: receiver.clone(),
        amount,
        sender_points: sender_user.points,
        receiver_points: receiver_user.points,
        transferred_at: now,
    })
}
