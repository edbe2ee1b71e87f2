use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use uuid::Uuid;

use chirp_types::{Badge, BadgeKind, Email, Post, User};

use super::plan::PlanTerms;

/// Atomic update applied to a single user record.
///
/// Counter fields are deltas added to the stored value. `terms` replaces the
/// plan, quota and expiry as a unit and wins over `post_remains` when both are
/// set. `name` and `username` replace the stored profile fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPatch {
    pub points: i64,
    pub upvotes: i64,
    pub post_count: i64,
    pub post_remains: i64,
    pub terms: Option<PlanTerms>,
    pub last_transfer_date: Option<DateTime<Utc>>,
    pub name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LikeChange {
    Add(Email),
    Remove(Email),
}

/// Atomic update applied to a single post record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostPatch {
    pub upvotes: i64,
    pub like: Option<LikeChange>,
}

/// Persistence contract the engine runs against.
///
/// Implementations must apply each patch atomically. Callers that need
/// several calls to be atomic together run them inside a store-level
/// transaction (see `Database::transaction`).
pub trait Store {
    fn get_user(&self, email: &Email) -> Result<Option<User>>;

    fn insert_user(&self, user: &User) -> Result<()>;

    /// Returns `false` when no such user exists
    fn update_user(&self, email: &Email, patch: &UserPatch) -> Result<bool>;

    fn list_users(&self) -> Result<Vec<User>>;

    /// Users whose plan expiry is strictly before `now`
    fn users_expired_before(&self, now: DateTime<Utc>) -> Result<Vec<Email>>;

    fn get_post(&self, id: &Uuid) -> Result<Option<Post>>;

    fn insert_post(&self, post: &Post) -> Result<()>;

    /// Returns `false` when no such post exists
    fn update_post(&self, id: &Uuid, patch: &PostPatch) -> Result<bool>;

    /// Newest first
    fn posts(&self, limit: usize) -> Result<Vec<Post>>;

    /// Newest first
    fn posts_by_author(&self, author: &Email) -> Result<Vec<Post>>;

    /// Adds the follow edge. Returns `false` if it already existed.
    fn add_follow(&self, follower: &Email, target: &Email) -> Result<bool>;

    /// Removes the follow edge. Returns `false` if it did not exist.
    fn remove_follow(&self, follower: &Email, target: &Email) -> Result<bool>;

    /// Award records in the order they were earned
    fn badge_log(&self, email: &Email) -> Result<Vec<Badge>>;

    /// Inserts the badge unless the user already holds it. Returns whether a
    /// record was written.
    fn insert_badge(&self, email: &Email, kind: BadgeKind, awarded_at: DateTime<Utc>)
        -> Result<bool>;

    fn badges(&self, email: &Email) -> Result<BTreeSet<BadgeKind>> {
        Ok(self.badge_log(email)?.into_iter().map(|b| b.badge).collect())
    }

    fn badge_exists(&self, email: &Email, kind: BadgeKind) -> Result<bool> {
        Ok(self.badges(email)?.contains(&kind))
    }
}
