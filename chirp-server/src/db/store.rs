use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use chirp_types::{Badge, BadgeKind, Email, Post, User};

use crate::db::repositories::{BadgeRepository, FollowRepository, PostRepository, UserRepository};
use crate::engine::{PostPatch, Store, UserPatch};

/// [`Store`] over a single SQLite connection.
///
/// Built on a plain pooled connection for reads, or on an open transaction
/// via [`Database::transaction`](crate::db::Database::transaction) when the
/// engine mutates several records.
pub struct SqliteStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn users(&self) -> UserRepository<'conn> {
        UserRepository::new(self.conn)
    }

    fn posts_repo(&self) -> PostRepository<'conn> {
        PostRepository::new(self.conn)
    }

    fn follows(&self) -> FollowRepository<'conn> {
        FollowRepository::new(self.conn)
    }

    fn badge_repo(&self) -> BadgeRepository<'conn> {
        BadgeRepository::new(self.conn)
    }
}

impl Store for SqliteStore<'_> {
    fn get_user(&self, email: &Email) -> Result<Option<User>> {
        self.users().get_by_email(email)
    }

    fn insert_user(&self, user: &User) -> Result<()> {
        self.users().create(user)
    }

    fn update_user(&self, email: &Email, patch: &UserPatch) -> Result<bool> {
        self.users().apply_patch(email, patch)
    }

    fn list_users(&self) -> Result<Vec<User>> {
        self.users().list_all()
    }

    fn users_expired_before(&self, now: DateTime<Utc>) -> Result<Vec<Email>> {
        self.users().expired_before(&now)
    }

    fn get_post(&self, id: &Uuid) -> Result<Option<Post>> {
        self.posts_repo().get_by_id(id)
    }

    fn insert_post(&self, post: &Post) -> Result<()> {
        self.posts_repo().create(post)
    }

    fn update_post(&self, id: &Uuid, patch: &PostPatch) -> Result<bool> {
        self.posts_repo().apply_patch(id, patch)
    }

    fn posts(&self, limit: usize) -> Result<Vec<Post>> {
        self.posts_repo().get_posts(limit)
    }

    fn posts_by_author(&self, author: &Email) -> Result<Vec<Post>> {
        self.posts_repo().get_by_author(author)
    }

    fn add_follow(&self, follower: &Email, target: &Email) -> Result<bool> {
        self.follows().follow(follower, target)
    }

    fn remove_follow(&self, follower: &Email, target: &Email) -> Result<bool> {
        self.follows().unfollow(follower, target)
    }

    fn badge_log(&self, email: &Email) -> Result<Vec<Badge>> {
        self.badge_repo().get_for_user(email)
    }

    fn insert_badge(
        &self,
        email: &Email,
        kind: BadgeKind,
        awarded_at: DateTime<Utc>,
    ) -> Result<bool> {
        self.badge_repo().award(email, kind, &awarded_at)
    }
}
