use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::Connection;

use chirp_types::Email;

use crate::db::columns::{email_column, format_timestamp};

pub struct FollowRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> FollowRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Follow a user. Returns `false` if the edge already existed.
    pub fn follow(&self, follower: &Email, target: &Email) -> Result<bool> {
        let inserted = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO follows (follower_email, following_email, created_at)
                 VALUES (?, ?, ?)",
                (
                    follower.as_str(),
                    target.as_str(),
                    format_timestamp(&Utc::now()),
                ),
            )
            .context("Failed to follow user")?;
        Ok(inserted > 0)
    }

    /// Unfollow a user. Returns `false` if there was no edge.
    pub fn unfollow(&self, follower: &Email, target: &Email) -> Result<bool> {
        let deleted = self
            .conn
            .execute(
                "DELETE FROM follows WHERE follower_email = ? AND following_email = ?",
                (follower.as_str(), target.as_str()),
            )
            .context("Failed to unfollow user")?;
        Ok(deleted > 0)
    }

    /// Get list of users that this user is following
    pub fn get_following(&self, email: &Email) -> Result<Vec<Email>> {
        let mut stmt = self.conn.prepare(
            "SELECT following_email FROM follows WHERE follower_email = ? ORDER BY created_at DESC",
        )?;

        let following = stmt
            .query_map([email.as_str()], |row| email_column(row, 0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(following)
    }

    /// Get list of users that follow this user
    pub fn get_followers(&self, email: &Email) -> Result<Vec<Email>> {
        let mut stmt = self.conn.prepare(
            "SELECT follower_email FROM follows WHERE following_email = ? ORDER BY created_at DESC",
        )?;

        let followers = stmt
            .query_map([email.as_str()], |row| email_column(row, 0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(followers)
    }
}
