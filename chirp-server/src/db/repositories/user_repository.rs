use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};
use std::collections::BTreeSet;

use chirp_types::{Email, User};

use crate::db::columns::{
    email_column, format_timestamp, optional_timestamp_column, plan_column, timestamp_column,
};
use crate::engine::UserPatch;

use super::FollowRepository;

const USER_COLUMNS: &str = "email, name, username, points, upvotes, post_count, plan, \
                            post_remains, expiry_date, last_transfer_date, join_date";

pub struct UserRepository<'conn> {
    conn: &'conn Connection,
}

/// Maps a `USER_COLUMNS` row. Follow sets are filled in separately.
fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        email: email_column(row, 0)?,
        name: row.get(1)?,
        username: row.get(2)?,
        points: row.get(3)?,
        upvotes: row.get(4)?,
        post_count: row.get(5)?,
        followers: BTreeSet::new(),
        following: BTreeSet::new(),
        plan: plan_column(row, 6)?,
        post_remains: row.get(7)?,
        expiry_date: timestamp_column(row, 8)?,
        last_transfer_date: optional_timestamp_column(row, 9)?,
        join_date: timestamp_column(row, 10)?,
    })
}

impl<'conn> UserRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn with_follows(&self, mut user: User) -> Result<User> {
        let follows = FollowRepository::new(self.conn);
        user.followers = follows.get_followers(&user.email)?.into_iter().collect();
        user.following = follows.get_following(&user.email)?.into_iter().collect();
        Ok(user)
    }

    /// Get user by email, including follower and following sets
    pub fn get_by_email(&self, email: &Email) -> Result<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS))?;

        let user = stmt
            .query_row([email.as_str()], user_from_row)
            .optional()?;

        user.map(|user| self.with_follows(user)).transpose()
    }

    pub fn create(&self, user: &User) -> Result<()> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO users ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                    USER_COLUMNS
                ),
                (
                    user.email.as_str(),
                    &user.name,
                    &user.username,
                    user.points,
                    user.upvotes,
                    user.post_count,
                    user.plan.as_str(),
                    user.post_remains,
                    format_timestamp(&user.expiry_date),
                    user.last_transfer_date.as_ref().map(format_timestamp),
                    format_timestamp(&user.join_date),
                ),
            )
            .with_context(|| format!("Failed to create user {}", user.email))?;
        Ok(())
    }

    /// Apply counter deltas and assignments in place.
    ///
    /// Returns `false` if the user does not exist.
    pub fn apply_patch(&self, email: &Email, patch: &UserPatch) -> Result<bool> {
        let updated = self
            .conn
            .execute(
                "UPDATE users
                 SET points = points + ?,
                     upvotes = upvotes + ?,
                     post_count = post_count + ?,
                     post_remains = post_remains + ?
                 WHERE email = ?",
                (
                    patch.points,
                    patch.upvotes,
                    patch.post_count,
                    patch.post_remains,
                    email.as_str(),
                ),
            )
            .context("Failed to update user counters")?;

        if updated == 0 {
            return Ok(false);
        }

        if let Some(terms) = &patch.terms {
            self.conn
                .execute(
                    "UPDATE users SET plan = ?, post_remains = ?, expiry_date = ? WHERE email = ?",
                    (
                        terms.plan.as_str(),
                        terms.post_remains,
                        format_timestamp(&terms.expiry_date),
                        email.as_str(),
                    ),
                )
                .context("Failed to update user plan")?;
        }

        if let Some(at) = &patch.last_transfer_date {
            self.conn
                .execute(
                    "UPDATE users SET last_transfer_date = ? WHERE email = ?",
                    (format_timestamp(at), email.as_str()),
                )
                .context("Failed to update last transfer date")?;
        }

        if patch.name.is_some() || patch.username.is_some() {
            self.conn
                .execute(
                    "UPDATE users
                     SET name = COALESCE(?, name),
                         username = COALESCE(?, username)
                     WHERE email = ?",
                    (&patch.name, &patch.username, email.as_str()),
                )
                .context("Failed to update user profile")?;
        }

        Ok(true)
    }

    /// Get all users, ordered by username
    pub fn list_all(&self) -> Result<Vec<User>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM users ORDER BY username, email",
            USER_COLUMNS
        ))?;

        let users = stmt
            .query_map([], user_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        users.into_iter().map(|user| self.with_follows(user)).collect()
    }

    /// Emails of users whose plan expired before `now`
    pub fn expired_before(&self, now: &DateTime<Utc>) -> Result<Vec<Email>> {
        let mut stmt = self
            .conn
            .prepare("SELECT email FROM users WHERE expiry_date < ? ORDER BY expiry_date")?;

        let emails = stmt
            .query_map([format_timestamp(now)], |row| email_column(row, 0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(emails)
    }
}
