use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::Connection;

use chirp_types::{Badge, BadgeKind, Email};

use crate::db::columns::{badge_column, email_column, format_timestamp, timestamp_column};

pub struct BadgeRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> BadgeRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Badges held by the user, oldest award first
    pub fn get_for_user(&self, email: &Email) -> Result<Vec<Badge>> {
        let mut stmt = self.conn.prepare(
            "SELECT email, badge, awarded_at FROM badges WHERE email = ? ORDER BY awarded_at, badge",
        )?;

        let badges = stmt
            .query_map([email.as_str()], |row| {
                Ok(Badge {
                    email: email_column(row, 0)?,
                    badge: badge_column(row, 1)?,
                    awarded_at: timestamp_column(row, 2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(badges)
    }

    /// Record the badge unless already held. Returns whether a row was written.
    pub fn award(&self, email: &Email, kind: BadgeKind, awarded_at: &DateTime<Utc>) -> Result<bool> {
        let inserted = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO badges (email, badge, awarded_at) VALUES (?, ?, ?)",
                (email.as_str(), kind.as_str(), format_timestamp(awarded_at)),
            )
            .with_context(|| format!("Failed to award {} to {}", kind.as_str(), email))?;
        Ok(inserted > 0)
    }
}
