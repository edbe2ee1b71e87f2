use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row};
use std::collections::BTreeSet;
use uuid::Uuid;

use chirp_types::{Email, Post};

use crate::db::columns::{email_column, format_timestamp, timestamp_column, uuid_column};
use crate::engine::{LikeChange, PostPatch};

const POST_COLUMNS: &str = "id, author_email, body, photo, video, upvotes, created_at";

pub struct PostRepository<'conn> {
    conn: &'conn Connection,
}

/// Maps a `POST_COLUMNS` row. The like set is filled in separately.
fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: uuid_column(row, 0)?,
        author: email_column(row, 1)?,
        body: row.get(2)?,
        photo: row.get(3)?,
        video: row.get(4)?,
        liked: BTreeSet::new(),
        upvotes: row.get(5)?,
        created_at: timestamp_column(row, 6)?,
    })
}

impl<'conn> PostRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn with_likes(&self, mut post: Post) -> Result<Post> {
        post.liked = self.get_likers(&post.id)?.into_iter().collect();
        Ok(post)
    }

    fn query_posts(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Post>> {
        let mut stmt = self.conn.prepare(sql)?;
        let posts = stmt
            .query_map(params, post_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        posts.into_iter().map(|post| self.with_likes(post)).collect()
    }

    /// Create a new post. The like set starts empty.
    pub fn create(&self, post: &Post) -> Result<()> {
        self.conn
            .execute(
                &format!("INSERT INTO posts ({}) VALUES (?, ?, ?, ?, ?, ?, ?)", POST_COLUMNS),
                (
                    post.id.to_string(),
                    post.author.as_str(),
                    &post.body,
                    &post.photo,
                    &post.video,
                    post.upvotes,
                    format_timestamp(&post.created_at),
                ),
            )
            .context("Failed to create post")?;
        Ok(())
    }

    /// Get a single post by ID
    pub fn get_by_id(&self, post_id: &Uuid) -> Result<Option<Post>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS))?;

        let post = stmt
            .query_row([post_id.to_string()], post_from_row)
            .optional()?;

        post.map(|post| self.with_likes(post)).transpose()
    }

    /// Newest posts first
    pub fn get_posts(&self, limit: usize) -> Result<Vec<Post>> {
        self.query_posts(
            &format!(
                "SELECT {} FROM posts ORDER BY created_at DESC LIMIT ?",
                POST_COLUMNS
            ),
            [limit as i64],
        )
    }

    /// A user's posts, newest first
    pub fn get_by_author(&self, author: &Email) -> Result<Vec<Post>> {
        self.query_posts(
            &format!(
                "SELECT {} FROM posts WHERE author_email = ? ORDER BY created_at DESC",
                POST_COLUMNS
            ),
            [author.as_str()],
        )
    }

    /// Emails that currently like the post
    pub fn get_likers(&self, post_id: &Uuid) -> Result<Vec<Email>> {
        let mut stmt = self
            .conn
            .prepare("SELECT email FROM post_likes WHERE post_id = ? ORDER BY liked_at")?;

        let likers = stmt
            .query_map([post_id.to_string()], |row| email_column(row, 0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(likers)
    }

    /// Apply an upvote delta and like-set change.
    ///
    /// Returns `false` if the post does not exist.
    pub fn apply_patch(&self, post_id: &Uuid, patch: &PostPatch) -> Result<bool> {
        let updated = self
            .conn
            .execute(
                "UPDATE posts SET upvotes = upvotes + ? WHERE id = ?",
                (patch.upvotes, post_id.to_string()),
            )
            .context("Failed to update post upvotes")?;

        if updated == 0 {
            return Ok(false);
        }

        match &patch.like {
            Some(LikeChange::Add(email)) => {
                self.conn
                    .execute(
                        "INSERT OR IGNORE INTO post_likes (post_id, email, liked_at) VALUES (?, ?, ?)",
                        (
                            post_id.to_string(),
                            email.as_str(),
                            format_timestamp(&Utc::now()),
                        ),
                    )
                    .context("Failed to record like")?;
            }
            Some(LikeChange::Remove(email)) => {
                self.conn
                    .execute(
                        "DELETE FROM post_likes WHERE post_id = ? AND email = ?",
                        (post_id.to_string(), email.as_str()),
                    )
                    .context("Failed to remove like")?;
            }
            None => {}
        }

        Ok(true)
    }
}
