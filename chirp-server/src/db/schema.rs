/// SQL schema for the Chirp database
/// Creates all tables with proper constraints, foreign keys, and indexes
pub const SCHEMA: &str = r#"
-- Users table, keyed by normalized email
CREATE TABLE IF NOT EXISTS users (
    email TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    username TEXT NOT NULL,
    points INTEGER NOT NULL DEFAULT 0,
    upvotes INTEGER NOT NULL DEFAULT 0,
    post_count INTEGER NOT NULL DEFAULT 0,
    plan TEXT NOT NULL DEFAULT 'basic' CHECK(plan IN ('basic', 'monthly', 'yearly')),
    post_remains INTEGER NOT NULL DEFAULT 20,
    expiry_date TEXT NOT NULL,
    last_transfer_date TEXT,
    join_date TEXT NOT NULL
);

-- Expiry sweeps scan by expiry date
CREATE INDEX IF NOT EXISTS idx_users_expiry_date ON users(expiry_date);

-- Posts table
CREATE TABLE IF NOT EXISTS posts (
    id TEXT PRIMARY KEY,
    author_email TEXT NOT NULL,
    body TEXT NOT NULL CHECK(length(body) <= 280),
    photo TEXT,
    video TEXT,
    upvotes INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    FOREIGN KEY (author_email) REFERENCES users(email) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_posts_created_at ON posts(created_at DESC);
CREATE INDEX IF NOT EXISTS idx_posts_author ON posts(author_email);

-- Like set: one row per (post, liker)
CREATE TABLE IF NOT EXISTS post_likes (
    post_id TEXT NOT NULL,
    email TEXT NOT NULL,
    liked_at TEXT NOT NULL,
    PRIMARY KEY (post_id, email),
    FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE,
    FOREIGN KEY (email) REFERENCES users(email) ON DELETE CASCADE
);

-- Follows table: a single edge backs both followers and following
CREATE TABLE IF NOT EXISTS follows (
    follower_email TEXT NOT NULL,
    following_email TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (follower_email, following_email),
    CHECK (follower_email <> following_email),
    FOREIGN KEY (follower_email) REFERENCES users(email) ON DELETE CASCADE,
    FOREIGN KEY (following_email) REFERENCES users(email) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_follows_following ON follows(following_email);

-- Append-only badge log, at most one row per (email, badge)
CREATE TABLE IF NOT EXISTS badges (
    email TEXT NOT NULL,
    badge TEXT NOT NULL CHECK(badge IN ('5_posts_badge', '100_posts_badge', '100_likes_badge', '1_follower_badge')),
    awarded_at TEXT NOT NULL,
    PRIMARY KEY (email, badge),
    FOREIGN KEY (email) REFERENCES users(email) ON DELETE CASCADE
);
"#;

/// Demo accounts for local development
pub const DEMO_DATA: &str = r#"
INSERT OR IGNORE INTO users (email, name, username, points, upvotes, post_count, plan, post_remains, expiry_date, join_date) VALUES
    ('alice@chirp.dev', 'Alice', 'alice', 12, 4, 3, 'monthly', 47, '2030-01-01T00:00:00.000000Z', '2024-01-01T00:00:00.000000Z'),
    ('bob@chirp.dev', 'Bob', 'bob', 2, 0, 1, 'basic', 19, '2030-01-01T00:00:00.000000Z', '2024-01-02T00:00:00.000000Z'),
    ('carol@chirp.dev', 'Carol', 'carol', 0, 0, 0, 'yearly', 700, '2024-01-01T00:00:00.000000Z', '2023-01-01T00:00:00.000000Z');

INSERT OR IGNORE INTO follows (follower_email, following_email, created_at) VALUES
    ('bob@chirp.dev', 'alice@chirp.dev', '2024-01-03T00:00:00.000000Z');

INSERT OR IGNORE INTO badges (email, badge, awarded_at) VALUES
    ('alice@chirp.dev', '1_follower_badge', '2024-01-03T00:00:00.000000Z');
"#;
