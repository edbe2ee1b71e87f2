use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

use chirp_types::{BadgeKind, Email, User};

use super::error::{EngagementError, EngagementResult};
use super::store::Store;

/// Counters the badge rules are evaluated against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct EngagementStats {
    pub post_count: i64,
    pub upvotes: i64,
    pub follower_count: i64,
}

impl EngagementStats {
    pub fn of(user: &User) -> Self {
        Self {
            post_count: user.post_count,
            upvotes: user.upvotes,
            follower_count: user.follower_count() as i64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    PostCount,
    Upvotes,
    FollowerCount,
}

impl Metric {
    fn read(&self, stats: &EngagementStats) -> i64 {
        match self {
            Metric::PostCount => stats.post_count,
            Metric::Upvotes => stats.upvotes,
            Metric::FollowerCount => stats.follower_count,
        }
    }
}

/// A badge is earned once `metric >= threshold`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadgeRule {
    pub kind: BadgeKind,
    pub metric: Metric,
    pub threshold: i64,
}

impl BadgeRule {
    pub fn is_met(&self, stats: &EngagementStats) -> bool {
        self.metric.read(stats) >= self.threshold
    }
}

pub const BADGE_RULES: &[BadgeRule] = &[
    BadgeRule {
        kind: BadgeKind::FivePosts,
        metric: Metric::PostCount,
        threshold: 5,
    },
    BadgeRule {
        kind: BadgeKind::HundredPosts,
        metric: Metric::PostCount,
        threshold: 100,
    },
    BadgeRule {
        kind: BadgeKind::HundredLikes,
        metric: Metric::Upvotes,
        threshold: 100,
    },
    BadgeRule {
        kind: BadgeKind::OneFollower,
        metric: Metric::FollowerCount,
        threshold: 1,
    },
];

/// Every badge kind the given counters qualify for
pub fn earned_badges(stats: &EngagementStats) -> BTreeSet<BadgeKind> {
    BADGE_RULES
        .iter()
        .filter(|rule| rule.is_met(stats))
        .map(|rule| rule.kind)
        .collect()
}

/// Union the earned badges into the user's badge log.
///
/// Badges already held are left alone, and nothing is ever removed even if a
/// counter has since dropped below its threshold. Returns the kinds newly
/// awarded by this call.
pub fn evaluate_badges<S: Store + ?Sized>(
    store: &S,
    email: &Email,
    stats: EngagementStats,
    now: DateTime<Utc>,
) -> EngagementResult<Vec<BadgeKind>> {
    let held = store.badges(email)?;
    let mut awarded = Vec::new();

    for kind in earned_badges(&stats).difference(&held) {
        if store.insert_badge(email, *kind, now)? {
            awarded.push(*kind);
        }
    }

    if !awarded.is_empty() {
        tracing::info!("Awarded {:?} to {}", awarded, email);
    }

    Ok(awarded)
}

/// Re-evaluate badges from the user's stored counters
pub fn evaluate_user_badges<S: Store + ?Sized>(
    store: &S,
    email: &Email,
    now: DateTime<Utc>,
) -> EngagementResult<Vec<BadgeKind>> {
    let user = store
        .get_user(email)?
        .ok_or_else(|| EngagementError::user_not_found(email))?;
    evaluate_badges(store, email, EngagementStats::of(&user), now)
}
