use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Basic,
    Monthly,
    Yearly,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Basic => "basic",
            Plan::Monthly => "monthly",
            Plan::Yearly => "yearly",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "basic" => Some(Plan::Basic),
            "monthly" => Some(Plan::Monthly),
            "yearly" => Some(Plan::Yearly),
            _ => None,
        }
    }
}

/// Achievement kinds a user can earn.
///
/// Ordered so that a `BTreeSet<BadgeKind>` lists badges the way profiles
/// display them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BadgeKind {
    #[serde(rename = "5_posts_badge", alias = "5_posts")]
    FivePosts,
    #[serde(rename = "100_posts_badge", alias = "100_posts")]
    HundredPosts,
    #[serde(rename = "100_likes_badge", alias = "100_likes")]
    HundredLikes,
    #[serde(rename = "1_follower_badge", alias = "1_follower")]
    OneFollower,
}

impl BadgeKind {
    pub const ALL: [BadgeKind; 4] = [
        BadgeKind::FivePosts,
        BadgeKind::HundredPosts,
        BadgeKind::HundredLikes,
        BadgeKind::OneFollower,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeKind::FivePosts => "5_posts_badge",
            BadgeKind::HundredPosts => "100_posts_badge",
            BadgeKind::HundredLikes => "100_likes_badge",
            BadgeKind::OneFollower => "1_follower_badge",
        }
    }

    /// Accepts both the stored name (`5_posts_badge`) and the short one (`5_posts`).
    pub fn parse(s: &str) -> Option<Self> {
        let name = s.trim();
        let name = name.strip_suffix("_badge").unwrap_or(name);
        match name {
            "5_posts" => Some(BadgeKind::FivePosts),
            "100_posts" => Some(BadgeKind::HundredPosts),
            "100_likes" => Some(BadgeKind::HundredLikes),
            "1_follower" => Some(BadgeKind::OneFollower),
            _ => None,
        }
    }
}
