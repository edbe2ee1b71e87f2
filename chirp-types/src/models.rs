use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::email::Email;
use crate::enums::{BadgeKind, Plan};

// Custom serde module for DateTime to ensure RFC3339 string format
mod datetime_format {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&date.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse::<DateTime<Utc>>().map_err(serde::de::Error::custom)
    }
}

mod optional_datetime_format {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(date) => serializer.serialize_some(&date.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|s| s.parse::<DateTime<Utc>>().map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub email: Email,
    pub name: String,
    pub username: String,
    /// Not floored at zero: unlikes can push it negative
    pub points: i64,
    pub upvotes: i64,
    pub post_count: i64,
    #[serde(default)]
    pub followers: BTreeSet<Email>,
    #[serde(default)]
    pub following: BTreeSet<Email>,
    pub plan: Plan,
    pub post_remains: i64,
    #[serde(with = "datetime_format")]
    pub expiry_date: DateTime<Utc>,
    #[serde(default, with = "optional_datetime_format")]
    pub last_transfer_date: Option<DateTime<Utc>>,
    #[serde(with = "datetime_format")]
    pub join_date: DateTime<Utc>,
}

impl User {
    pub fn follower_count(&self) -> usize {
        self.followers.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author: Email,
    pub body: String,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub video: Option<String>,
    /// Emails of users who currently like this post
    #[serde(default)]
    pub liked: BTreeSet<Email>,
    /// Like count plus the bonus granted to video posts at creation
    pub upvotes: i64,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Badge {
    pub email: Email,
    pub badge: BadgeKind,
    #[serde(with = "datetime_format")]
    pub awarded_at: DateTime<Utc>,
}

// Request/Response types for API
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatePostRequest {
    pub email: String,
    pub body: String,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub video: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LikeRequest {
    pub post_email: String,
    pub liked_by_email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FollowRequest {
    pub follower_email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransferPointsRequest {
    pub sender_email: String,
    pub receiver_email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdatePlanRequest {
    pub plan: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostRemainsResponse {
    pub post_remains: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: Option<String>,
}
