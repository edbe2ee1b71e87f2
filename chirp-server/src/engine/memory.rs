use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use chirp_types::{Badge, BadgeKind, Email, Post, User};

use super::store::{LikeChange, PostPatch, Store, UserPatch};

#[derive(Debug, Default)]
struct MemoryState {
    users: BTreeMap<Email, User>,
    posts: HashMap<Uuid, Post>,
    /// (follower, target) edges
    follows: BTreeSet<(Email, Email)>,
    badges: Vec<Badge>,
}

impl MemoryState {
    fn hydrate(&self, user: &User) -> User {
        let mut user = user.clone();
        user.followers = self
            .follows
            .iter()
            .filter(|(_, target)| target == &user.email)
            .map(|(follower, _)| follower.clone())
            .collect();
        user.following = self
            .follows
            .iter()
            .filter(|(follower, _)| follower == &user.email)
            .map(|(_, target)| target.clone())
            .collect();
        user
    }
}

/// In-process store used by tests and tools that do not need SQLite.
///
/// Each call is atomic under a single lock; multi-call operations are not.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("Memory store lock poisoned"))
    }
}

fn newest_first(mut posts: Vec<Post>) -> Vec<Post> {
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    posts
}

impl Store for MemoryStore {
    fn get_user(&self, email: &Email) -> Result<Option<User>> {
        let state = self.state()?;
        Ok(state.users.get(email).map(|user| state.hydrate(user)))
    }

    fn insert_user(&self, user: &User) -> Result<()> {
        let mut state = self.state()?;
        if state.users.contains_key(&user.email) {
            bail!("User {} already exists", user.email);
        }
        let mut stored = user.clone();
        stored.followers.clear();
        stored.following.clear();
        state.users.insert(user.email.clone(), stored);
        Ok(())
    }

    fn update_user(&self, email: &Email, patch: &UserPatch) -> Result<bool> {
        let mut state = self.state()?;
        let Some(user) = state.users.get_mut(email) else {
            return Ok(false);
        };

        user.points += patch.points;
        user.upvotes += patch.upvotes;
        user.post_count += patch.post_count;
        user.post_remains += patch.post_remains;
        if let Some(terms) = patch.terms {
            user.plan = terms.plan;
            user.post_remains = terms.post_remains;
            user.expiry_date = terms.expiry_date;
        }
        if let Some(at) = patch.last_transfer_date {
            user.last_transfer_date = Some(at);
        }
        if let Some(name) = &patch.name {
            user.name = name.clone();
        }
        if let Some(username) = &patch.username {
            user.username = username.clone();
        }
        Ok(true)
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let state = self.state()?;
        Ok(state.users.values().map(|user| state.hydrate(user)).collect())
    }

    fn users_expired_before(&self, now: DateTime<Utc>) -> Result<Vec<Email>> {
        let state = self.state()?;
        Ok(state
            .users
            .values()
            .filter(|user| user.expiry_date < now)
            .map(|user| user.email.clone())
            .collect())
    }

    fn get_post(&self, id: &Uuid) -> Result<Option<Post>> {
        Ok(self.state()?.posts.get(id).cloned())
    }

    fn insert_post(&self, post: &Post) -> Result<()> {
        let mut state = self.state()?;
        if !state.users.contains_key(&post.author) {
            bail!("Author {} does not exist", post.author);
        }
        state.posts.insert(post.id, post.clone());
        Ok(())
    }

    fn update_post(&self, id: &Uuid, patch: &PostPatch) -> Result<bool> {
        let mut state = self.state()?;
        let Some(post) = state.posts.get_mut(id) else {
            return Ok(false);
        };

        post.upvotes += patch.upvotes;
        match &patch.like {
            Some(LikeChange::Add(email)) => {
                post.liked.insert(email.clone());
            }
            Some(LikeChange::Remove(email)) => {
                post.liked.remove(email);
            }
            None => {}
        }
        Ok(true)
    }

    fn posts(&self, limit: usize) -> Result<Vec<Post>> {
        let posts = self.state()?.posts.values().cloned().collect();
        let mut posts = newest_first(posts);
        posts.truncate(limit);
        Ok(posts)
    }

    fn posts_by_author(&self, author: &Email) -> Result<Vec<Post>> {
        let posts = self
            .state()?
            .posts
            .values()
            .filter(|post| &post.author == author)
            .cloned()
            .collect();
        Ok(newest_first(posts))
    }

    fn add_follow(&self, follower: &Email, target: &Email) -> Result<bool> {
        let mut state = self.state()?;
        Ok(state.follows.insert((follower.clone(), target.clone())))
    }

    fn remove_follow(&self, follower: &Email, target: &Email) -> Result<bool> {
        let mut state = self.state()?;
        Ok(state.follows.remove(&(follower.clone(), target.clone())))
    }

    fn badge_log(&self, email: &Email) -> Result<Vec<Badge>> {
        Ok(self
            .state()?
            .badges
            .iter()
            .filter(|badge| &badge.email == email)
            .cloned()
            .collect())
    }

    fn insert_badge(
        &self,
        email: &Email,
        kind: BadgeKind,
        awarded_at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut state = self.state()?;
        if state
            .badges
            .iter()
            .any(|badge| &badge.email == email && badge.badge == kind)
        {
            return Ok(false);
        }
        state.badges.push(Badge {
            email: email.clone(),
            badge: kind,
            awarded_at,
        });
        Ok(true)
    }
}
