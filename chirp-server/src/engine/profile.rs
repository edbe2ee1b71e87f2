use chirp_types::{Email, User};

use super::error::{EngagementError, EngagementResult};
use super::store::{Store, UserPatch};

/// Profile fields a user may change. `None` leaves the field as stored.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub username: Option<String>,
}

fn provided(field: &str, value: Option<String>) -> EngagementResult<Option<String>> {
    match value.as_deref().map(str::trim) {
        None => Ok(None),
        Some("") => Err(EngagementError::invalid(format!("{} cannot be blank", field))),
        Some(value) => Ok(Some(value.to_string())),
    }
}

/// Replace the user's display name and/or username.
///
/// Counters, plan and follow sets are never touched here.
pub fn update_profile<S: Store + ?Sized>(
    store: &S,
    email: &Email,
    update: ProfileUpdate,
) -> EngagementResult<User> {
    let patch = UserPatch {
        name: provided("name", update.name)?,
        username: provided("username", update.username)?,
        ..Default::default()
    };

    if !store.update_user(email, &patch)? {
        return Err(EngagementError::user_not_found(email));
    }

    tracing::debug!("Updated profile of {}", email);
    store
        .get_user(email)?
        .ok_or_else(|| EngagementError::user_not_found(email))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::memory::MemoryStore;
    use crate::engine::plan::{register_user, NewUser};
    use chrono::Utc;

    fn registered(raw: &str) -> (MemoryStore, Email) {
        let store = MemoryStore::new();
        let email = Email::parse(raw).unwrap();
        register_user(
            &store,
            NewUser {
                email: email.clone(),
                name: "Olive".to_string(),
                username: Some("olive".to_string()),
            },
            Utc::now(),
        )
        .unwrap();
        (store, email)
    }

    #[test]
    fn test_update_name_only() {
        let (store, email) = registered("olive@example.com");
        let before = store.get_user(&email).unwrap().unwrap();

        let user = update_profile(
            &store,
            &email,
            ProfileUpdate {
                name: Some("  Olive Oyl ".to_string()),
                username: None,
            },
        )
        .unwrap();

        assert_eq!(user.name, "Olive Oyl");
        assert_eq!(user.username, "olive");
        assert_eq!(user.points, before.points);
        assert_eq!(user.expiry_date, before.expiry_date);
    }

    #[test]
    fn test_update_both_fields() {
        let (store, email) = registered("olive@example.com");
        update_profile(
            &store,
            &email,
            ProfileUpdate {
                name: Some("O".to_string()),
                username: Some("oyl".to_string()),
            },
        )
        .unwrap();

        let stored = store.get_user(&email).unwrap().unwrap();
        assert_eq!((stored.name.as_str(), stored.username.as_str()), ("O", "oyl"));
    }

    #[test]
    fn test_blank_field_is_rejected() {
        let (store, email) = registered("olive@example.com");
        let result = update_profile(
            &store,
            &email,
            ProfileUpdate {
                name: None,
                username: Some("   ".to_string()),
            },
        );
        assert!(matches!(result, Err(EngagementError::InvalidInput(_))));
        assert_eq!(store.get_user(&email).unwrap().unwrap().username, "olive");
    }

    #[test]
    fn test_unknown_user_is_not_found() {
        let store = MemoryStore::new();
        let ghost = Email::parse("ghost@example.com").unwrap();
        let result = update_profile(&store, &ghost, ProfileUpdate::default());
        assert!(matches!(result, Err(EngagementError::NotFound(_))));
    }
}
