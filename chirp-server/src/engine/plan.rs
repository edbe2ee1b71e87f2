use chrono::{DateTime, Months, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

use chirp_types::{Email, Plan, User};

use super::error::{EngagementError, EngagementResult};
use super::store::{Store, UserPatch};

pub const BASIC_POST_QUOTA: i64 = 20;
pub const MONTHLY_POST_QUOTA: i64 = 50;
pub const YEARLY_POST_QUOTA: i64 = 700;

/// Plan, posting quota and expiry granted together when a plan starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlanTerms {
    pub plan: Plan,
    pub post_remains: i64,
    pub expiry_date: DateTime<Utc>,
}

impl PlanTerms {
    /// Terms for `plan` starting at `now`.
    ///
    /// Month arithmetic clamps to the last day of shorter months
    /// (Jan 31 + 1 month = Feb 28/29).
    pub fn starting(plan: Plan, now: DateTime<Utc>) -> Self {
        let (post_remains, months) = match plan {
            Plan::Basic => (BASIC_POST_QUOTA, 1),
            Plan::Monthly => (MONTHLY_POST_QUOTA, 1),
            Plan::Yearly => (YEARLY_POST_QUOTA, 12),
        };

        Self {
            plan,
            post_remains,
            expiry_date: now
                .checked_add_months(Months::new(months))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }
}

/// Registration details for a new account
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub name: String,
    pub username: Option<String>,
}

/// Create an account with zeroed counters on the basic plan
pub fn register_user<S: Store + ?Sized>(
    store: &S,
    new_user: NewUser,
    now: DateTime<Utc>,
) -> EngagementResult<User> {
    if store.get_user(&new_user.email)?.is_some() {
        return Err(EngagementError::invalid(format!(
            "{} is already registered",
            new_user.email
        )));
    }

    let name = match new_user.name.trim() {
        "" => new_user.email.local_part().to_string(),
        name => name.to_string(),
    };
    let username = new_user
        .username
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| new_user.email.local_part())
        .to_string();
    let terms = PlanTerms::starting(Plan::Basic, now);

    let user = User {
        email: new_user.email,
        name,
        username,
        points: 0,
        upvotes: 0,
        post_count: 0,
        followers: BTreeSet::new(),
        following: BTreeSet::new(),
        plan: terms.plan,
        post_remains: terms.post_remains,
        expiry_date: terms.expiry_date,
        last_transfer_date: None,
        join_date: now,
    };

    store.insert_user(&user)?;
    tracing::info!("Registered user {}", user.email);
    Ok(user)
}

/// Start `plan` for the user as of `now`, replacing quota and expiry
pub fn apply_plan<S: Store + ?Sized>(
    store: &S,
    email: &Email,
    plan: Plan,
    now: DateTime<Utc>,
) -> EngagementResult<PlanTerms> {
    let terms = PlanTerms::starting(plan, now);
    let patch = UserPatch {
        terms: Some(terms),
        ..Default::default()
    };

    if !store.update_user(email, &patch)? {
        return Err(EngagementError::user_not_found(email));
    }

    tracing::info!(
        "User {} moved to {} plan until {}",
        email,
        plan.as_str(),
        terms.expiry_date
    );
    Ok(terms)
}

/// Unconditionally fall back to the basic plan
pub fn downgrade<S: Store + ?Sized>(
    store: &S,
    email: &Email,
    now: DateTime<Utc>,
) -> EngagementResult<PlanTerms> {
    apply_plan(store, email, Plan::Basic, now)
}

/// Terms to apply if the user's plan has lapsed at `now`
pub fn expiry_transition(user: &User, now: DateTime<Utc>) -> Option<PlanTerms> {
    (now > user.expiry_date).then(|| PlanTerms::starting(Plan::Basic, now))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExpiryOutcome {
    Active {
        plan: Plan,
        expiry_date: DateTime<Utc>,
    },
    Downgraded {
        previous: Plan,
        terms: PlanTerms,
    },
}

/// Downgrade the user to basic if their plan has expired.
///
/// A lapsed basic plan is renewed the same way, which refills its quota and
/// pushes the expiry a month forward.
pub fn check_expiry<S: Store + ?Sized>(
    store: &S,
    email: &Email,
    now: DateTime<Utc>,
) -> EngagementResult<ExpiryOutcome> {
    let user = store
        .get_user(email)?
        .ok_or_else(|| EngagementError::user_not_found(email))?;

    let Some(terms) = expiry_transition(&user, now) else {
        return Ok(ExpiryOutcome::Active {
            plan: user.plan,
            expiry_date: user.expiry_date,
        });
    };

    let patch = UserPatch {
        terms: Some(terms),
        ..Default::default()
    };
    if !store.update_user(email, &patch)? {
        return Err(EngagementError::user_not_found(email));
    }

    tracing::info!(
        "Plan for {} expired at {}, downgraded from {}",
        email,
        user.expiry_date,
        user.plan.as_str()
    );
    Ok(ExpiryOutcome::Downgraded {
        previous: user.plan,
        terms,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExpirySweep {
    pub checked: usize,
    pub downgraded: Vec<Email>,
}

/// Run `check_expiry` for every user whose plan has lapsed
pub fn expire_all<S: Store + ?Sized>(
    store: &S,
    now: DateTime<Utc>,
) -> EngagementResult<ExpirySweep> {
    let mut sweep = ExpirySweep::default();

    for email in store.users_expired_before(now)? {
        sweep.checked += 1;
        if let ExpiryOutcome::Downgraded { .. } = check_expiry(store, &email, now)? {
            sweep.downgraded.push(email);
        }
    }

    Ok(sweep)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QuotaOutcome {
    Decremented { post_remains: i64 },
    NoChanges,
}

/// Use up one post from the user's quota.
///
/// An unknown user is reported as `NoChanges` rather than an error.
pub fn decrement_post_quota<S: Store + ?Sized>(
    store: &S,
    email: &Email,
) -> EngagementResult<QuotaOutcome> {
    let patch = UserPatch {
        post_remains: -1,
        ..Default::default()
    };

    if !store.update_user(email, &patch)? {
        tracing::debug!("No quota to decrement for unknown user {}", email);
        return Ok(QuotaOutcome::NoChanges);
    }

    Ok(QuotaOutcome::Decremented {
        post_remains: post_remains(store, email)?,
    })
}

pub fn post_remains<S: Store + ?Sized>(store: &S, email: &Email) -> EngagementResult<i64> {
    store
        .get_user(email)?
        .map(|user| user.post_remains)
        .ok_or_else(|| EngagementError::user_not_found(email))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::memory::MemoryStore;
    use chrono::{Duration, TimeZone};

    fn email(raw: &str) -> Email {
        Email::parse(raw).unwrap()
    }

    fn register(store: &MemoryStore, raw: &str, now: DateTime<Utc>) -> User {
        register_user(
            store,
            NewUser {
                email: email(raw),
                name: String::new(),
                username: None,
            },
            now,
        )
        .unwrap()
    }

    #[test]
    fn test_plan_terms() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();

        let basic = PlanTerms::starting(Plan::Basic, now);
        assert_eq!(basic.post_remains, 20);
        assert_eq!(basic.expiry_date, Utc.with_ymd_and_hms(2024, 4, 10, 12, 0, 0).unwrap());

        let monthly = PlanTerms::starting(Plan::Monthly, now);
        assert_eq!(monthly.post_remains, 50);
        assert_eq!(monthly.expiry_date, basic.expiry_date);

        let yearly = PlanTerms::starting(Plan::Yearly, now);
        assert_eq!(yearly.post_remains, 700);
        assert_eq!(yearly.expiry_date, Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_month_end_clamps() {
        let now = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();
        let terms = PlanTerms::starting(Plan::Basic, now);
        assert_eq!(terms.expiry_date, Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_register_defaults() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let user = register(&store, "Frank@Example.com", now);

        assert_eq!(user.email.as_str(), "frank@example.com");
        assert_eq!(user.username, "frank");
        assert_eq!(user.name, "frank");
        assert_eq!(user.plan, Plan::Basic);
        assert_eq!(user.post_remains, BASIC_POST_QUOTA);
        assert_eq!(user.points, 0);
        assert!(user.expiry_date > now);
        assert_eq!(store.get_user(&user.email).unwrap(), Some(user));
    }

    #[test]
    fn test_register_twice_is_rejected() {
        let store = MemoryStore::new();
        register(&store, "grace@example.com", Utc::now());

        let again = register_user(
            &store,
            NewUser {
                email: email("grace@example.com"),
                name: "Grace".to_string(),
                username: Some("grace2".to_string()),
            },
            Utc::now(),
        );
        assert!(matches!(again, Err(EngagementError::InvalidInput(_))));
    }

    #[test]
    fn test_expired_yearly_plan_is_downgraded() {
        let store = MemoryStore::new();
        let start = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let user = register(&store, "heidi@example.com", start);
        apply_plan(&store, &user.email, Plan::Yearly, start).unwrap();

        let now = Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap();
        let outcome = check_expiry(&store, &user.email, now).unwrap();

        let expected = PlanTerms {
            plan: Plan::Basic,
            post_remains: 20,
            expiry_date: Utc.with_ymd_and_hms(2024, 2, 2, 9, 0, 0).unwrap(),
        };
        assert_eq!(
            outcome,
            ExpiryOutcome::Downgraded {
                previous: Plan::Yearly,
                terms: expected,
            }
        );

        let stored = store.get_user(&user.email).unwrap().unwrap();
        assert_eq!(stored.plan, Plan::Basic);
        assert_eq!(stored.post_remains, 20);
        assert_eq!(stored.expiry_date, expected.expiry_date);
    }

    #[test]
    fn test_active_plan_is_untouched() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let user = register(&store, "ivan@example.com", now);
        apply_plan(&store, &user.email, Plan::Monthly, now).unwrap();

        let outcome = check_expiry(&store, &user.email, now + Duration::days(3)).unwrap();
        assert!(matches!(outcome, ExpiryOutcome::Active { plan: Plan::Monthly, .. }));
        assert_eq!(store.get_user(&user.email).unwrap().unwrap().post_remains, 50);
    }

    #[test]
    fn test_repeated_check_after_downgrade_is_noop_within_month() {
        let store = MemoryStore::new();
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let user = register(&store, "judy@example.com", start);

        let later = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        check_expiry(&store, &user.email, later).unwrap();
        let after_first = store.get_user(&user.email).unwrap().unwrap();

        let outcome = check_expiry(&store, &user.email, later + Duration::days(1)).unwrap();
        assert!(matches!(outcome, ExpiryOutcome::Active { .. }));
        assert_eq!(store.get_user(&user.email).unwrap().unwrap(), after_first);
    }

    #[test]
    fn test_check_expiry_unknown_user() {
        let store = MemoryStore::new();
        let result = check_expiry(&store, &email("nobody@example.com"), Utc::now());
        assert!(matches!(result, Err(EngagementError::NotFound(_))));
    }

    #[test]
    fn test_expire_all_only_touches_lapsed_plans() {
        let store = MemoryStore::new();
        let old = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

        let lapsed = register(&store, "ken@example.com", old);
        let current = register(&store, "lena@example.com", now);

        let sweep = expire_all(&store, now).unwrap();
        assert_eq!(sweep.checked, 1);
        assert_eq!(sweep.downgraded, vec![lapsed.email]);
        assert_eq!(store.get_user(&current.email).unwrap().unwrap(), current);
    }

    #[test]
    fn test_decrement_post_quota() {
        let store = MemoryStore::new();
        let user = register(&store, "mallory@example.com", Utc::now());

        let outcome = decrement_post_quota(&store, &user.email).unwrap();
        assert_eq!(outcome, QuotaOutcome::Decremented { post_remains: 19 });
        assert_eq!(post_remains(&store, &user.email).unwrap(), 19);
    }

    #[test]
    fn test_decrement_unknown_user_reports_no_changes() {
        let store = MemoryStore::new();
        let outcome = decrement_post_quota(&store, &email("ghost@example.com")).unwrap();
        assert_eq!(outcome, QuotaOutcome::NoChanges);
    }

    #[test]
    fn test_apply_plan_unknown_user() {
        let store = MemoryStore::new();
        let result = apply_plan(&store, &email("ghost@example.com"), Plan::Monthly, Utc::now());
        assert!(matches!(result, Err(EngagementError::NotFound(_))));
    }
}
