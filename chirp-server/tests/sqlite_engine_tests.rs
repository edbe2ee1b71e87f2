// Engagement flows run against the SQLite store inside real transactions.
// Fixed times are whole seconds since stored timestamps keep microseconds.

use chirp_server::db::{Database, SqliteStore};
use chirp_server::engine::{
    self, EngagementError, ExpiryOutcome, NewPost, NewUser, QuotaOutcome, Store,
};
use chirp_types::{BadgeKind, Email, Plan, User};
use chrono::{DateTime, TimeZone, Utc};

fn test_db() -> Database {
    let db = Database::in_memory().expect("Failed to create database");
    db.initialize().expect("Failed to initialize schema");
    db
}

fn email(raw: &str) -> Email {
    Email::parse(raw).unwrap()
}

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
}

fn register(db: &Database, raw: &str, now: DateTime<Utc>) -> User {
    db.transaction(|store| {
        engine::register_user(
            store,
            NewUser {
                email: email(raw),
                name: String::new(),
                username: None,
            },
            now,
        )
    })
    .expect("Failed to register user")
}

fn fetch(db: &Database, raw: &str) -> User {
    let conn = db.connection().unwrap();
    SqliteStore::new(&conn).get_user(&email(raw)).unwrap().unwrap()
}

fn publish(db: &Database, author: &str, video: Option<&str>, now: DateTime<Utc>) -> engine::PostOutcome {
    db.transaction(|store| {
        engine::create_post(
            store,
            NewPost {
                author: email(author),
                body: "hello chirp".to_string(),
                photo: None,
                video: video.map(str::to_string),
            },
            now,
        )
    })
    .expect("Failed to create post")
}

#[test]
fn test_register_round_trips_through_sqlite() {
    let db = test_db();
    let created = register(&db, "Dana@Example.com", at(1, 9));
    let stored = fetch(&db, "dana@example.com");

    assert_eq!(stored, created);
    assert_eq!(stored.plan, Plan::Basic);
    assert_eq!(stored.post_remains, 20);
    assert_eq!(stored.expiry_date, Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap());
}

#[test]
fn test_duplicate_registration_rejected() {
    let db = test_db();
    register(&db, "dana@example.com", at(1, 9));

    let result = db.transaction(|store| {
        engine::register_user(
            store,
            NewUser {
                email: email("dana@example.com"),
                name: "Dana".to_string(),
                username: None,
            },
            at(2, 9),
        )
    });
    assert!(matches!(result, Err(EngagementError::InvalidInput(_))));
}

#[test]
fn test_video_post_and_like_cycle() {
    let db = test_db();
    register(&db, "author@example.com", at(1, 9));
    register(&db, "fan@example.com", at(1, 9));

    let outcome = publish(&db, "author@example.com", Some("clip.mp4"), at(2, 9));
    assert_eq!(outcome.post.upvotes, 1);

    let author = fetch(&db, "author@example.com");
    assert_eq!((author.points, author.upvotes, author.post_count), (2, 1, 1));

    let like = |now: DateTime<Utc>| {
        db.transaction(|store| {
            engine::toggle_like(
                store,
                &outcome.post.id,
                &email("author@example.com"),
                &email("fan@example.com"),
                now,
            )
        })
        .unwrap()
    };

    let liked = like(at(2, 10));
    assert!(liked.liked);
    assert_eq!((liked.post_upvotes, liked.author_upvotes, liked.author_points), (2, 2, 3));

    let unliked = like(at(2, 11));
    assert!(!unliked.liked);
    assert_eq!((unliked.post_upvotes, unliked.author_upvotes, unliked.author_points), (1, 1, 2));

    let conn = db.connection().unwrap();
    let post = SqliteStore::new(&conn).get_post(&outcome.post.id).unwrap().unwrap();
    assert!(post.liked.is_empty());
}

#[test]
fn test_like_with_wrong_author_changes_nothing() {
    let db = test_db();
    register(&db, "author@example.com", at(1, 9));
    register(&db, "fan@example.com", at(1, 9));
    let outcome = publish(&db, "author@example.com", None, at(2, 9));

    let result = db.transaction(|store| {
        engine::toggle_like(
            store,
            &outcome.post.id,
            &email("fan@example.com"),
            &email("fan@example.com"),
            at(2, 10),
        )
    });
    assert!(matches!(result, Err(EngagementError::InvalidInput(_))));

    let conn = db.connection().unwrap();
    let post = SqliteStore::new(&conn).get_post(&outcome.post.id).unwrap().unwrap();
    assert_eq!(post.upvotes, 0);
    assert!(post.liked.is_empty());
}

#[test]
fn test_follow_toggle_is_symmetric_and_awards_badge() {
    let db = test_db();
    register(&db, "star@example.com", at(1, 9));
    register(&db, "fan@example.com", at(1, 9));

    let followed = db
        .transaction(|store| {
            engine::toggle_follow(store, &email("star@example.com"), &email("fan@example.com"), at(2, 9))
        })
        .unwrap();
    assert!(followed.following);
    assert_eq!(followed.awarded, vec![BadgeKind::OneFollower]);

    let star = fetch(&db, "star@example.com");
    let fan = fetch(&db, "fan@example.com");
    assert!(star.followers.contains(&fan.email));
    assert!(fan.following.contains(&star.email));

    let unfollowed = db
        .transaction(|store| {
            engine::toggle_follow(store, &email("star@example.com"), &email("fan@example.com"), at(3, 9))
        })
        .unwrap();
    assert!(!unfollowed.following);
    assert!(unfollowed.awarded.is_empty());

    let star = fetch(&db, "star@example.com");
    let fan = fetch(&db, "fan@example.com");
    assert!(star.followers.is_empty());
    assert!(fan.following.is_empty());

    // Badges are never revoked
    let conn = db.connection().unwrap();
    let badges = SqliteStore::new(&conn).badges(&star.email).unwrap();
    assert!(badges.contains(&BadgeKind::OneFollower));
}

#[test]
fn test_transfer_once_per_day() {
    let db = test_db();
    register(&db, "giver@example.com", at(1, 9));
    register(&db, "first@example.com", at(1, 9));
    register(&db, "second@example.com", at(1, 9));
    publish(&db, "giver@example.com", None, at(1, 10));
    publish(&db, "giver@example.com", None, at(1, 11));

    let transfer = |receiver: &str, now: DateTime<Utc>| {
        db.transaction(|store| {
            engine::transfer_points(store, &email("giver@example.com"), &email(receiver), 2, now)
        })
    };

    let outcome = transfer("first@example.com", at(2, 1)).unwrap();
    assert_eq!((outcome.sender_points, outcome.receiver_points), (2, 2));

    let again = transfer("second@example.com", at(2, 23));
    assert!(matches!(again, Err(EngagementError::AlreadyTransferredToday)));
    assert_eq!(fetch(&db, "second@example.com").points, 0);

    transfer("second@example.com", at(3, 0)).unwrap();
    assert_eq!(fetch(&db, "giver@example.com").points, 0);
    assert_eq!(
        fetch(&db, "giver@example.com").last_transfer_date,
        Some(at(3, 0))
    );
}

#[test]
fn test_insufficient_points_rolls_back() {
    let db = test_db();
    register(&db, "poor@example.com", at(1, 9));
    register(&db, "rich@example.com", at(1, 9));

    let result = db.transaction(|store| {
        engine::transfer_points(store, &email("poor@example.com"), &email("rich@example.com"), 2, at(2, 9))
    });
    assert!(matches!(
        result,
        Err(EngagementError::InsufficientPoints { available: 0, required: 2 })
    ));

    let poor = fetch(&db, "poor@example.com");
    assert_eq!(poor.points, 0);
    assert_eq!(poor.last_transfer_date, None);
}

#[test]
fn test_expiry_sweep_downgrades_lapsed_yearly_plan() {
    let db = test_db();
    register(&db, "annual@example.com", at(1, 9));
    register(&db, "fresh@example.com", at(1, 9));

    db.transaction(|store| engine::apply_plan(store, &email("annual@example.com"), Plan::Yearly, at(1, 9)))
        .unwrap();
    db.transaction(|store| engine::apply_plan(store, &email("fresh@example.com"), Plan::Monthly, at(1, 9)))
        .unwrap();

    // A year on, both paid plans have lapsed
    let later = Utc.with_ymd_and_hms(2025, 3, 15, 0, 0, 0).unwrap();
    let sweep = db.transaction(|store| engine::expire_all(store, later)).unwrap();
    assert_eq!(sweep.checked, 2);
    assert_eq!(sweep.downgraded.len(), 2);

    let annual = fetch(&db, "annual@example.com");
    assert_eq!(annual.plan, Plan::Basic);
    assert_eq!(annual.post_remains, 20);
    assert_eq!(annual.expiry_date, Utc.with_ymd_and_hms(2025, 4, 15, 0, 0, 0).unwrap());

    let outcome = db
        .transaction(|store| engine::check_expiry(store, &email("annual@example.com"), later))
        .unwrap();
    assert!(matches!(outcome, ExpiryOutcome::Active { plan: Plan::Basic, .. }));
}

#[test]
fn test_post_quota_decrement() {
    let db = test_db();
    register(&db, "writer@example.com", at(1, 9));

    let outcome = db
        .transaction(|store| engine::decrement_post_quota(store, &email("writer@example.com")))
        .unwrap();
    assert_eq!(outcome, QuotaOutcome::Decremented { post_remains: 19 });

    let missing = db
        .transaction(|store| engine::decrement_post_quota(store, &email("ghost@example.com")))
        .unwrap();
    assert_eq!(missing, QuotaOutcome::NoChanges);
}

#[test]
fn test_concurrent_toggles_on_shared_post_and_author() {
    const FANS: usize = 16;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db = Database::new(dir.path().join("chirp.db")).expect("Failed to open database");
    db.initialize().expect("Failed to initialize schema");

    register(&db, "author@example.com", at(1, 9));
    let fans: Vec<String> = (0..FANS).map(|i| format!("fan{}@example.com", i)).collect();
    for fan in &fans {
        register(&db, fan, at(1, 9));
    }
    let post = publish(&db, "author@example.com", None, at(2, 9)).post;

    let failures: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = fans
            .iter()
            .map(|fan| {
                let db = &db;
                let post_id = post.id;
                scope.spawn(move || {
                    let author = email("author@example.com");
                    let fan = email(fan);
                    let mut errors = Vec::new();

                    if let Err(e) = db.transaction(|store| {
                        engine::toggle_like(store, &post_id, &author, &fan, at(2, 10))
                    }) {
                        errors.push(format!("like by {}: {}", fan, e));
                    }
                    if let Err(e) = db.transaction(|store| {
                        engine::toggle_follow(store, &author, &fan, at(2, 10))
                    }) {
                        errors.push(format!("follow by {}: {}", fan, e));
                    }
                    errors
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|handle| handle.join().expect("worker panicked"))
            .collect()
    });
    assert!(failures.is_empty(), "toggles failed: {:?}", failures);

    let conn = db.connection().unwrap();
    let store = SqliteStore::new(&conn);
    let post = store.get_post(&post.id).unwrap().unwrap();
    let author = store.get_user(&email("author@example.com")).unwrap().unwrap();

    assert_eq!(post.upvotes, FANS as i64);
    assert_eq!(post.liked.len(), FANS);
    assert_eq!(author.upvotes, FANS as i64);
    assert_eq!(author.followers.len(), FANS);
    for fan in &fans {
        let fan = store.get_user(&email(fan)).unwrap().unwrap();
        assert!(fan.following.contains(&author.email));
    }
}
