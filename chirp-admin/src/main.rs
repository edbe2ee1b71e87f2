use anyhow::{Context, Result};
use chirp_server::db::{Database, SqliteStore};
use chirp_server::engine::{
    self, earned_badges, plan::expiry_transition, EngagementStats, ExpiryOutcome, Store,
};
use chirp_types::User;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

/// Chirp maintenance utility
///
/// Runs the engagement sweeps that the server otherwise performs lazily:
/// downgrading lapsed plans and awarding badges users have already earned.
#[derive(Parser, Debug)]
#[command(name = "chirp-admin")]
#[command(about = "Maintenance sweeps for the Chirp database", long_about = None)]
struct Args {
    /// Path to the SQLite database file
    #[arg(short, long, env = "DATABASE_PATH", default_value = "./chirp.db")]
    database: String,

    /// Report what would change without writing anything
    #[arg(short = 'n', long, global = true)]
    dry_run: bool,

    /// Evaluate as of this RFC 3339 time instead of now
    #[arg(long, global = true)]
    as_of: Option<DateTime<Utc>>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Downgrade every user whose plan has expired to basic
    ExpirePlans,
    /// Award any badges the stored counters already qualify for
    AwardBadges,
}

/// Statistics collected during a sweep
#[derive(Debug, Default)]
struct SweepStats {
    users_checked: usize,
    plans_downgraded: usize,
    badges_awarded: usize,
    errors: Vec<String>,
}

impl SweepStats {
    fn new() -> Self {
        Self::default()
    }

    fn record_checked(&mut self) {
        self.users_checked += 1;
    }

    fn record_downgrade(&mut self) {
        self.plans_downgraded += 1;
    }

    fn record_badges(&mut self, count: usize) {
        self.badges_awarded += count;
    }

    fn record_error(&mut self, error: String) {
        self.errors.push(error);
    }
}

fn list_users(db: &Database) -> Result<Vec<User>> {
    let conn = db.connection()?;
    SqliteStore::new(&conn)
        .list_users()
        .context("Failed to list users")
}

/// Downgrade one user if their plan has lapsed at `now`
fn expire_user(db: &Database, user: &User, now: DateTime<Utc>, dry_run: bool) -> Result<bool> {
    if dry_run {
        return Ok(expiry_transition(user, now).is_some());
    }

    let outcome = db
        .transaction(|store| engine::check_expiry(store, &user.email, now))
        .with_context(|| format!("Failed to check expiry for {}", user.email))?;

    Ok(matches!(outcome, ExpiryOutcome::Downgraded { .. }))
}

/// Award the badges one user qualifies for. Returns how many are new.
fn award_user(db: &Database, user: &User, now: DateTime<Utc>, dry_run: bool) -> Result<usize> {
    if dry_run {
        let conn = db.connection()?;
        let held = SqliteStore::new(&conn).badges(&user.email)?;
        let earned = earned_badges(&EngagementStats::of(user));
        return Ok(earned.difference(&held).count());
    }

    let awarded = db
        .transaction(|store| engine::evaluate_user_badges(store, &user.email, now))
        .with_context(|| format!("Failed to evaluate badges for {}", user.email))?;

    Ok(awarded.len())
}

/// Run `command` over every user, continuing past per-user failures
fn run_sweep(db: &Database, command: Command, now: DateTime<Utc>, dry_run: bool) -> Result<SweepStats> {
    let users = list_users(db)?;
    let mut stats = SweepStats::new();

    for user in &users {
        stats.record_checked();

        let result = match command {
            Command::ExpirePlans => expire_user(db, user, now, dry_run).map(|downgraded| {
                if downgraded {
                    stats.record_downgrade();
                }
            }),
            Command::AwardBadges => {
                award_user(db, user, now, dry_run).map(|count| stats.record_badges(count))
            }
        };

        if let Err(e) = result {
            let error_msg = format!("{}: {:#}", user.email, e);
            eprintln!("ERROR: {}", error_msg);
            stats.record_error(error_msg);
        }
    }

    Ok(stats)
}

/// Open the database and make sure it carries the Chirp schema
fn connect_database(path: &str) -> Result<Database> {
    println!("Connecting to database: {}", path);

    if !std::path::Path::new(path).exists() {
        anyhow::bail!("Database file not found: {}", path);
    }

    let db = Database::new(path).context("Failed to open database connection")?;
    let conn = db.connection()?;

    for table in ["users", "posts", "follows", "badges"] {
        let exists: bool = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
                [table],
                |row| row.get::<_, i32>(0).map(|count| count > 0),
            )
            .with_context(|| format!("Failed to check for {} table", table))?;

        if !exists {
            anyhow::bail!("Database schema is invalid - {} table not found", table);
        }
    }

    Ok(db)
}

fn display_stats(stats: &SweepStats, command: Command, dry_run: bool) {
    println!();
    println!("Sweep Summary");
    println!("=============");
    println!();
    println!("Users checked: {}", stats.users_checked);
    match command {
        Command::ExpirePlans => println!("Plans downgraded: {}", stats.plans_downgraded),
        Command::AwardBadges => println!("Badges awarded: {}", stats.badges_awarded),
    }

    if !stats.errors.is_empty() {
        println!();
        println!("Errors encountered: {}", stats.errors.len());
        for (i, error) in stats.errors.iter().enumerate() {
            println!("  {}. {}", i + 1, error);
        }
    }

    if dry_run {
        println!();
        println!("This was a dry run - no changes were made to the database.");
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chirp_server=info".into()),
        )
        .init();

    let args = Args::parse();
    let now = args.as_of.unwrap_or_else(Utc::now);

    println!("Database: {}", args.database);
    println!("Evaluating as of: {}", now.to_rfc3339());
    println!("Dry run: {}", args.dry_run);

    let db = connect_database(&args.database)?;
    let stats = run_sweep(&db, args.command, now, args.dry_run)?;
    display_stats(&stats, args.command, args.dry_run);

    if !stats.errors.is_empty() {
        anyhow::bail!("{} users could not be processed", stats.errors.len());
    }
    Ok(())
}
