use chirp_server::{api, config, db, engine, state::AppState};
use chrono::Utc;
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chirp_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load settings
    let settings = config::Settings::new().expect("Failed to load settings");

    // Initialize database
    let db = db::Database::new(&settings.database.path).expect("Failed to create database");

    db.initialize()
        .expect("Failed to initialize database schema");
    tracing::info!("Database initialized at {}", settings.database.path);

    if settings.database.seed_demo_data {
        db.seed_demo_data().expect("Failed to seed demo data");
        tracing::info!("Demo data seeded");
    }

    // Downgrade lapsed plans on startup, then periodically
    run_expiry_sweep(&db);

    if settings.engagement.expiry_sweep_secs > 0 {
        let sweep_db = db.clone();
        let period = Duration::from_secs(settings.engagement.expiry_sweep_secs);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick fires immediately and startup already swept
            interval.tick().await;
            loop {
                interval.tick().await;
                tracing::debug!("Running periodic plan expiry sweep...");
                run_expiry_sweep(&sweep_db);
            }
        });
    }

    let state = AppState::new(db).with_transfer_amount(settings.engagement.transfer_amount);
    let app = api::router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .expect("Failed to parse server address");
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app).await.expect("Server error");
}

fn run_expiry_sweep(db: &db::Database) {
    match db.transaction(|store| engine::expire_all(store, Utc::now())) {
        Ok(sweep) if !sweep.downgraded.is_empty() => {
            tracing::info!(
                "Expiry sweep: downgraded {} of {} users",
                sweep.downgraded.len(),
                sweep.checked
            );
        }
        Ok(sweep) => tracing::debug!("Expiry sweep: {} users checked, none lapsed", sweep.checked),
        Err(e) => tracing::error!("Plan expiry sweep failed: {}", e),
    }
}
