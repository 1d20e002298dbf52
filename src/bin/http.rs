//! Timetable HTTP server.
//!
//! Environment variables:
//!
//! - `TIMETABLE_HTTP_ADDR`: bind address (default `0.0.0.0:3000`)
//! - `TIMETABLE_DB_PATH`: SQLite database, preferred over a snapshot
//! - `TIMETABLE_SNAPSHOT`: JSON snapshot loaded into memory
//! - `TIMETABLE_DEFAULT_TZ`: timezone for teachers without one (default `UTC`)
//! - `TIMETABLE_PARALLEL_LOOKAHEAD`: scan future days on the rayon pool
//! - `RUST_LOG`: log filter (default `info`)

#[cfg(feature = "http_api")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::sync::Arc;

    use timetable::{InMemoryStore, Settings, TimetableStore, http_api, load_snapshot_from_json};
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let settings = Settings::from_env()?;

    let store: Arc<dyn TimetableStore> = match (&settings.db_path, &settings.snapshot_path) {
        #[cfg(feature = "sqlite")]
        (Some(db_path), _) => {
            tracing::info!(path = %db_path.display(), "opening SQLite timetable store");
            Arc::new(timetable::SqliteStore::open(db_path)?)
        }
        #[cfg(not(feature = "sqlite"))]
        (Some(db_path), _) => {
            return Err(format!(
                "TIMETABLE_DB_PATH={} needs the `sqlite` feature",
                db_path.display()
            )
            .into());
        }
        (None, Some(snapshot_path)) => {
            tracing::info!(path = %snapshot_path.display(), "loading timetable snapshot");
            let snapshot = load_snapshot_from_json(snapshot_path)?;
            Arc::new(InMemoryStore::from_snapshot(&snapshot)?)
        }
        (None, None) => {
            tracing::warn!("no store configured, serving an empty timetable");
            Arc::new(InMemoryStore::new())
        }
    };

    let state = http_api::AppState::from_settings(store, &settings);
    http_api::serve(settings.http_addr, state).await?;
    Ok(())
}

#[cfg(not(feature = "http_api"))]
fn main() {
    eprintln!("Rebuild with the `http_api` feature to enable the HTTP server.");
}
