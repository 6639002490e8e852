//! Relay server binary.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use skillswap_store::Database;

use skillswap_relay::api::{self, AppState};
use skillswap_relay::call::CallBoard;
use skillswap_relay::config::RelayConfig;
use skillswap_relay::fanout::Notifier;
use skillswap_relay::gatekeeper::{Gatekeeper, RevocationList, UserDirectory};
use skillswap_relay::limiter::AdmissionLimiter;
use skillswap_relay::registry::SessionRegistry;
use skillswap_relay::router::RoomRouter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,skillswap_relay=debug")),
        )
        .init();

    info!("Starting SkillSwap relay v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = RelayConfig::from_env();
    info!(
        addr = %config.http_addr,
        db = %config.db_path.display(),
        "Loaded configuration"
    );

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------
    let db = Arc::new(Mutex::new(Database::open_at(&config.db_path)?));

    let registry = SessionRegistry::new();
    let router = RoomRouter::new(registry.clone());
    let calls = CallBoard::new();
    let notifier = Notifier::new(db, router.clone());

    let directory = UserDirectory::new();
    let revocations = RevocationList::new();
    let gatekeeper = Gatekeeper::new(&config.jwt_secret, directory, revocations.clone());

    let limiter = AdmissionLimiter::default();

    let state = AppState {
        registry,
        router,
        calls,
        notifier,
        gatekeeper,
        limiter: limiter.clone(),
        config: Arc::new(config.clone()),
    };

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Periodic revocation cleanup: drop entries whose token lifetime has
    // elapsed (every 10 minutes).
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(600));
        loop {
            interval.tick().await;
            revocations.purge_expired().await;
        }
    });

    // Periodic rate-limit window cleanup (every 5 minutes).
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            limiter.purge_stale().await;
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP/WebSocket server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(state, config.http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
