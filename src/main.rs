//! Focus Mirror - a local time-and-focus tracker
//!
//! This is the main entry point for the focus-mirror server.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use focus_mirror::{
    api::create_router,
    config::Config,
    state::AppState,
    storage::{FileStore, KeyValueStore, MemoryStore},
    tasks::timer_tick_task,
    timer::SystemClock,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("focus_mirror={},tower_http=info", config.log_level()))
        .init();

    info!("Starting focus-mirror server v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: host={}, port={}, tick={}ms, data_dir={}, memory={}",
        config.host,
        config.port,
        config.tick_ms,
        config.data_dir.display(),
        config.memory
    );

    let store: Arc<dyn KeyValueStore> = if config.memory {
        Arc::new(MemoryStore::new())
    } else {
        let store = FileStore::open(&config.data_dir).with_context(|| {
            format!("failed to open data directory {}", config.data_dir.display())
        })?;
        Arc::new(store)
    };

    // Create application state, resuming a timer left running before the restart
    let state = Arc::new(AppState::new(
        store,
        Arc::new(SystemClock),
        config.port,
        config.host.clone(),
    ));

    // Start the timer tick background task
    let ticker = tokio::spawn(timer_tick_task(Arc::clone(&state.timer), config.tick_period()));

    let app = create_router(Arc::clone(&state));

    let addr = config.address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  GET    /timer              - Current timer state");
    info!("  POST   /timer/start        - Lock a task and start its timer");
    info!("  POST   /timer/stop         - Abort the locked task");
    info!("  GET    /logs               - List logged tasks");
    info!("  POST   /logs               - Log a task");
    info!("  PUT    /logs/:id           - Edit a logged task");
    info!("  DELETE /logs/:id           - Delete a logged task");
    info!("  DELETE /logs               - Clear all logged tasks");
    info!("  GET    /dashboard/week     - Weekly summary");
    info!("  GET    /dashboard/month    - Monthly summary");
    info!("  GET    /dashboard/heatmap  - Daily activity heatmap");
    info!("  GET    /calendar/week      - Scheduled tasks of one week");
    info!("  GET    /status             - Server and timer status");
    info!("  GET    /health             - Health check");

    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    ticker.abort();
    info!("Server shutdown complete");
    Ok(())
}
