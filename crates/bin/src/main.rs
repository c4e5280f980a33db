//! Headless petri simulation server.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Petri Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = sim::Config::load()?;
    info!("Loaded configuration");
    info!("  Border: {}x{}", config.border.width, config.border.height);
    info!("  Game mode: {}", config.server.gamemode);
    info!("  Tick interval: {}ms", config.server.tick_interval_ms);

    let tick_interval = Duration::from_millis(config.server.tick_interval_ms);
    let mut game = sim::Game::new(config);
    game.init_world();

    let state = Arc::new(RwLock::new(game));
    let scheduler = sim::TickScheduler::new(tick_interval);
    let game_loop = tokio::spawn(sim::run_game_loop(state.clone(), scheduler));

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    state.write().await.running = false;
    game_loop.abort();

    Ok(())
}
