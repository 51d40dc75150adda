// Framework bootstrap for the tank server runtime.

use crate::domain::state::MapBounds;
use crate::domain::tuning::GameTuning;
use crate::frameworks::config;
use crate::interface_adapters::audio::TracingAudio;
use crate::interface_adapters::clock::SystemClock;
use crate::interface_adapters::net::{
    arena_ws_handler, chapter_ws_handler, create_arena_handler, delete_arena_handler,
    spawn_arena_serializer,
};
use crate::interface_adapters::state::{AppState, ChapterSettings};
use crate::use_cases::{ArenaRegistry, ArenaSettings};

use axum::{
    Router,
    routing::{delete, get, post},
};
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    // build state
    let state = build_state().await?;
    // Start the Web Server
    let app = Router::new()
        .route("/ws", get(arena_ws_handler))
        .route("/chapter", get(chapter_ws_handler))
        .route("/arenas", post(create_arena_handler))
        .route("/arenas/{arena_id}", delete(delete_arena_handler))
        .with_state(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

async fn build_state() -> Result<Arc<AppState>> {
    let (width, height) = config::arena_size();
    let bounds = MapBounds::new(width, height);
    let tick_interval = config::tick_interval();
    let tuning = GameTuning::default();
    let clock = Arc::new(SystemClock);

    tracing::debug!(
        width,
        height,
        tick_ms = tick_interval.as_millis(),
        "runtime configured"
    );

    // This owns the set of active arena world tasks.
    let arena_registry = Arc::new(ArenaRegistry::new(
        ArenaSettings {
            input_channel_capacity: config::INPUT_CHANNEL_CAPACITY,
            world_broadcast_capacity: config::WORLD_BROADCAST_CAPACITY,
            tick_interval,
            bounds,
            tuning,
        },
        clock.clone(),
    ));

    // The default arena is always present so `/ws` works without setup.
    let default_arena = arena_registry
        .create_arena(config::DEFAULT_ARENA_ID.to_string())
        .await
        .map_err(|e| std::io::Error::other(format!("failed to create default arena: {e}")))?;
    spawn_arena_serializer(&default_arena);

    Ok(Arc::new(AppState {
        arena_registry,
        default_arena_id: Arc::from(config::DEFAULT_ARENA_ID),
        chapter: ChapterSettings {
            command_channel_capacity: config::COMMAND_CHANNEL_CAPACITY,
            world_broadcast_capacity: config::WORLD_BROADCAST_CAPACITY,
            tick_interval,
            bounds,
            tuning,
        },
        clock,
        audio: Arc::new(TracingAudio),
    }))
}
