use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use connect::config::{self, Config};
use connect::store::{KeyValueStore, MemoryStore, PgStore, RedisStore};
use connect::{api, jobs, AppState};

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use opentelemetry::KeyValue;
    use opentelemetry_sdk::{trace as sdktrace, Resource};

    // OTLP export only when a collector endpoint is configured.
    let telemetry_layer = if std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() {
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(opentelemetry_otlp::new_exporter().tonic())
            .with_trace_config(sdktrace::config().with_resource(Resource::new(vec![
                KeyValue::new("service.name", "publink-connect"),
            ])))
            .install_batch(opentelemetry_sdk::runtime::Tokio)?;
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "connect=debug,publink=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .with(telemetry_layer)
        .init();

    let cfg = config::load()?;
    let args = cli::Cli::parse();

    let result = match args.command {
        Some(cli::Commands::Serve { port, memory }) => {
            let port = port.unwrap_or(cfg.port);
            run_server(cfg, port, memory).await
        }
        Some(cli::Commands::Status) => {
            let backends = Backends::connect(&cfg, false).await?;
            let state = backends.into_state(cfg)?;
            print_status(&state).await
        }
        Some(cli::Commands::Connections { command }) => {
            let backends = Backends::connect(&cfg, false).await?;
            let state = backends.into_state(cfg)?;
            handle_connection_command(command, &state).await
        }
        None => {
            let port = cfg.port;
            run_server(cfg, port, false).await
        }
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

/// Storage wiring: Postgres for connections, Redis (when configured) or
/// Postgres for state tokens, or one in-memory store for both.
struct Backends {
    connections: Arc<dyn KeyValueStore>,
    states: Arc<dyn KeyValueStore>,
    db: Option<PgStore>,
}

impl Backends {
    async fn connect(cfg: &Config, memory: bool) -> anyhow::Result<Self> {
        if memory {
            tracing::warn!("using in-memory storage; connections are lost on restart");
            let mem = Arc::new(MemoryStore::new());
            return Ok(Self {
                connections: mem.clone(),
                states: mem,
                db: None,
            });
        }

        tracing::info!("Connecting to database...");
        let db = PgStore::connect(&cfg.database_url).await?;

        tracing::info!("Running migrations...");
        db.migrate().await?;

        let states: Arc<dyn KeyValueStore> = match &cfg.redis_url {
            Some(url) => {
                tracing::info!("Connecting to Redis for state tokens...");
                Arc::new(RedisStore::connect(url).await?)
            }
            None => Arc::new(db.clone()),
        };

        Ok(Self {
            connections: Arc::new(db.clone()),
            states,
            db: Some(db),
        })
    }

    fn into_state(self, cfg: Config) -> anyhow::Result<AppState> {
        AppState::new(cfg, self.connections, self.states)
    }
}

async fn run_server(cfg: Config, port: u16, memory: bool) -> anyhow::Result<()> {
    let backends = Backends::connect(&cfg, memory).await?;
    let db = backends.db.clone();
    let state = Arc::new(backends.into_state(cfg)?);

    let app = api::app(state.clone());

    if let Some(db) = db {
        jobs::cleanup::spawn(db);
        tracing::info!("Background cleanup job started (stale state tokens every 1h)");
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Publink connect listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn print_status(state: &AppState) -> anyhow::Result<()> {
    let report = state.service.check_connections().await?;
    println!("{:<22} {:<18} MESSAGE", "PLATFORM", "STATUS");
    for (key, status) in report {
        let label = serde_json::to_value(status.status)?;
        println!(
            "{:<22} {:<18} {}",
            key.as_str(),
            label.as_str().unwrap_or_default(),
            status.message
        );
    }
    Ok(())
}

async fn handle_connection_command(
    cmd: cli::ConnectionCommands,
    state: &AppState,
) -> anyhow::Result<()> {
    match cmd {
        cli::ConnectionCommands::List => {
            let connections = state.service.list_connections().await?;
            if connections.is_empty() {
                println!("No connections stored.");
                return Ok(());
            }
            println!(
                "{:<22} {:<30} {:<8} {:<12} CONNECTED",
                "KEY", "ACCOUNT", "REFRESH", "EXPIRES"
            );
            for c in connections {
                println!(
                    "{:<22} {:<30} {:<8} {:<12} {}",
                    c.key.as_str(),
                    c.account,
                    c.has_refresh_token,
                    c.expires_at
                        .map(|t| t.format("%Y-%m-%d").to_string())
                        .unwrap_or_else(|| "never".into()),
                    c.connected_at.format("%Y-%m-%d")
                );
            }
        }
        cli::ConnectionCommands::Disconnect { platform } => {
            let cleared = state.service.disconnect(Some(&platform)).await?;
            for key in cleared {
                println!("Removed {}", key);
            }
        }
        cli::ConnectionCommands::Refresh => {
            let renewed = state.service.refresh_channel().await?;
            match renewed.expires_at {
                Some(at) => println!("Channel token refreshed; expires {}", at.to_rfc3339()),
                None => println!("Channel token refreshed."),
            }
        }
    }
    Ok(())
}
