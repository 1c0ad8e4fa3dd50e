//! kiln demo server.
//!
//! Serves a small application exercising routes with roles, async results,
//! error overrides and a WebSocket echo endpoint.
//!
//! ```text
//! kiln --config kiln.toml --bind 127.0.0.1:8080
//! curl -H 'x-role: admin' localhost:8080/api/admin/stats
//! ```

use std::path::PathBuf;
use std::time::Duration;

use axum::http::StatusCode;
use clap::Parser;
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpListener;

use kiln::config::{load_config, ServerConfig};
use kiln::observability::{init_logging, init_metrics};
use kiln::{App, Context, ErrorKind, HandlerError, ResponseError, RoleAccessManager, Shutdown};

#[derive(Parser)]
#[command(name = "kiln")]
#[command(about = "Demo server for the kiln HTTP toolkit", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Role {
    Reader,
    Admin,
}

#[derive(Debug, Error)]
#[error("inventory backend unavailable")]
struct InventoryError;

#[derive(Serialize)]
struct Stats {
    requests: u64,
    uptime_secs: u64,
}

fn roles_from_header(ctx: &Context) -> Vec<Role> {
    match ctx.header("x-role") {
        Some("admin") => vec![Role::Admin, Role::Reader],
        Some("reader") => vec![Role::Reader],
        _ => Vec::new(),
    }
}

fn build_app(config: ServerConfig) -> App<Role> {
    let mut app = App::with_roles(config);

    app.access_manager(RoleAccessManager::new(roles_from_header));

    app.before_all(|ctx| {
        tracing::debug!(path = %ctx.path(), "Incoming request");
        Ok(())
    });

    app.routes(|api| {
        api.get("/", |ctx| {
            ctx.result("kiln is running");
            Ok(())
        });

        api.path("/api", |api| {
            api.get("/hello/:name", |ctx| {
                let name = ctx.path_param("name").unwrap_or("stranger").to_string();
                ctx.result(format!("Hello, {name}!"));
                Ok(())
            });

            api.get_with_roles(
                "/admin/stats",
                |ctx| {
                    ctx.json_future(async {
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        Ok::<_, HandlerError>(Stats {
                            requests: 42,
                            uptime_secs: 3600,
                        })
                    });
                    Ok(())
                },
                [Role::Admin],
            );

            api.get_with_roles(
                "/inventory",
                |ctx| {
                    ctx.future(async { Err::<String, _>(HandlerError::unexpected(InventoryError)) });
                    Ok(())
                },
                [Role::Reader],
            );

            api.post("/echo", |ctx| {
                let body = ctx.body_str()?.to_string();
                if body.is_empty() {
                    return Err(ResponseError::bad_request()
                        .with_title("Nothing to echo")
                        .into());
                }
                ctx.result(body);
                Ok(())
            });
        });
    });

    app.unexpected::<InventoryError, _>(|err, ctx| {
        ctx.set_status(StatusCode::SERVICE_UNAVAILABLE)
            .result(format!("Try again later: {err}"));
    });

    app.exception(ErrorKind::Forbidden, |err, ctx| {
        ctx.set_status(StatusCode::NOT_FOUND).result(err.title().to_string());
    });

    app.error(StatusCode::NOT_FOUND, "html", |ctx| {
        ctx.html("<h1>Nothing here</h1>");
    });

    app.ws("/ws/echo/:room", |ws| {
        ws.on_connect(|session| {
            let room = session.path_param("room").unwrap_or("lobby").to_string();
            session.send(format!("joined {room}")).map_err(HandlerError::unexpected)
        })
        .on_message(|session, text| session.send(text).map_err(HandlerError::unexpected))
        .on_close(|session, code, reason| {
            tracing::info!(session_id = %session.id(), code, reason = ?reason, "Echo session closed");
            Ok(())
        });
    });

    app
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    init_logging(&config.observability)?;
    tracing::info!("kiln v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_concurrent_requests = config.listener.max_concurrent_requests,
        default_content_type = %config.http.default_content_type,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = build_app(config).into_server()?;

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    tokio::spawn(async move {
        kiln::lifecycle::shutdown_on_signal(&shutdown).await;
    });

    server.run(listener, receiver).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
