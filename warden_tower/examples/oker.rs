//! A server that answers `200 OK` to every authenticated request
//!
//! ```sh
//! RUST_LOG=info,warden=debug cargo run -p warden_tower --example oker -- oker.json
//! ```
//!
//! where `oker.json` looks like:
//!
//! ```json
//! {
//!   "listen": "127.0.0.1:8080",
//!   "path": "/api/ok",
//!   "auth": {
//!     "jwt": {
//!       "key_provider": {
//!         "url": "https://auth.example.com/.well-known/jwks.json",
//!         "refresh_interval": "15m"
//!       },
//!       "required_capabilities": ["ok:read"]
//!     }
//!   }
//! }
//! ```
//!
//! Without a config file, basic auth with user `oker` and password `oker` is
//! used.

use std::{net::SocketAddr, path::PathBuf};

use axum::{body::Body, routing::get, Extension, Router};
use color_eyre::{eyre::WrapErr, Result};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;
use warden::{Auth, Config, Principal};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OkerConfig {
    #[serde(default = "default_listen")]
    listen: SocketAddr,
    #[serde(default = "default_path")]
    path: String,
    auth: Config,
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_path() -> String {
    "/api/ok".to_owned()
}

impl Default for OkerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            path: default_path(),
            auth: Config::basic([("oker", "oker")]),
        }
    }
}

fn load_config() -> Result<OkerConfig> {
    let Some(path) = std::env::args_os().nth(1).map(PathBuf::from) else {
        return Ok(OkerConfig::default());
    };

    let raw = std::fs::read(&path)
        .wrap_err_with(|| format!("unable to read config file {}", path.display()))?;
    serde_json::from_slice(&raw)
        .wrap_err_with(|| format!("invalid config file {}", path.display()))
}

async fn ok(principal: Option<Extension<Principal>>) {
    match principal {
        Some(Extension(principal)) => tracing::info!(
            principal = principal.name(),
            scheme = %principal.scheme(),
            "ok"
        ),
        None => tracing::info!("ok"),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        let error: &dyn std::error::Error = &err;
        tracing::error!(error, "unable to listen for shutdown signal");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = load_config()?;
    let auth = Auth::new(config.auth).wrap_err("invalid auth configuration")?;

    if !auth.is_protected() {
        tracing::warn!("authentication is disabled; every request will be admitted");
    }

    let refresh = auth.spawn_refresh();

    let app = Router::new()
        .route(&config.path, get(ok))
        .layer(warden_tower::layer::<Body>(auth));

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .wrap_err_with(|| format!("unable to bind {}", config.listen))?;
    tracing::info!(addr = %config.listen, path = %config.path, "listening; press Ctrl+C to exit");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(refresh) = refresh {
        refresh.shutdown().await;
    }

    tracing::info!("shut down");
    Ok(())
}
