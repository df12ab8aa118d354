//! HTTP front door that shells out to this binary.
//!
//! Each request runs one `omadactl` invocation as a child process and relays
//! its output, so a controller session never outlives the request that
//! opened it.

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    routing::post,
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct BridgeState {
    program: PathBuf,
    /// Arguments placed before the subcommand, e.g. `--host` overrides.
    base_args: Arc<Vec<String>>,
    timeout: Duration,
}

impl BridgeState {
    pub fn new(program: PathBuf, base_args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program,
            base_args: Arc::new(base_args),
            timeout,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SsidRequest {
    ssid: Option<String>,
}

type Reply = (StatusCode, Json<Value>);

pub fn router(state: BridgeState) -> Router {
    Router::new()
        .route("/wifi/:action", post(wifi))
        .route("/ssid/:action", post(ssid))
        .with_state(state)
}

pub async fn serve(bind: SocketAddr, state: BridgeState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    info!(%bind, "HTTP bridge listening");
    axum::serve(listener, router(state))
        .await
        .context("serving HTTP bridge")
}

async fn wifi(State(state): State<BridgeState>, Path(action): Path<String>) -> Reply {
    if !matches!(action.as_str(), "enable" | "disable") {
        return invalid_action(&action);
    }
    run(&state, vec!["wifi".to_string(), action]).await
}

async fn ssid(
    State(state): State<BridgeState>,
    Path(action): Path<String>,
    body: Result<Json<SsidRequest>, JsonRejection>,
) -> Reply {
    if !matches!(action.as_str(), "enable" | "disable" | "list") {
        return invalid_action(&action);
    }
    // Only a request that is not JSON at all falls back to the default SSID.
    let request = match body {
        Ok(Json(request)) => request,
        Err(JsonRejection::MissingJsonContentType(_)) => SsidRequest::default(),
        Err(rejection) => {
            warn!(%action, reason = %rejection.body_text(), "rejecting unreadable JSON body");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": rejection.body_text()})),
            );
        }
    };
    let mut args = vec!["ssid".to_string(), action];
    if let Some(name) = request.ssid {
        args.push("--ssid".to_string());
        args.push(name);
    }
    run(&state, args).await
}

fn invalid_action(action: &str) -> Reply {
    warn!(action, "rejecting unknown action");
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"error": "Invalid action"})),
    )
}

async fn run(state: &BridgeState, args: Vec<String>) -> Reply {
    let mut cmd = Command::new(&state.program);
    cmd.args(state.base_args.iter()).args(&args).kill_on_drop(true);
    info!(?args, "running command");

    match tokio::time::timeout(state.timeout, cmd.output()).await {
        Ok(Ok(output)) => {
            let status = if output.status.success() {
                StatusCode::OK
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (
                status,
                Json(json!({
                    "stdout": String::from_utf8_lossy(&output.stdout),
                    "stderr": String::from_utf8_lossy(&output.stderr),
                    "returncode": output.status.code().unwrap_or(-1),
                })),
            )
        }
        Ok(Err(err)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": err.to_string()})),
        ),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": format!("command timed out after {}s", state.timeout.as_secs())
            })),
        ),
    }
}
