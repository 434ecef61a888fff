// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Demo HTTP server
//!
//! A small axum application that exercises the session store end to end:
//! sign-in, per-session browsing history, sign-out and identifier rotation.
//!
//! # Endpoints
//!
//! - `GET /` - Login form, or a greeting once signed in, plus browsing history
//! - `POST /auth` - Sign in (`login`, `password` form fields)
//! - `GET /logout` - Destroy the session and its cookie
//! - `GET /firstpage` - Show the stored username and password digest
//! - `GET /secondpage` - Show the session identifier
//! - `GET /secure` - Same session, but bound with `start_secure`
//! - `GET /health` - Health check with session counts
//!
//! # Example
//!
//! ```no_run
//! use quicksession::server::Server;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let server = Server::new(8080);
//! server.start().await?;
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use axum::{
    extract::State,
    http::HeaderMap,
    response::{Html, Json, Redirect},
    routing::{get, post},
    Form, Router,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;

use crate::http::CookieWriter;
use crate::id::SessionId;
use crate::registry::SessionRegistry;

/// Session field holding the signed-in user's name.
pub const USERNAME_FIELD: &str = "username";
/// Session field holding the SHA-256 digest of the password.
pub const HASH_FIELD: &str = "hash";
/// Session field holding the list of visited paths.
pub const HISTORY_FIELD: &str = "transitions";

// Keep the history bounded per session
const MAX_HISTORY: usize = 50;
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Server state shared across handlers.
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
}

/// Demo server configuration.
#[derive(Debug)]
pub struct Server {
    /// Port to listen on.
    port: u16,
    /// Address to bind to (defaults to 127.0.0.1).
    bind_address: String,
    /// Registry backing every handler.
    registry: Arc<SessionRegistry>,
}

impl Default for Server {
    fn default() -> Self {
        Self::new(8080)
    }
}

impl Server {
    /// Create a server on `port` with a fresh registry, bound to localhost.
    pub fn new(port: u16) -> Self {
        Self {
            port,
            bind_address: "127.0.0.1".to_string(),
            registry: Arc::new(SessionRegistry::new()),
        }
    }

    /// Set the bind address.
    /// Use "0.0.0.0" to allow network access, "127.0.0.1" (default) for localhost only.
    pub fn with_bind_address(mut self, addr: impl Into<String>) -> Self {
        self.bind_address = addr.into();
        self
    }

    /// Serve sessions from an existing registry.
    pub fn with_registry(mut self, registry: Arc<SessionRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Build the router with all routes.
    pub fn build_router(&self) -> Router {
        let state = Arc::new(AppState {
            registry: Arc::clone(&self.registry),
        });

        Router::new()
            .route("/", get(home_handler))
            .route("/auth", post(auth_handler))
            .route("/logout", get(logout_handler))
            .route("/firstpage", get(first_page_handler))
            .route("/secondpage", get(second_page_handler))
            .route("/secure", get(secure_handler))
            .route("/health", get(health_handler))
            .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
            .with_state(state)
    }

    /// Run the sweeper and serve until SIGINT/SIGTERM.
    pub async fn start(&self) -> Result<()> {
        let router = self.build_router();
        let addr = format!("{}:{}", self.bind_address, self.port);

        if self.bind_address == "0.0.0.0" {
            tracing::warn!(
                "Server is binding to 0.0.0.0 which exposes the demo to the network. \
                Use 127.0.0.1 (default) for local-only access."
            );
        }

        let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                anyhow::anyhow!(
                    "Port {} is already in use. Stop the other process or use --port <PORT>",
                    self.port
                )
            } else {
                anyhow::anyhow!("Failed to bind to {}: {}", addr, e)
            }
        })?;

        let sweeper = self.registry.spawn_sweeper();
        tracing::info!("Listening on http://{}", addr);

        let served = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        sweeper.stop().await;
        served?;
        tracing::info!("Server stopped");
        Ok(())
    }

    /// Get the port.
    pub fn port(&self) -> u16 {
        self.port
    }
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// Sign-in form.
#[derive(Deserialize)]
struct AuthForm {
    #[serde(default)]
    login: String,
    #[serde(default)]
    password: String,
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    sessions: usize,
    expired_pending_sweep: usize,
}

// =============================================================================
// Handlers
// =============================================================================

async fn home_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> (CookieWriter, Html<String>) {
    let mut cookies = CookieWriter::new();
    let registry = &state.registry;
    let id = registry.start(&headers, &mut cookies);
    let history = record_visit(registry, &id, "/");

    let content = match registry.get_field(&id, USERNAME_FIELD) {
        Some(username) => format!(
            "<p>You are authorized!<br>Your name is {}.</p>\
             <p><a href=\"/logout\">Logout?</a></p>\
             <p><a href=\"/firstpage\">First Page</a></p>\
             <p><a href=\"/secondpage\">Second Page</a></p>",
            escape_html(&username.to_string())
        ),
        None => LOGIN_FORM.to_string(),
    };

    (cookies, page(&format!("{}{}", content, history_list(&history))))
}

async fn auth_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<AuthForm>,
) -> (CookieWriter, Redirect) {
    let mut cookies = CookieWriter::new();
    let registry = &state.registry;
    let mut id = registry.start(&headers, &mut cookies);

    if is_valid_login(&form.login) && !form.password.is_empty() {
        // A new identity gets a new identifier; history carries over
        if let Some(rotated) = registry.rotate(&id, &mut cookies) {
            id = rotated;
        }
        registry.set_field(&id, HASH_FIELD, password_digest(&form.password));
        registry.set_field(&id, USERNAME_FIELD, form.login);
        tracing::info!(session = %id.masked(), "User signed in");
    } else {
        tracing::debug!(session = %id.masked(), "Rejected sign-in form");
    }

    record_visit(registry, &id, "/auth");
    (cookies, Redirect::to("/"))
}

async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> (CookieWriter, Redirect) {
    let mut cookies = CookieWriter::new();
    let id = state.registry.start(&headers, &mut cookies);
    state.registry.session(&id).destroy(&mut cookies);
    tracing::info!(session = %id.masked(), "User signed out");
    (cookies, Redirect::to("/"))
}

async fn first_page_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> (CookieWriter, Html<String>) {
    let mut cookies = CookieWriter::new();
    let id = state.registry.start(&headers, &mut cookies);
    record_visit(&state.registry, &id, "/firstpage");

    let fields = state.registry.get_all_fields(&id);
    let show = |name: &str| {
        fields
            .get(name)
            .map(|v| escape_html(&v.to_string()))
            .unwrap_or_default()
    };

    let content = format!(
        "<p>Your name is {}.<br>Hash password is {}</p><p><a href=\"/\">Home Page</a></p>",
        show(USERNAME_FIELD),
        show(HASH_FIELD)
    );
    (cookies, page(&content))
}

async fn second_page_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> (CookieWriter, Html<String>) {
    let mut cookies = CookieWriter::new();
    let id = state.registry.start(&headers, &mut cookies);
    record_visit(&state.registry, &id, "/secondpage");

    let content = format!(
        "<p>Your session ID is: {}.</p><p><a href=\"/\">Home Page</a></p>",
        escape_html(id.as_str())
    );
    (cookies, page(&content))
}

async fn secure_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> (CookieWriter, Html<String>) {
    let mut cookies = CookieWriter::new();
    let id = state.registry.start_secure(&headers, &mut cookies);
    let history = record_visit(&state.registry, &id, "/secure");

    let content = format!(
        "<p>Your session ID is: {}.<br>It changes on every visit to this page.</p>{}",
        escape_html(id.as_str()),
        history_list(&history)
    );
    (cookies, page(&content))
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let stats = state.registry.stats();
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        sessions: stats.total,
        expired_pending_sweep: stats.expired,
    })
}

// =============================================================================
// Helpers
// =============================================================================

const LOGIN_FORM: &str = "<p><form action=\"/auth\" method=\"post\">\
    <input name=\"login\" type=\"text\" placeholder=\"Login\" required \
    pattern=\"^[a-zA-Z0-9_-]+$\">\
    <input name=\"password\" type=\"password\" placeholder=\"Password\" required>\
    <button name=\"signin\" type=\"submit\">Sign in</button>\
    </form></p>\
    <p>Enter any username and password.</p>";

fn page(content: &str) -> Html<String> {
    Html(format!(
        "<html><head><title>quicksession</title></head><body>{}</body></html>",
        content
    ))
}

fn history_list(history: &[String]) -> String {
    let items: String = history
        .iter()
        .map(|p| format!("{}<br>", escape_html(p)))
        .collect();
    format!("<p>Website browsing history:<br>{}</p>", items)
}

/// Append `path` to the session's browsing history and return the history.
///
/// Read and write-back are separate registry calls, so concurrent requests on
/// one session can drop each other's entries. Fine for a demo history.
fn record_visit(registry: &SessionRegistry, id: &SessionId, path: &str) -> Vec<String> {
    let mut history: Vec<String> = registry
        .get_field(id, HISTORY_FIELD)
        .and_then(|value| value.as_json().cloned())
        .and_then(|json| serde_json::from_value(json).ok())
        .unwrap_or_default();

    history.push(path.to_string());
    if history.len() > MAX_HISTORY {
        let excess = history.len() - MAX_HISTORY;
        history.drain(..excess);
    }

    registry.set_field(id, HISTORY_FIELD, serde_json::json!(history));
    history
}

// Usernames are echoed into HTML, so only a safe alphabet is accepted
fn is_valid_login(login: &str) -> bool {
    !login.is_empty()
        && login.len() <= 64
        && login
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Encode the characters that are significant in HTML text and attributes.
///
/// Session identifiers come straight from the client's cookie, so anything
/// derived from the request is escaped before it reaches a page.
fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn password_digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {
                        tracing::info!("Received SIGTERM, initiating graceful shutdown...");
                    }
                    _ = sigint.recv() => {
                        tracing::info!("Received SIGINT (Ctrl+C), initiating graceful shutdown...");
                    }
                }
            }
            _ => {
                tracing::warn!("Could not install Unix signal handlers, falling back to Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Could not listen for Ctrl+C: {}", e);
        }
        tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
    }
}
