//! HID Relay Server
//!
//! Backend for sharing an emergency ID profile through a public link / QR code:
//!
//! 1. **Mint**: an authenticated owner gets an opaque public key (`HID-…`),
//!    a signed access token valid for 3 hours, and a share link embedding both.
//!
//! 2. **Fetch**: anyone holding the link can read a sanitized subset of the
//!    owner's profile (name, blood group, allergies, emergency contacts,
//!    address, medical notes) until the token expires.
//!
//! 3. **Profile upload**: owners store the raw profile document the public
//!    view is derived from.
//!
//! **Privacy**: the public view is rebuilt from the raw document on every
//! fetch through an allow-list; nothing else ever leaves the server, and every
//! response is marked uncacheable.

mod error;
mod identity;
mod share;
mod state;
mod store;

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use clap::Parser;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use share::api;
use state::{AppState, ShareConfig};
use store::ShareStore;

// ── CLI Arguments ─────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "hid-relay", version, about = "Emergency ID profile share server")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = 8080, env = "HID_PORT")]
    port: u16,

    /// Origin used in share links (e.g. "https://hid.example")
    #[arg(long, default_value = "http://localhost:8080", env = "HID_PUBLIC_ORIGIN")]
    public_origin: String,

    /// HMAC secret for share tokens (at least 32 bytes)
    #[arg(long, env = "HID_TOKEN_SECRET", hide_env_values = true)]
    token_secret: String,

    /// Identity assertion verification key: RSA public key PEM or HMAC secret
    #[arg(long, env = "HID_IDENTITY_KEY", hide_env_values = true)]
    identity_key: String,

    /// Expected `iss` of identity assertions
    #[arg(long, env = "HID_IDENTITY_ISSUER")]
    identity_issuer: Option<String>,

    /// Expected `aud` of identity assertions
    #[arg(long, env = "HID_IDENTITY_AUDIENCE")]
    identity_audience: Option<String>,

    /// Directory for persisting key mappings and profiles.
    /// Runs in-memory only when unset.
    #[arg(long, env = "HID_DATA_DIR")]
    data_dir: Option<String>,
}

// ── Entry Point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hid_relay=info,tower_http=info".into()),
        )
        .init();

    let args = Args::parse();

    let config = ShareConfig {
        port: args.port,
        public_origin: args.public_origin,
        token_secret: args.token_secret,
        identity_key: args.identity_key,
        identity_issuer: args.identity_issuer,
        identity_audience: args.identity_audience,
        data_dir: args.data_dir,
    };

    let store = ShareStore::new(config.data_dir.as_deref());
    store.load_from_disk();

    let store = Arc::new(store);
    let state = match AppState::new(&config, store.clone()) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration, refusing to start");
            std::process::exit(1);
        }
    };

    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(
        public_origin = config.public_origin.as_str(),
        persistent = config.data_dir.is_some(),
        mappings = store.mapping_count(),
        profiles = store.profile_count(),
        "HID relay server starting on {}",
        addr
    );

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, addr = addr.as_str(), "Failed to bind address");
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Assemble routes and layers. Every response, including errors and 405s,
/// carries the no-cache and defensive headers.
fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    Router::new()
        .route("/mint", post(api::mint))
        .route("/profile", get(api::fetch_profile))
        .route("/me/profile", put(api::put_own_profile))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::PRAGMA,
            HeaderValue::from_static("no-cache"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ── Route Handlers ────────────────────────────────────────────────────────────

/// Health check endpoint.
async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "hid-relay",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
