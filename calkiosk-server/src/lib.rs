//! Calendar kiosk server: Google OAuth login, background sync into SQLite,
//! and the JSON API the dashboard polls.

pub mod config;
pub mod grid;
pub mod logging;
pub mod routes;
pub mod scheduler;
pub mod session;
pub mod singleton;
pub mod state;
pub mod sync;

use anyhow::{Context, Result};
use axum::Router;
use axum::http::{HeaderValue, Method, header};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// The full HTTP application.
pub fn app(state: AppState) -> Result<Router> {
    let mut app = Router::new()
        .merge(routes::auth::router())
        .merge(routes::calendar::router())
        .merge(routes::health::router())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session::session_layer,
        ))
        .layer(TraceLayer::new_for_http());

    if let Some(origin) = &state.config.cors_origin {
        let origin: HeaderValue = origin
            .parse()
            .with_context(|| format!("Invalid CORS_ORIGIN '{origin}'"))?;
        let cors = CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
            .allow_credentials(true);
        app = app.layer(cors);
    }

    Ok(app.with_state(state))
}
