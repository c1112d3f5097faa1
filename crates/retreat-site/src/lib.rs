//! # retreat-site
//!
//! HTTP service behind the retreat-house website.
//!
//! - `GET /api/events`: expanded calendar occurrences (`range=upcoming|past|all`)
//! - `GET /api/events/{slug}`: one event with its display dates
//! - `POST /api/donations`: donation intent, gated by human verification
//! - `POST /api/contact`: contact form, gated by human verification
//! - `POST /api/revalidate`: content cache invalidation, shared-secret header
//!
//! The content backend, payment processor, mail transport and verification
//! challenge are trait objects in [`state::Collaborators`], built from
//! [`config::Settings`] in production and replaced by fakes in tests.

pub mod cache;
pub mod config;
pub mod content;
pub mod error;
pub mod mail;
pub mod payments;
pub mod routes;
pub mod state;
pub mod verification;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::Settings;
pub use error::ApiError;
pub use state::{AppState, Collaborators, SitePolicy};

/// The full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    routes::router()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
