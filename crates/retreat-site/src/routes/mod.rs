pub mod calendar;
pub mod contact;
pub mod donations;
pub mod revalidate;

use axum::{routing::get, Router};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .merge(calendar::router())
        .merge(donations::router())
        .merge(contact::router())
        .merge(revalidate::router())
}

async fn healthz() -> &'static str {
    "ok"
}

/// Loose email shape check; the mail and payment services do the real validation.
pub(crate) fn looks_like_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}
