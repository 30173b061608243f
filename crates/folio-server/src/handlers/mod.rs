//! HTTP route handlers for the folio server.

pub mod auth;
pub mod chat;

/// Health check endpoint.
pub async fn health() -> &'static str {
    "OK"
}
