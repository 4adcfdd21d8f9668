//! JSON REST API for Obra.
//!
//! Exposes an axum [`Router`] backed by any [`obra_core::store::AuditStore`].
//! Authentication, TLS and transport concerns are the caller's
//! responsibility; the acting user arrives in headers (see [`actor`]).
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", obra_api::api_router(Services::new(store.clone())))
//! ```

pub mod activity;
pub mod actor;
pub mod codes;
pub mod error;
pub mod records;
pub mod relationships;

use axum::{
  Router,
  routing::{delete, get, post},
};
use obra_core::{Services, record::RecordType, store::AuditStore};

pub use error::ApiError;

/// Build a fully-materialised API router for `services`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(services: Services<S>) -> Router<()>
where
  S: AuditStore + 'static,
{
  Router::new()
    // Codes
    .route("/codes/{type}", post(codes::generate::<S>))
    // Records
    .route("/records/{type}", post(records::submit::<S>))
    .route("/records/{type}/{id}", get(records::get_one::<S>))
    .route(
      "/records/{type}/{id}/history",
      get(records::history::<S>).post(records::add_history::<S>),
    )
    .route(
      "/records/{type}/{id}/comments",
      get(records::comments::<S>).post(records::add_comment::<S>),
    )
    .route("/records/{type}/{id}/timeline", get(records::timeline::<S>))
    .route("/records/{type}/{id}/related", get(records::related::<S>))
    .route("/records/{type}/{id}/relationships", get(records::relationships::<S>))
    // Relationships
    .route("/relationships", post(relationships::create::<S>))
    .route("/relationships/{id}", delete(relationships::delete::<S>))
    // Activity
    .route("/activity", get(activity::list::<S>).post(activity::record::<S>))
    .with_state(services)
}

/// Path segments carry the wire name of a record type.
pub(crate) fn parse_record_type(s: &str) -> Result<RecordType, ApiError> {
  Ok(s.parse::<RecordType>()?)
}

#[cfg(test)]
mod tests;
