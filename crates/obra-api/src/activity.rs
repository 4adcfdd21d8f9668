//! Handlers for `/activity`.
//!
//! `GET` query params map directly to [`ActivityQuery`] fields. `POST` lets
//! clients record events the core never sees itself (logins, views).

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use obra_core::{
  Services,
  activity::{ActivityEntry, ActivityKind, ActivityQuery},
  store::AuditStore,
};
use serde::Deserialize;
use serde_json::Value;

use crate::{actor::CurrentUser, error::ApiError};

/// Record activity for a write that has already committed. A failure is
/// traced and otherwise ignored.
pub(crate) async fn log_best_effort<S: AuditStore>(
  services: &Services<S>,
  user: &CurrentUser,
  kind: ActivityKind,
  description: String,
  details: Value,
) {
  let result = services
    .activity
    .record(user.actor(), user.project(), kind, description, Some(details))
    .await;
  if let Err(e) = result {
    tracing::warn!(kind = kind.as_str(), error = %e, "failed to log activity");
  }
}

/// `GET /activity[?user_id=...][&project_id=...][&kind=...][&start=...][&end=...][&search=...][&limit=...]`
pub async fn list<S>(
  State(services): State<Services<S>>,
  Query(query): Query<ActivityQuery>,
) -> Result<Json<Vec<ActivityEntry>>, ApiError>
where
  S: AuditStore + 'static,
{
  Ok(Json(services.activity.query(&query).await?))
}

#[derive(Debug, Deserialize)]
pub struct ActivityBody {
  pub kind:        ActivityKind,
  pub description: String,
  pub details:     Option<Value>,
}

/// `POST /activity`: returns 201 + the stored entry.
pub async fn record<S>(
  State(services): State<Services<S>>,
  user: CurrentUser,
  Json(body): Json<ActivityBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AuditStore + 'static,
{
  let entry = services
    .activity
    .record(user.actor(), user.project(), body.kind, body.description, body.details)
    .await?;
  Ok((StatusCode::CREATED, Json(entry)))
}
