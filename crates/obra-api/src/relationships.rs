//! Handlers for `/relationships` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/relationships` | Body: [`NewRelationshipBody`]; returns 201 |
//! | `DELETE` | `/relationships/{id}` | 204 whether or not the link existed |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use obra_core::{
  Services,
  activity::ActivityKind,
  record::RecordRef,
  relationship::{NewRelationship, Relationship},
  store::AuditStore,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{activity::log_best_effort, actor::CurrentUser, error::ApiError};

/// A relink counts as an update of the source record.
async fn log_relink<S: AuditStore>(
  services: &Services<S>,
  user: &CurrentUser,
  relationship: &Relationship,
  verb: &str,
) {
  log_best_effort(
    services,
    user,
    ActivityKind::updated(relationship.source.record_type),
    format!("Relação {} {} e {}", verb, relationship.source, relationship.target),
    json!({
      "relationship_id": relationship.relationship_id,
      "source": relationship.source,
      "target": relationship.target,
    }),
  )
  .await;
}

#[derive(Debug, Deserialize)]
pub struct NewRelationshipBody {
  pub source:     RecordRef,
  pub target:     RecordRef,
  /// Falls back to the `x-project-id` header.
  pub project_id: Option<String>,
}

/// `POST /relationships`
pub async fn create<S>(
  State(services): State<Services<S>>,
  user: CurrentUser,
  Json(body): Json<NewRelationshipBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AuditStore + 'static,
{
  let project_id = body
    .project_id
    .or_else(|| user.project().map(|p| p.id.clone()))
    .ok_or_else(|| ApiError::BadRequest("project_id is required".into()))?;

  let relationship = services
    .graph
    .add_relationship(
      user.actor(),
      NewRelationship { source: body.source, target: body.target, project_id },
    )
    .await?;
  log_relink(&services, &user, &relationship, "criada entre").await;
  Ok((StatusCode::CREATED, Json(relationship)))
}

/// `DELETE /relationships/{id}`
pub async fn delete<S>(
  State(services): State<Services<S>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: AuditStore + 'static,
{
  if let Some(removed) = services.graph.remove_relationship(user.actor(), id).await? {
    log_relink(&services, &user, &removed, "removida entre").await;
  }
  Ok(StatusCode::NO_CONTENT)
}
