//! Handlers for `/records` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/records/{type}` | Body: any JSON object; returns 201 + [`Submission`] |
//! | `GET`  | `/records/{type}/{id}` | 404 if never submitted |
//! | `GET`  | `/records/{type}/{id}/history` | Newest first |
//! | `POST` | `/records/{type}/{id}/history` | Body: [`HistoryBody`] |
//! | `GET`  | `/records/{type}/{id}/comments` | Newest first |
//! | `POST` | `/records/{type}/{id}/comments` | Body: `{"content":"..."}` |
//! | `GET`  | `/records/{type}/{id}/timeline` | History and comments merged |
//! | `GET`  | `/records/{type}/{id}/related` | Other endpoints only |
//! | `GET`  | `/records/{type}/{id}/relationships` | Full relationship rows |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use obra_core::{
  Services,
  activity::ActivityKind,
  history::{Action, Change, Comment, HistoryEntry, TimelineEntry},
  record::RecordRef,
  relationship::Relationship,
  store::AuditStore,
  submission::Submission,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
  activity::log_best_effort, actor::CurrentUser, error::ApiError, parse_record_type,
};

fn record_ref(record_type: &str, id: String) -> Result<RecordRef, ApiError> {
  Ok(RecordRef::new(parse_record_type(record_type)?, id))
}

// ─── Submit ───────────────────────────────────────────────────────────────────

/// `POST /records/{type}`: returns 201 + the stored [`Submission`].
pub async fn submit<S>(
  State(services): State<Services<S>>,
  user: CurrentUser,
  Path(record_type): Path<String>,
  Json(data): Json<Value>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AuditStore + 'static,
{
  let record_type = parse_record_type(&record_type)?;
  let submission = services
    .submissions
    .submit_record(user.actor(), record_type, data)
    .await?;

  log_best_effort(
    &services,
    &user,
    ActivityKind::created(record_type),
    format!("Registo {} submetido", submission.code),
    json!({ "id": submission.item.id, "codigo": submission.code.to_string() }),
  )
  .await;
  Ok((StatusCode::CREATED, Json(submission)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /records/{type}/{id}`
pub async fn get_one<S>(
  State(services): State<Services<S>>,
  Path((record_type, id)): Path<(String, String)>,
) -> Result<Json<Submission>, ApiError>
where
  S: AuditStore + 'static,
{
  let item = record_ref(&record_type, id)?;
  let submission = services
    .submissions
    .get_submission(item.clone())
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("{item} was never submitted")))?;
  Ok(Json(submission))
}

// ─── History ──────────────────────────────────────────────────────────────────

/// `GET /records/{type}/{id}/history`
pub async fn history<S>(
  State(services): State<Services<S>>,
  Path((record_type, id)): Path<(String, String)>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError>
where
  S: AuditStore + 'static,
{
  let item = record_ref(&record_type, id)?;
  Ok(Json(services.ledger.get_history(item).await?))
}

#[derive(Debug, Deserialize)]
pub struct HistoryBody {
  pub action:  Action,
  #[serde(default)]
  pub changes: Vec<Change>,
}

/// `POST /records/{type}/{id}/history`: returns 201 + the new entry.
pub async fn add_history<S>(
  State(services): State<Services<S>>,
  user: CurrentUser,
  Path((record_type, id)): Path<(String, String)>,
  Json(body): Json<HistoryBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AuditStore + 'static,
{
  let item = record_ref(&record_type, id)?;
  let entry = services
    .ledger
    .add_history_item(user.actor(), item.clone(), body.action, body.changes)
    .await?;

  let kind = match entry.action {
    Action::Create => ActivityKind::created(item.record_type),
    _ => ActivityKind::updated(item.record_type),
  };
  log_best_effort(
    &services,
    &user,
    kind,
    format!("Histórico de {item} atualizado"),
    json!({ "id": item.id, "entry_id": entry.entry_id }),
  )
  .await;
  Ok((StatusCode::CREATED, Json(entry)))
}

// ─── Comments ─────────────────────────────────────────────────────────────────

/// `GET /records/{type}/{id}/comments`
pub async fn comments<S>(
  State(services): State<Services<S>>,
  Path((record_type, id)): Path<(String, String)>,
) -> Result<Json<Vec<Comment>>, ApiError>
where
  S: AuditStore + 'static,
{
  let item = record_ref(&record_type, id)?;
  Ok(Json(services.ledger.get_comments(item).await?))
}

#[derive(Debug, Deserialize)]
pub struct CommentBody {
  pub content: String,
}

/// `POST /records/{type}/{id}/comments`: blank comments are rejected.
pub async fn add_comment<S>(
  State(services): State<Services<S>>,
  user: CurrentUser,
  Path((record_type, id)): Path<(String, String)>,
  Json(body): Json<CommentBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AuditStore + 'static,
{
  let item = record_ref(&record_type, id)?;
  let content = body.content.trim();
  if content.is_empty() {
    return Err(ApiError::BadRequest("comment content is empty".into()));
  }
  let comment = services
    .ledger
    .add_comment(user.actor(), item, content)
    .await?;
  Ok((StatusCode::CREATED, Json(comment)))
}

// ─── Timeline ─────────────────────────────────────────────────────────────────

/// `GET /records/{type}/{id}/timeline`
pub async fn timeline<S>(
  State(services): State<Services<S>>,
  Path((record_type, id)): Path<(String, String)>,
) -> Result<Json<Vec<TimelineEntry>>, ApiError>
where
  S: AuditStore + 'static,
{
  let item = record_ref(&record_type, id)?;
  Ok(Json(services.ledger.timeline(item).await?))
}

// ─── Relationships ────────────────────────────────────────────────────────────

/// `GET /records/{type}/{id}/related`
pub async fn related<S>(
  State(services): State<Services<S>>,
  Path((record_type, id)): Path<(String, String)>,
) -> Result<Json<Vec<RecordRef>>, ApiError>
where
  S: AuditStore + 'static,
{
  let item = record_ref(&record_type, id)?;
  Ok(Json(services.graph.get_related_items(item).await?))
}

/// `GET /records/{type}/{id}/relationships`
pub async fn relationships<S>(
  State(services): State<Services<S>>,
  Path((record_type, id)): Path<(String, String)>,
) -> Result<Json<Vec<Relationship>>, ApiError>
where
  S: AuditStore + 'static,
{
  let item = record_ref(&record_type, id)?;
  Ok(Json(services.graph.get_relationships(item).await?))
}
