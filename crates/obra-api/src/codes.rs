//! Handler for `POST /codes/{type}`.
//!
//! Mints the next code for a record type without submitting anything. The
//! sequence value is consumed either way.

use axum::{
  Json,
  extract::{Path, State},
};
use obra_core::{Services, codes::RecordCode, store::AuditStore};
use serde::Serialize;

use crate::{error::ApiError, parse_record_type};

#[derive(Debug, Serialize)]
pub struct GeneratedCode {
  pub code:  String,
  #[serde(flatten)]
  pub parts: RecordCode,
}

/// `POST /codes/{type}`
pub async fn generate<S>(
  State(services): State<Services<S>>,
  Path(record_type): Path<String>,
) -> Result<Json<GeneratedCode>, ApiError>
where
  S: AuditStore + 'static,
{
  let record_type = parse_record_type(&record_type)?;
  let code = services.codes.generate(record_type).await?;
  tracing::debug!(%code, "code generated");
  Ok(Json(GeneratedCode { code: code.to_string(), parts: code }))
}
