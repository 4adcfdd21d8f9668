//! Router tests driving the full API over an in-memory SQLite store.

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use obra_core::Services;
use obra_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{
  actor::{PROJECT_ID, PROJECT_NAME, USER_ID, USER_NAME, USER_ROLE},
  api_router,
};

async fn app() -> Router {
  let store = SqliteStore::open_in_memory().await.unwrap();
  api_router(Services::new(Arc::new(store)))
}

const JOAO: &[(&str, &str)] = &[
  (USER_ID, "u1"),
  (USER_NAME, "João Silva"),
  (USER_ROLE, "fiscal"),
  (PROJECT_ID, "p1"),
  (PROJECT_NAME, "Ponte Norte"),
];

async fn send(
  app: &Router,
  method: &str,
  uri: &str,
  user: &[(&str, &str)],
  body: Option<Value>,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  for (k, v) in user {
    builder = builder.header(*k, *v);
  }
  let body = match body {
    Some(json) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(json.to_string())
    }
    None => Body::empty(),
  };
  let resp = app
    .clone()
    .oneshot(builder.body(body).unwrap())
    .await
    .unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
    .await
    .unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, value)
}

// ── Codes ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn codes_are_sequential_per_type() {
  let app = app().await;

  let (status, first) = send(&app, "POST", "/codes/nc", &[], None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(first["sequence"], 1);
  assert!(first["code"].as_str().unwrap().starts_with("NC-"));

  let (_, other) = send(&app, "POST", "/codes/rfi", &[], None).await;
  assert_eq!(other["sequence"], 1);
  let (_, second) = send(&app, "POST", "/codes/nc", &[], None).await;
  assert_eq!(second["sequence"], 2);
}

#[tokio::test]
async fn unknown_record_type_is_400() {
  let app = app().await;
  let (status, body) = send(&app, "POST", "/codes/supplier", &[], None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("supplier"));
}

// ── Submission ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn submit_material_then_fetch_and_log() {
  let app = app().await;

  let (status, sub) = send(
    &app,
    "POST",
    "/records/material",
    JOAO,
    Some(json!({ "id": "m-1", "designacao": "Betão C30/37" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(sub["state"], "Pendente");
  assert_eq!(sub["payload"]["submittedBy"], "u1");
  let code = sub["code"].as_str().unwrap().to_owned();
  assert!(code.starts_with("MAT-") && code.ends_with("-001"));

  let (status, fetched) = send(&app, "GET", "/records/material/m-1", &[], None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(fetched["code"], code.as_str());

  let (_, history) = send(&app, "GET", "/records/material/m-1/history", &[], None).await;
  assert_eq!(history.as_array().unwrap().len(), 1);
  assert_eq!(history[0]["action"], "create");

  let (_, activity) = send(&app, "GET", "/activity?kind=material_create", &[], None).await;
  let activity = activity.as_array().unwrap();
  assert_eq!(activity.len(), 1);
  assert_eq!(activity[0]["project_name"], "Ponte Norte");
  assert_eq!(activity[0]["details"]["codigo"], code.as_str());
}

#[tokio::test]
async fn submit_without_user_is_401() {
  let app = app().await;
  let (status, body) = send(&app, "POST", "/records/test", &[], Some(json!({}))).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["error"], "not authenticated");

  // No code was consumed.
  let (_, code) = send(&app, "POST", "/codes/test", &[], None).await;
  assert_eq!(code["sequence"], 1);
}

#[tokio::test]
async fn resubmitting_same_id_is_409() {
  let app = app().await;
  let body = json!({ "id": "d-1" });
  let (status, _) = send(&app, "POST", "/records/document", JOAO, Some(body.clone())).await;
  assert_eq!(status, StatusCode::CREATED);
  let (status, _) = send(&app, "POST", "/records/document", JOAO, Some(body)).await;
  assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn non_object_payload_is_400() {
  let app = app().await;
  let (status, _) = send(&app, "POST", "/records/rfi", JOAO, Some(json!([1, 2]))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_submission_is_404() {
  let app = app().await;
  let (status, _) = send(&app, "GET", "/records/checklist/nope", &[], None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── History & comments ──────────────────────────────────────────────────────

#[tokio::test]
async fn comments_and_history_feed_the_timeline() {
  let app = app().await;

  let (status, _) = send(
    &app,
    "POST",
    "/records/nc/NC-7/history",
    JOAO,
    Some(json!({
      "action": "update",
      "changes": [{ "field": "estado", "old_value": "Aberta", "new_value": "Fechada" }],
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);

  let (status, comment) = send(
    &app,
    "POST",
    "/records/nc/NC-7/comments",
    JOAO,
    Some(json!({ "content": "  Reparação verificada em obra.  " })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(comment["content"], "Reparação verificada em obra.");

  let (_, timeline) = send(&app, "GET", "/records/nc/NC-7/timeline", &[], None).await;
  let timeline = timeline.as_array().unwrap();
  assert_eq!(timeline.len(), 2);
  assert_eq!(timeline[0]["kind"], "comment");
  assert_eq!(timeline[1]["kind"], "history");
}

#[tokio::test]
async fn blank_comment_is_400() {
  let app = app().await;
  let (status, _) = send(
    &app,
    "POST",
    "/records/test/T1/comments",
    JOAO,
    Some(json!({ "content": "   " })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (_, comments) = send(&app, "GET", "/records/test/T1/comments", &[], None).await;
  assert!(comments.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn history_edits_log_update_activity() {
  let app = app().await;

  let (status, entry) = send(
    &app,
    "POST",
    "/records/nc/NC-7/history",
    JOAO,
    Some(json!({
      "action": "update",
      "changes": [{ "field": "estado", "old_value": "Aberta", "new_value": "Fechada" }],
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);

  let (_, activity) = send(&app, "GET", "/activity?kind=nc_update", &[], None).await;
  let activity = activity.as_array().unwrap();
  assert_eq!(activity.len(), 1);
  assert_eq!(activity[0]["user_id"], "u1");
  assert_eq!(activity[0]["details"]["id"], "NC-7");
  assert_eq!(activity[0]["details"]["entry_id"], entry["entry_id"]);
}

// ── Relationships ───────────────────────────────────────────────────────────

#[tokio::test]
async fn relinks_log_update_activity_for_the_source() {
  let app = app().await;
  let test = json!({ "type": "test", "id": "T1" });
  let material = json!({ "type": "material", "id": "M1" });

  let (status, rel) = send(
    &app,
    "POST",
    "/relationships",
    JOAO,
    Some(json!({ "source": test, "target": material })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  let uri = format!("/relationships/{}", rel["relationship_id"].as_str().unwrap());
  send(&app, "DELETE", &uri, JOAO, None).await;
  // Already gone: nothing more is logged.
  send(&app, "DELETE", &uri, JOAO, None).await;

  let (_, activity) = send(&app, "GET", "/activity?kind=test_update", &[], None).await;
  let activity = activity.as_array().unwrap();
  assert_eq!(activity.len(), 2);
  for entry in activity {
    assert_eq!(entry["details"]["relationship_id"], rel["relationship_id"]);
    assert_eq!(entry["details"]["target"], material);
  }
  let (_, material_side) = send(&app, "GET", "/activity?kind=material_update", &[], None).await;
  assert!(material_side.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn link_list_and_unlink() {
  let app = app().await;
  let doc = json!({ "type": "document", "id": "DOC-1" });
  let nc = json!({ "type": "nc", "id": "NC-1" });

  let (status, rel) = send(
    &app,
    "POST",
    "/relationships",
    JOAO,
    Some(json!({ "source": doc, "target": nc })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(rel["project_id"], "p1");
  let id = rel["relationship_id"].as_str().unwrap().to_owned();

  let (_, related) = send(&app, "GET", "/records/nc/NC-1/related", &[], None).await;
  assert_eq!(related, json!([doc]));
  let (_, rows) = send(&app, "GET", "/records/document/DOC-1/relationships", &[], None).await;
  assert_eq!(rows.as_array().unwrap().len(), 1);

  let (status, _) = send(
    &app,
    "POST",
    "/relationships",
    JOAO,
    Some(json!({ "source": nc, "target": doc })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);

  let uri = format!("/relationships/{id}");
  let (status, _) = send(&app, "DELETE", &uri, JOAO, None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (status, _) = send(&app, "DELETE", &uri, JOAO, None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (_, related) = send(&app, "GET", "/records/document/DOC-1/related", &[], None).await;
  assert_eq!(related, json!([]));
}

#[tokio::test]
async fn unauthenticated_link_is_401_and_writes_nothing() {
  let app = app().await;
  let (status, _) = send(
    &app,
    "POST",
    "/relationships",
    &[],
    Some(json!({
      "source": { "type": "test", "id": "T1" },
      "target": { "type": "material", "id": "M1" },
      "project_id": "p1",
    })),
  )
  .await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let (_, related) = send(&app, "GET", "/records/test/T1/related", &[], None).await;
  assert_eq!(related, json!([]));
  let (_, history) = send(&app, "GET", "/records/material/M1/history", &[], None).await;
  assert_eq!(history, json!([]));
}

#[tokio::test]
async fn self_link_is_400() {
  let app = app().await;
  let doc = json!({ "type": "document", "id": "DOC-1" });
  let (status, _) = send(
    &app,
    "POST",
    "/relationships",
    JOAO,
    Some(json!({ "source": doc, "target": doc })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ── Activity ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn client_events_are_recorded_and_searchable() {
  let app = app().await;

  let (status, entry) = send(
    &app,
    "POST",
    "/activity",
    JOAO,
    Some(json!({ "kind": "login", "description": "Sessão iniciada" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(entry["user_role"], "fiscal");

  let (_, found) = send(&app, "GET", "/activity?search=SESS%C3%83O&user_id=u1", &[], None).await;
  assert_eq!(found.as_array().unwrap().len(), 1);

  let (_, none) = send(&app, "GET", "/activity?user_id=someone-else", &[], None).await;
  assert_eq!(none, json!([]));
}
