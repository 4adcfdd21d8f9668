//! Activity log: a global, append-only feed of what users did, across all
//! projects. Unlike record history it is not keyed by record and is meant
//! for the administrators' log view.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  identity::{Actor, ProjectContext, Role},
  record::RecordType,
  store::AuditStore,
};

// ─── Kind ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
  Login,
  Logout,
  ProjectCreate,
  ProjectUpdate,
  DocumentUpload,
  DocumentView,
  TestCreate,
  TestUpdate,
  MaterialCreate,
  MaterialUpdate,
  NcCreate,
  NcUpdate,
  ChecklistCreate,
  ChecklistUpdate,
  RfiCreate,
  RfiUpdate,
  ProfileUpdate,
  AccessGranted,
  AccessRevoked,
}

impl ActivityKind {
  /// The discriminant stored in the `kind` column. Must match the serde
  /// renames above.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Login => "login",
      Self::Logout => "logout",
      Self::ProjectCreate => "project_create",
      Self::ProjectUpdate => "project_update",
      Self::DocumentUpload => "document_upload",
      Self::DocumentView => "document_view",
      Self::TestCreate => "test_create",
      Self::TestUpdate => "test_update",
      Self::MaterialCreate => "material_create",
      Self::MaterialUpdate => "material_update",
      Self::NcCreate => "nc_create",
      Self::NcUpdate => "nc_update",
      Self::ChecklistCreate => "checklist_create",
      Self::ChecklistUpdate => "checklist_update",
      Self::RfiCreate => "rfi_create",
      Self::RfiUpdate => "rfi_update",
      Self::ProfileUpdate => "profile_update",
      Self::AccessGranted => "access_granted",
      Self::AccessRevoked => "access_revoked",
    }
  }

  pub fn from_str_opt(s: &str) -> Option<Self> {
    serde_json::from_value(serde_json::Value::String(s.to_owned())).ok()
  }

  /// The kind logged when a record of `record_type` is created. Documents
  /// enter the system by upload.
  pub fn created(record_type: RecordType) -> Self {
    match record_type {
      RecordType::Document => Self::DocumentUpload,
      RecordType::Test => Self::TestCreate,
      RecordType::Material => Self::MaterialCreate,
      RecordType::NonConformity => Self::NcCreate,
      RecordType::Checklist => Self::ChecklistCreate,
      RecordType::Rfi => Self::RfiCreate,
    }
  }

  /// The kind logged when a record of `record_type` is edited or relinked.
  /// Documents have no dedicated update kind and log as uploads.
  pub fn updated(record_type: RecordType) -> Self {
    match record_type {
      RecordType::Document => Self::DocumentUpload,
      RecordType::Test => Self::TestUpdate,
      RecordType::Material => Self::MaterialUpdate,
      RecordType::NonConformity => Self::NcUpdate,
      RecordType::Checklist => Self::ChecklistUpdate,
      RecordType::Rfi => Self::RfiUpdate,
    }
  }
}

// ─── Entry ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
  pub log_id:       Uuid,
  pub timestamp:    DateTime<Utc>,
  pub kind:         ActivityKind,
  pub user_id:      String,
  pub user_name:    String,
  pub user_role:    Role,
  pub project_id:   Option<String>,
  pub project_name: Option<String>,
  pub description:  String,
  pub details:      Option<serde_json::Value>,
}

// ─── Query ───────────────────────────────────────────────────────────────────

/// Parameters for [`ActivityLog::query`]. Every set field must match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityQuery {
  pub user_id:    Option<String>,
  pub project_id: Option<String>,
  pub kind:       Option<ActivityKind>,
  /// Inclusive lower bound on `timestamp`.
  pub start:      Option<DateTime<Utc>>,
  /// Inclusive upper bound on `timestamp`.
  pub end:        Option<DateTime<Utc>>,
  /// Case-insensitive substring over description, user name and project
  /// name.
  pub search:     Option<String>,
  pub limit:      Option<usize>,
}

impl ActivityQuery {
  /// Reference filter; backends may push it down but must agree with it.
  pub fn matches(&self, entry: &ActivityEntry) -> bool {
    if self.user_id.as_ref().is_some_and(|u| *u != entry.user_id) {
      return false;
    }
    if self
      .project_id
      .as_ref()
      .is_some_and(|p| entry.project_id.as_ref() != Some(p))
    {
      return false;
    }
    if self.kind.is_some_and(|k| k != entry.kind) {
      return false;
    }
    if self.start.is_some_and(|s| entry.timestamp < s) {
      return false;
    }
    if self.end.is_some_and(|e| entry.timestamp > e) {
      return false;
    }
    if let Some(needle) = &self.search {
      let needle = needle.to_lowercase();
      let hit = entry.description.to_lowercase().contains(&needle)
        || entry.user_name.to_lowercase().contains(&needle)
        || entry
          .project_name
          .as_ref()
          .is_some_and(|n| n.to_lowercase().contains(&needle));
      if !hit {
        return false;
      }
    }
    true
  }
}

// ─── Service ─────────────────────────────────────────────────────────────────

pub struct ActivityLog<S> {
  store: Arc<S>,
}

impl<S> Clone for ActivityLog<S> {
  fn clone(&self) -> Self { Self { store: self.store.clone() } }
}

impl<S: AuditStore> ActivityLog<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Append one entry attributed to `actor` within `project`.
  pub async fn record(
    &self,
    actor: Option<&Actor>,
    project: Option<&ProjectContext>,
    kind: ActivityKind,
    description: impl Into<String>,
    details: Option<serde_json::Value>,
  ) -> Result<ActivityEntry> {
    let actor = actor.ok_or(Error::NotAuthenticated)?;

    let entry = ActivityEntry {
      log_id: Uuid::new_v4(),
      timestamp: Utc::now(),
      kind,
      user_id: actor.id.clone(),
      user_name: actor.name.clone(),
      user_role: actor.role,
      project_id: project.map(|p| p.id.clone()),
      project_name: project.and_then(|p| p.name.clone()),
      description: description.into(),
      details,
    };

    self
      .store
      .append_activity(entry.clone())
      .await
      .map_err(Error::store)?;
    tracing::debug!(kind = kind.as_str(), user = %actor.id, "activity logged");
    Ok(entry)
  }

  /// Entries matching `query`, newest first.
  pub async fn query(&self, query: &ActivityQuery) -> Result<Vec<ActivityEntry>> {
    self.store.activity(query).await.map_err(Error::store)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::memory::MemoryStore;

  fn log() -> ActivityLog<MemoryStore> { ActivityLog::new(Arc::new(MemoryStore::new())) }

  fn project(id: &str, name: &str) -> ProjectContext {
    ProjectContext { id: id.into(), name: Some(name.into()) }
  }

  #[test]
  fn kind_strings_match_serde() {
    for kind in [ActivityKind::NcCreate, ActivityKind::AccessRevoked, ActivityKind::Login] {
      assert_eq!(ActivityKind::from_str_opt(kind.as_str()), Some(kind));
      assert_eq!(serde_json::to_value(kind).unwrap(), kind.as_str());
    }
    assert_eq!(ActivityKind::from_str_opt("teleport"), None);
  }

  #[tokio::test]
  async fn record_requires_actor() {
    let err = log()
      .record(None, None, ActivityKind::Login, "entrou", None)
      .await
      .unwrap_err();
    assert!(matches!(err, Error::NotAuthenticated));
  }

  #[tokio::test]
  async fn query_filters_and_orders_newest_first() {
    let log = log();
    let joao = Actor::new("u1", "João Silva").with_role(Role::Fiscal);
    let maria = Actor::new("u2", "Maria Santos");
    let ponte = project("p1", "Ponte Norte");
    let escola = project("p2", "Escola Sul");

    log.record(Some(&joao), Some(&ponte), ActivityKind::MaterialCreate, "Material MAT-2024-001 criado", None).await.unwrap();
    log.record(Some(&maria), Some(&escola), ActivityKind::NcCreate, "NC aberta", None).await.unwrap();
    let last = log.record(Some(&joao), Some(&escola), ActivityKind::Logout, "saiu", None).await.unwrap();

    let all = log.query(&ActivityQuery::default()).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].log_id, last.log_id);
    assert_eq!(all[0].user_role, Role::Fiscal);

    let by_user = log
      .query(&ActivityQuery { user_id: Some("u1".into()), ..Default::default() })
      .await
      .unwrap();
    assert_eq!(by_user.len(), 2);

    let by_project = log
      .query(&ActivityQuery { project_id: Some("p2".into()), ..Default::default() })
      .await
      .unwrap();
    assert_eq!(by_project.len(), 2);

    let by_kind = log
      .query(&ActivityQuery { kind: Some(ActivityKind::NcCreate), ..Default::default() })
      .await
      .unwrap();
    assert_eq!(by_kind.len(), 1);
    assert_eq!(by_kind[0].user_name, "Maria Santos");

    let search = log
      .query(&ActivityQuery { search: Some("PONTE".into()), ..Default::default() })
      .await
      .unwrap();
    assert_eq!(search.len(), 1);
    assert_eq!(search[0].kind, ActivityKind::MaterialCreate);

    let limited = log
      .query(&ActivityQuery { limit: Some(1), ..Default::default() })
      .await
      .unwrap();
    assert_eq!(limited.len(), 1);

    let future = log
      .query(&ActivityQuery { start: Some(Utc::now() + chrono::Duration::hours(1)), ..Default::default() })
      .await
      .unwrap();
    assert!(future.is_empty());
  }
}
