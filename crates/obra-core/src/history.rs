//! Audit-trail types: change records, comments, and the merged timeline.
//!
//! History entries and comments are immutable once written. Nothing in the
//! core updates or deletes them; presentation order is newest first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{identity::Actor, record::RecordRef};

// ─── Action ──────────────────────────────────────────────────────────────────

/// What kind of mutation a history entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
  Create,
  Update,
  Delete,
}

impl Action {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Create => "create",
      Self::Update => "update",
      Self::Delete => "delete",
    }
  }
}

// ─── Change ──────────────────────────────────────────────────────────────────

/// One field-level before/after pair inside a history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
  pub field:     String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub old_value: Option<String>,
  pub new_value: String,
}

impl Change {
  /// A field set for the first time.
  pub fn set(field: impl Into<String>, new_value: impl Into<String>) -> Self {
    Self { field: field.into(), old_value: None, new_value: new_value.into() }
  }

  /// A field moved from one value to another.
  pub fn changed(
    field: impl Into<String>,
    old_value: impl Into<String>,
    new_value: impl Into<String>,
  ) -> Self {
    Self {
      field:     field.into(),
      old_value: Some(old_value.into()),
      new_value: new_value.into(),
    }
  }

  /// Timeline wording for this change.
  pub fn describe(&self) -> String {
    match &self.old_value {
      None => format!("Definido {} como \"{}\"", self.field, self.new_value),
      Some(old) => format!(
        "Alterado {} de \"{}\" para \"{}\"",
        self.field, old, self.new_value
      ),
    }
  }
}

// ─── HistoryEntry ────────────────────────────────────────────────────────────

/// An immutable audit record of one state-changing operation on a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
  pub entry_id:  Uuid,
  pub item:      RecordRef,
  pub user_id:   String,
  pub user_name: String,
  pub action:    Action,
  pub changes:   Vec<Change>,
  pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
  /// Build a fresh entry attributed to `actor`.
  pub fn new(
    actor: &Actor,
    item: RecordRef,
    action: Action,
    changes: Vec<Change>,
    timestamp: DateTime<Utc>,
  ) -> Self {
    Self {
      entry_id: Uuid::new_v4(),
      item,
      user_id: actor.id.clone(),
      user_name: actor.name.clone(),
      action,
      changes,
      timestamp,
    }
  }
}

// ─── Comment ─────────────────────────────────────────────────────────────────

/// Free-text remark on a record, shown in the same timeline as its history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
  pub comment_id: Uuid,
  pub item:       RecordRef,
  pub user_id:    String,
  pub user_name:  String,
  pub content:    String,
  pub timestamp:  DateTime<Utc>,
}

// ─── Timeline ────────────────────────────────────────────────────────────────

/// One row of a record's merged audit timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimelineEntry {
  History(HistoryEntry),
  Comment(Comment),
}

impl TimelineEntry {
  pub fn timestamp(&self) -> DateTime<Utc> {
    match self {
      Self::History(h) => h.timestamp,
      Self::Comment(c) => c.timestamp,
    }
  }

  pub fn user_name(&self) -> &str {
    match self {
      Self::History(h) => &h.user_name,
      Self::Comment(c) => &c.user_name,
    }
  }
}

/// Merge history and comments into one sequence, newest first. Inputs are
/// expected newest first already; ties keep history ahead of comments.
pub fn merge_timeline(
  history: Vec<HistoryEntry>,
  comments: Vec<Comment>,
) -> Vec<TimelineEntry> {
  let mut out: Vec<TimelineEntry> = history
    .into_iter()
    .map(TimelineEntry::History)
    .chain(comments.into_iter().map(TimelineEntry::Comment))
    .collect();
  // Stable sort keeps each source's own ordering for equal timestamps.
  out.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
  out
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;
  use crate::record::RecordType;

  fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, hour, 0, 0).unwrap()
  }

  fn item() -> RecordRef { RecordRef::new(RecordType::Material, "1") }

  #[test]
  fn describe_set_and_changed() {
    assert_eq!(
      Change::set("estado", "Pendente").describe(),
      "Definido estado como \"Pendente\""
    );
    assert_eq!(
      Change::changed("estado", "Pendente", "Aprovado").describe(),
      "Alterado estado de \"Pendente\" para \"Aprovado\""
    );
  }

  #[test]
  fn change_without_old_value_omits_field() {
    let json = serde_json::to_value(Change::set("codigo", "MAT-2024-001")).unwrap();
    assert!(json.get("old_value").is_none());
    assert_eq!(json["new_value"], "MAT-2024-001");
  }

  #[test]
  fn timeline_interleaves_newest_first() {
    let actor = Actor::new("u1", "João Silva");
    let h1 = HistoryEntry::new(&actor, item(), Action::Create, vec![], at(10));
    let h2 = HistoryEntry::new(&actor, item(), Action::Update, vec![], at(14));
    let c1 = Comment {
      comment_id: Uuid::new_v4(),
      item:       item(),
      user_id:    "u2".into(),
      user_name:  "Maria Santos".into(),
      content:    "Certificado verificado.".into(),
      timestamp:  at(12),
    };

    let timeline = merge_timeline(vec![h2.clone(), h1.clone()], vec![c1.clone()]);
    assert_eq!(timeline, vec![
      TimelineEntry::History(h2),
      TimelineEntry::Comment(c1),
      TimelineEntry::History(h1),
    ]);
    assert_eq!(timeline[1].user_name(), "Maria Santos");
  }
}
