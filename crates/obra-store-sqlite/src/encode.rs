//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings (nanosecond
//! precision, `Z` suffix) so that text order equals time order. Change lists,
//! payloads and activity details are compact JSON. UUIDs are hyphenated
//! lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use obra_core::{
  activity::{ActivityEntry, ActivityKind},
  codes::RecordCode,
  history::{Action, Change, Comment, HistoryEntry},
  identity::Role,
  record::{RecordRef, RecordType},
  relationship::Relationship,
  submission::Submission,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn decode_record_type(s: &str) -> Result<RecordType> { Ok(s.parse()?) }

pub fn decode_action(s: &str) -> Result<Action> {
  match s {
    "create" => Ok(Action::Create),
    "update" => Ok(Action::Update),
    "delete" => Ok(Action::Delete),
    other => Err(unknown("action", other)),
  }
}

pub fn decode_role(s: &str) -> Result<Role> {
  match s {
    "admin" => Ok(Role::Admin),
    "fiscal" => Ok(Role::Fiscal),
    "viewer" => Ok(Role::Viewer),
    other => Err(unknown("user_role", other)),
  }
}

pub fn decode_activity_kind(s: &str) -> Result<ActivityKind> {
  ActivityKind::from_str_opt(s).ok_or_else(|| unknown("kind", s))
}

fn unknown(column: &'static str, value: &str) -> Error {
  Error::UnknownValue { column, value: value.to_owned() }
}

// ─── JSON columns ────────────────────────────────────────────────────────────

pub fn encode_changes(changes: &[Change]) -> Result<String> {
  Ok(serde_json::to_string(changes)?)
}

pub fn decode_changes(s: &str) -> Result<Vec<Change>> { Ok(serde_json::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column values of one `history` row, encoded for insertion.
pub struct HistoryRow {
  pub entry_id:     String,
  pub item_type:    &'static str,
  pub item_id:      String,
  pub user_id:      String,
  pub user_name:    String,
  pub action:       &'static str,
  pub changes_json: String,
  pub timestamp:    String,
}

impl HistoryRow {
  pub fn encode(entry: &HistoryEntry) -> Result<Self> {
    Ok(Self {
      entry_id:     encode_uuid(entry.entry_id),
      item_type:    entry.item.record_type.as_str(),
      item_id:      entry.item.id.clone(),
      user_id:      entry.user_id.clone(),
      user_name:    entry.user_name.clone(),
      action:       entry.action.as_str(),
      changes_json: encode_changes(&entry.changes)?,
      timestamp:    encode_dt(entry.timestamp),
    })
  }

  pub fn insert(&self, conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute(
      "INSERT INTO history (
         entry_id, item_type, item_id, user_id, user_name,
         action, changes_json, timestamp
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
      rusqlite::params![
        self.entry_id,
        self.item_type,
        self.item_id,
        self.user_id,
        self.user_name,
        self.action,
        self.changes_json,
        self.timestamp,
      ],
    )?;
    Ok(())
  }
}

/// Raw strings read directly from a `history` row.
pub struct RawHistoryEntry {
  pub entry_id:     String,
  pub item_type:    String,
  pub item_id:      String,
  pub user_id:      String,
  pub user_name:    String,
  pub action:       String,
  pub changes_json: String,
  pub timestamp:    String,
}

impl RawHistoryEntry {
  pub const COLUMNS: &'static str =
    "entry_id, item_type, item_id, user_id, user_name, action, changes_json, timestamp";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      entry_id:     row.get(0)?,
      item_type:    row.get(1)?,
      item_id:      row.get(2)?,
      user_id:      row.get(3)?,
      user_name:    row.get(4)?,
      action:       row.get(5)?,
      changes_json: row.get(6)?,
      timestamp:    row.get(7)?,
    })
  }

  pub fn into_entry(self) -> Result<HistoryEntry> {
    Ok(HistoryEntry {
      entry_id:  decode_uuid(&self.entry_id)?,
      item:      RecordRef::new(decode_record_type(&self.item_type)?, self.item_id),
      user_id:   self.user_id,
      user_name: self.user_name,
      action:    decode_action(&self.action)?,
      changes:   decode_changes(&self.changes_json)?,
      timestamp: decode_dt(&self.timestamp)?,
    })
  }
}

/// Raw strings read directly from a `comments` row.
pub struct RawComment {
  pub comment_id: String,
  pub item_type:  String,
  pub item_id:    String,
  pub user_id:    String,
  pub user_name:  String,
  pub content:    String,
  pub timestamp:  String,
}

impl RawComment {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      comment_id: row.get(0)?,
      item_type:  row.get(1)?,
      item_id:    row.get(2)?,
      user_id:    row.get(3)?,
      user_name:  row.get(4)?,
      content:    row.get(5)?,
      timestamp:  row.get(6)?,
    })
  }

  pub fn into_comment(self) -> Result<Comment> {
    Ok(Comment {
      comment_id: decode_uuid(&self.comment_id)?,
      item:       RecordRef::new(decode_record_type(&self.item_type)?, self.item_id),
      user_id:    self.user_id,
      user_name:  self.user_name,
      content:    self.content,
      timestamp:  decode_dt(&self.timestamp)?,
    })
  }
}

/// Raw strings read directly from a `relationships` row.
pub struct RawRelationship {
  pub relationship_id: String,
  pub source_type:     String,
  pub source_id:       String,
  pub target_type:     String,
  pub target_id:       String,
  pub created_at:      String,
  pub created_by:      String,
  pub project_id:      String,
}

impl RawRelationship {
  pub const COLUMNS: &'static str = "relationship_id, source_type, source_id, \
     target_type, target_id, created_at, created_by, project_id";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      relationship_id: row.get(0)?,
      source_type:     row.get(1)?,
      source_id:       row.get(2)?,
      target_type:     row.get(3)?,
      target_id:       row.get(4)?,
      created_at:      row.get(5)?,
      created_by:      row.get(6)?,
      project_id:      row.get(7)?,
    })
  }

  pub fn into_relationship(self) -> Result<Relationship> {
    Ok(Relationship {
      relationship_id: decode_uuid(&self.relationship_id)?,
      source:          RecordRef::new(decode_record_type(&self.source_type)?, self.source_id),
      target:          RecordRef::new(decode_record_type(&self.target_type)?, self.target_id),
      created_at:      decode_dt(&self.created_at)?,
      created_by:      self.created_by,
      project_id:      self.project_id,
    })
  }
}

/// Raw strings read directly from a `submissions` row.
pub struct RawSubmission {
  pub record_type:  String,
  pub record_id:    String,
  pub code:         String,
  pub state:        String,
  pub submitted_at: String,
  pub submitted_by: String,
  pub payload_json: String,
}

impl RawSubmission {
  pub fn into_submission(self) -> Result<Submission> {
    Ok(Submission {
      item:         RecordRef::new(decode_record_type(&self.record_type)?, self.record_id),
      code:         RecordCode::parse(&self.code)?,
      state:        self.state,
      submitted_at: decode_dt(&self.submitted_at)?,
      submitted_by: self.submitted_by,
      payload:      serde_json::from_str(&self.payload_json)?,
    })
  }
}

/// Raw strings read directly from an `activity` row.
pub struct RawActivity {
  pub log_id:       String,
  pub timestamp:    String,
  pub kind:         String,
  pub user_id:      String,
  pub user_name:    String,
  pub user_role:    String,
  pub project_id:   Option<String>,
  pub project_name: Option<String>,
  pub description:  String,
  pub details_json: Option<String>,
}

impl RawActivity {
  pub fn into_entry(self) -> Result<ActivityEntry> {
    Ok(ActivityEntry {
      log_id:       decode_uuid(&self.log_id)?,
      timestamp:    decode_dt(&self.timestamp)?,
      kind:         decode_activity_kind(&self.kind)?,
      user_id:      self.user_id,
      user_name:    self.user_name,
      user_role:    decode_role(&self.user_role)?,
      project_id:   self.project_id,
      project_name: self.project_name,
      description:  self.description,
      details:      self
        .details_json
        .as_deref()
        .map(serde_json::from_str)
        .transpose()?,
    })
  }
}
