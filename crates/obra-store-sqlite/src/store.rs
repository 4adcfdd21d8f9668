//! [`SqliteStore`]: the SQLite implementation of [`AuditStore`].

use std::path::Path;

use obra_core::{
  activity::{ActivityEntry, ActivityQuery},
  history::{Comment, HistoryEntry},
  record::{RecordRef, RecordType},
  relationship::Relationship,
  store::{AuditStore, Insert},
  submission::{Submission, SubmissionDraft},
};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    HistoryRow, RawActivity, RawComment, RawHistoryEntry, RawRelationship,
    RawSubmission, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

/// Bump a type's counter and return the new value, creating it at 1.
const NEXT_SEQUENCE_SQL: &str = "INSERT INTO code_sequences (record_type, last_value)
   VALUES (?1, 1)
   ON CONFLICT (record_type) DO UPDATE SET last_value = last_value + 1
   RETURNING last_value";

fn next_sequence_in(conn: &rusqlite::Connection, record_type: RecordType) -> rusqlite::Result<u64> {
  conn.query_row(NEXT_SEQUENCE_SQL, rusqlite::params![record_type.as_str()], |r| r.get(0))
}

/// Whether an INSERT was refused by a UNIQUE or PRIMARY KEY constraint.
fn is_conflict(err: &rusqlite::Error) -> bool {
  matches!(
    err,
    rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
  )
}

/// Box a non-SQLite failure raised inside a connection closure.
fn other(err: Error) -> tokio_rusqlite::Error { tokio_rusqlite::Error::Other(Box::new(err)) }

// ─── Store ───────────────────────────────────────────────────────────────────

/// An Obra audit store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store: useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    tracing::debug!("schema initialised");
    Ok(())
  }

  /// Run a directional relationship lookup. `side` is `source` or `target`.
  async fn relationships_where(
    &self,
    side: &'static str,
    record: RecordRef,
  ) -> Result<Vec<Relationship>> {
    let type_str = record.record_type.as_str();
    let id = record.id;

    let raws: Vec<RawRelationship> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {cols} FROM relationships
           WHERE {side}_type = ?1 AND {side}_id = ?2
           ORDER BY created_at, rowid",
          cols = RawRelationship::COLUMNS,
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![type_str, id], RawRelationship::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRelationship::into_relationship).collect()
  }
}

// ─── AuditStore impl ─────────────────────────────────────────────────────────

impl AuditStore for SqliteStore {
  type Error = Error;

  // ── Code sequences ────────────────────────────────────────────────────────

  async fn next_sequence(&self, record_type: RecordType) -> Result<u64> {
    let next = self
      .conn
      .call(move |conn| Ok(next_sequence_in(conn, record_type)?))
      .await?;
    Ok(next)
  }

  // ── Submissions ───────────────────────────────────────────────────────────

  async fn commit_submission(&self, draft: SubmissionDraft) -> Result<Insert<Submission>> {
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        let exists = tx
          .query_row(
            "SELECT 1 FROM submissions WHERE record_type = ?1 AND record_id = ?2",
            rusqlite::params![draft.item.record_type.as_str(), draft.item.id],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if exists {
          // Dropping `tx` rolls back; no sequence value is consumed.
          return Ok(Insert::Conflict);
        }

        let next = next_sequence_in(&tx, draft.item.record_type)?;
        let (submission, entry) = draft.complete(next);

        let payload_json = serde_json::to_string(&submission.payload)
          .map_err(|e| other(e.into()))?;
        let inserted = tx.execute(
          "INSERT INTO submissions (
             record_type, record_id, code, state,
             submitted_at, submitted_by, payload_json
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            submission.item.record_type.as_str(),
            submission.item.id,
            submission.code.to_string(),
            submission.state,
            encode_dt(submission.submitted_at),
            submission.submitted_by,
            payload_json,
          ],
        );
        match inserted {
          Err(e) if is_conflict(&e) => return Ok(Insert::Conflict),
          res => res?,
        };
        HistoryRow::encode(&entry).map_err(other)?.insert(&tx)?;

        tx.commit()?;
        Ok(Insert::Done(submission))
      })
      .await?;
    Ok(outcome)
  }

  async fn get_submission(&self, item: RecordRef) -> Result<Option<Submission>> {
    let type_str = item.record_type.as_str();
    let id = item.id;

    let raw: Option<RawSubmission> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT record_type, record_id, code, state,
                    submitted_at, submitted_by, payload_json
             FROM submissions WHERE record_type = ?1 AND record_id = ?2",
            rusqlite::params![type_str, id],
            |row| {
              Ok(RawSubmission {
                record_type:  row.get(0)?,
                record_id:    row.get(1)?,
                code:         row.get(2)?,
                state:        row.get(3)?,
                submitted_at: row.get(4)?,
                submitted_by: row.get(5)?,
                payload_json: row.get(6)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSubmission::into_submission).transpose()
  }

  // ── Relationships ─────────────────────────────────────────────────────────

  async fn insert_relationship(
    &self,
    relationship: Relationship,
    audit: Vec<HistoryEntry>,
  ) -> Result<Insert<()>> {
    let id_str      = encode_uuid(relationship.relationship_id);
    let source_type = relationship.source.record_type.as_str();
    let target_type = relationship.target.record_type.as_str();
    let created_at  = encode_dt(relationship.created_at);
    let rows        = audit.iter().map(HistoryRow::encode).collect::<Result<Vec<_>>>()?;

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        let joined = tx
          .query_row(
            "SELECT 1 FROM relationships
             WHERE (source_type = ?1 AND source_id = ?2 AND target_type = ?3 AND target_id = ?4)
                OR (source_type = ?3 AND source_id = ?4 AND target_type = ?1 AND target_id = ?2)
             LIMIT 1",
            rusqlite::params![
              source_type,
              relationship.source.id,
              target_type,
              relationship.target.id,
            ],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if joined {
          return Ok(Insert::Conflict);
        }

        let inserted = tx.execute(
          "INSERT INTO relationships (
             relationship_id, source_type, source_id, target_type, target_id,
             created_at, created_by, project_id
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            id_str,
            source_type,
            relationship.source.id,
            target_type,
            relationship.target.id,
            created_at,
            relationship.created_by,
            relationship.project_id,
          ],
        );
        match inserted {
          Err(e) if is_conflict(&e) => return Ok(Insert::Conflict),
          res => res?,
        };
        for row in &rows {
          row.insert(&tx)?;
        }
        tx.commit()?;
        Ok(Insert::Done(()))
      })
      .await?;
    Ok(outcome)
  }

  async fn get_relationship(&self, id: Uuid) -> Result<Option<Relationship>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawRelationship> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM relationships WHERE relationship_id = ?1",
          RawRelationship::COLUMNS
        );
        Ok(conn
          .query_row(&sql, rusqlite::params![id_str], RawRelationship::from_row)
          .optional()?)
      })
      .await?;

    raw.map(RawRelationship::into_relationship).transpose()
  }

  async fn delete_relationship(&self, id: Uuid, audit: Vec<HistoryEntry>) -> Result<bool> {
    let id_str = encode_uuid(id);
    let rows   = audit.iter().map(HistoryRow::encode).collect::<Result<Vec<_>>>()?;

    let removed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let deleted = tx.execute(
          "DELETE FROM relationships WHERE relationship_id = ?1",
          rusqlite::params![id_str],
        )?;
        if deleted > 0 {
          for row in &rows {
            row.insert(&tx)?;
          }
        }
        tx.commit()?;
        Ok(deleted > 0)
      })
      .await?;
    Ok(removed)
  }

  async fn relationships_from(&self, record: RecordRef) -> Result<Vec<Relationship>> {
    self.relationships_where("source", record).await
  }

  async fn relationships_to(&self, record: RecordRef) -> Result<Vec<Relationship>> {
    self.relationships_where("target", record).await
  }

  // ── History & comments ────────────────────────────────────────────────────

  async fn append_history(&self, entry: HistoryEntry) -> Result<()> {
    let row = HistoryRow::encode(&entry)?;
    self
      .conn
      .call(move |conn| Ok(row.insert(conn)?))
      .await?;
    Ok(())
  }

  async fn history_for(&self, item: RecordRef) -> Result<Vec<HistoryEntry>> {
    let type_str = item.record_type.as_str();
    let id = item.id;

    let raws: Vec<RawHistoryEntry> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM history
           WHERE item_type = ?1 AND item_id = ?2
           ORDER BY timestamp DESC, rowid DESC",
          RawHistoryEntry::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![type_str, id], RawHistoryEntry::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawHistoryEntry::into_entry).collect()
  }

  async fn append_comment(&self, comment: Comment) -> Result<()> {
    let id_str    = encode_uuid(comment.comment_id);
    let item_type = comment.item.record_type.as_str();
    let at_str    = encode_dt(comment.timestamp);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO comments (
             comment_id, item_type, item_id, user_id, user_name, content, timestamp
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            id_str,
            item_type,
            comment.item.id,
            comment.user_id,
            comment.user_name,
            comment.content,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn comments_for(&self, item: RecordRef) -> Result<Vec<Comment>> {
    let type_str = item.record_type.as_str();
    let id = item.id;

    let raws: Vec<RawComment> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT comment_id, item_type, item_id, user_id, user_name, content, timestamp
           FROM comments
           WHERE item_type = ?1 AND item_id = ?2
           ORDER BY timestamp DESC, rowid DESC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![type_str, id], RawComment::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawComment::into_comment).collect()
  }

  // ── Activity log ──────────────────────────────────────────────────────────

  async fn append_activity(&self, entry: ActivityEntry) -> Result<()> {
    let id_str       = encode_uuid(entry.log_id);
    let at_str       = encode_dt(entry.timestamp);
    let kind_str     = entry.kind.as_str();
    let role_str     = entry.user_role.as_str();
    let details_json = entry
      .details
      .as_ref()
      .map(serde_json::to_string)
      .transpose()?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO activity (
             log_id, timestamp, kind, user_id, user_name, user_role,
             project_id, project_name, description, details_json
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
          rusqlite::params![
            id_str,
            at_str,
            kind_str,
            entry.user_id,
            entry.user_name,
            role_str,
            entry.project_id,
            entry.project_name,
            entry.description,
            details_json,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn activity(&self, query: &ActivityQuery) -> Result<Vec<ActivityEntry>> {
    // Indexed filters run in SQL; free-text search is applied afterwards
    // through `ActivityQuery::matches` so that case folding follows Rust's
    // Unicode rules rather than SQLite's ASCII-only `lower()`.
    let user_id    = query.user_id.clone();
    let project_id = query.project_id.clone();
    let kind_str   = query.kind.map(|k| k.as_str());
    let start_str  = query.start.map(encode_dt);
    let end_str    = query.end.map(encode_dt);

    let raws: Vec<RawActivity> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT log_id, timestamp, kind, user_id, user_name, user_role,
                  project_id, project_name, description, details_json
           FROM activity
           WHERE (?1 IS NULL OR user_id    = ?1)
             AND (?2 IS NULL OR project_id = ?2)
             AND (?3 IS NULL OR kind       = ?3)
             AND (?4 IS NULL OR timestamp >= ?4)
             AND (?5 IS NULL OR timestamp <= ?5)
           ORDER BY timestamp DESC, rowid DESC",
        )?;
        let rows = stmt
          .query_map(
            rusqlite::params![user_id, project_id, kind_str, start_str, end_str],
            |row| {
              Ok(RawActivity {
                log_id:       row.get(0)?,
                timestamp:    row.get(1)?,
                kind:         row.get(2)?,
                user_id:      row.get(3)?,
                user_name:    row.get(4)?,
                user_role:    row.get(5)?,
                project_id:   row.get(6)?,
                project_name: row.get(7)?,
                description:  row.get(8)?,
                details_json: row.get(9)?,
              })
            },
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut entries = Vec::new();
    for raw in raws {
      if query.limit.is_some_and(|limit| entries.len() >= limit) {
        break;
      }
      let entry = raw.into_entry()?;
      if query.matches(&entry) {
        entries.push(entry);
      }
    }
    Ok(entries)
  }
}
