//! [`MemoryStore`]: an in-process [`AuditStore`] for tests and embedding.
//!
//! All state sits behind one mutex, so every method is atomic with respect
//! to every other, including the multi-row writes.

use std::{
  collections::HashMap,
  sync::{Mutex, MutexGuard},
};

use thiserror::Error;
use uuid::Uuid;

use crate::{
  activity::{ActivityEntry, ActivityQuery},
  history::{Comment, HistoryEntry},
  record::{RecordRef, RecordType},
  relationship::Relationship,
  store::{AuditStore, Insert},
  submission::{Submission, SubmissionDraft},
};

#[derive(Debug, Error)]
pub enum MemoryError {
  #[error("memory store lock poisoned")]
  Poisoned,
}

#[derive(Default)]
struct Inner {
  sequences:     HashMap<RecordType, u64>,
  submissions:   Vec<Submission>,
  relationships: Vec<Relationship>,
  history:       Vec<HistoryEntry>,
  comments:      Vec<Comment>,
  activity:      Vec<ActivityEntry>,
}

#[derive(Default)]
pub struct MemoryStore {
  inner: Mutex<Inner>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  fn lock(&self) -> Result<MutexGuard<'_, Inner>, MemoryError> {
    self.inner.lock().map_err(|_| MemoryError::Poisoned)
  }
}

/// Clone the rows matching `keep`, newest first. Rows later in `rows` win
/// ties on timestamp.
fn newest_first<T: Clone, K: Ord>(
  rows: &[T],
  keep: impl Fn(&T) -> bool,
  key: impl Fn(&T) -> K,
) -> Vec<T> {
  let mut out: Vec<T> = rows.iter().rev().filter(|r| keep(r)).cloned().collect();
  out.sort_by(|a, b| key(b).cmp(&key(a)));
  out
}

impl AuditStore for MemoryStore {
  type Error = MemoryError;

  async fn next_sequence(&self, record_type: RecordType) -> Result<u64, MemoryError> {
    let mut inner = self.lock()?;
    let counter = inner.sequences.entry(record_type).or_insert(0);
    *counter += 1;
    Ok(*counter)
  }

  async fn commit_submission(
    &self,
    draft: SubmissionDraft,
  ) -> Result<Insert<Submission>, MemoryError> {
    let mut inner = self.lock()?;
    if inner.submissions.iter().any(|s| s.item == draft.item) {
      return Ok(Insert::Conflict);
    }

    let record_type = draft.item.record_type;
    let next = inner.sequences.get(&record_type).copied().unwrap_or(0) + 1;
    let (submission, entry) = draft.complete(next);

    inner.sequences.insert(record_type, next);
    inner.submissions.push(submission.clone());
    inner.history.push(entry);
    Ok(Insert::Done(submission))
  }

  async fn get_submission(&self, item: RecordRef) -> Result<Option<Submission>, MemoryError> {
    let inner = self.lock()?;
    Ok(inner.submissions.iter().find(|s| s.item == item).cloned())
  }

  async fn insert_relationship(
    &self,
    relationship: Relationship,
    audit: Vec<HistoryEntry>,
  ) -> Result<Insert<()>, MemoryError> {
    let mut inner = self.lock()?;
    if inner
      .relationships
      .iter()
      .any(|r| r.joins(&relationship.source, &relationship.target))
    {
      return Ok(Insert::Conflict);
    }
    inner.relationships.push(relationship);
    inner.history.extend(audit);
    Ok(Insert::Done(()))
  }

  async fn get_relationship(&self, id: Uuid) -> Result<Option<Relationship>, MemoryError> {
    let inner = self.lock()?;
    Ok(
      inner
        .relationships
        .iter()
        .find(|r| r.relationship_id == id)
        .cloned(),
    )
  }

  async fn delete_relationship(
    &self,
    id: Uuid,
    audit: Vec<HistoryEntry>,
  ) -> Result<bool, MemoryError> {
    let mut inner = self.lock()?;
    let before = inner.relationships.len();
    inner.relationships.retain(|r| r.relationship_id != id);
    let removed = inner.relationships.len() != before;
    if removed {
      inner.history.extend(audit);
    }
    Ok(removed)
  }

  async fn relationships_from(&self, record: RecordRef) -> Result<Vec<Relationship>, MemoryError> {
    let inner = self.lock()?;
    Ok(
      inner
        .relationships
        .iter()
        .filter(|r| r.source == record)
        .cloned()
        .collect(),
    )
  }

  async fn relationships_to(&self, record: RecordRef) -> Result<Vec<Relationship>, MemoryError> {
    let inner = self.lock()?;
    Ok(
      inner
        .relationships
        .iter()
        .filter(|r| r.target == record)
        .cloned()
        .collect(),
    )
  }

  async fn append_history(&self, entry: HistoryEntry) -> Result<(), MemoryError> {
    self.lock()?.history.push(entry);
    Ok(())
  }

  async fn history_for(&self, item: RecordRef) -> Result<Vec<HistoryEntry>, MemoryError> {
    let inner = self.lock()?;
    Ok(newest_first(&inner.history, |h| h.item == item, |h| h.timestamp))
  }

  async fn append_comment(&self, comment: Comment) -> Result<(), MemoryError> {
    self.lock()?.comments.push(comment);
    Ok(())
  }

  async fn comments_for(&self, item: RecordRef) -> Result<Vec<Comment>, MemoryError> {
    let inner = self.lock()?;
    Ok(newest_first(&inner.comments, |c| c.item == item, |c| c.timestamp))
  }

  async fn append_activity(&self, entry: ActivityEntry) -> Result<(), MemoryError> {
    self.lock()?.activity.push(entry);
    Ok(())
  }

  async fn activity(&self, query: &ActivityQuery) -> Result<Vec<ActivityEntry>, MemoryError> {
    let inner = self.lock()?;
    let mut out = newest_first(&inner.activity, |e| query.matches(e), |e| e.timestamp);
    if let Some(limit) = query.limit {
      out.truncate(limit);
    }
    Ok(out)
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use serde_json::json;

  use super::*;
  use crate::identity::Actor;

  fn link(source: &RecordRef, target: &RecordRef) -> Relationship {
    Relationship {
      relationship_id: Uuid::new_v4(),
      source:          source.clone(),
      target:          target.clone(),
      created_at:      Utc::now(),
      created_by:      "u1".into(),
      project_id:      "P1".into(),
    }
  }

  #[tokio::test]
  async fn reverse_link_is_a_conflict() {
    let store = MemoryStore::new();
    let doc = RecordRef::new(RecordType::Document, "D1");
    let nc = RecordRef::new(RecordType::NonConformity, "N1");

    let first = store.insert_relationship(link(&doc, &nc), vec![]).await.unwrap();
    assert_eq!(first, Insert::Done(()));
    let second = store.insert_relationship(link(&nc, &doc), vec![]).await.unwrap();
    assert_eq!(second, Insert::Conflict);
    assert_eq!(store.relationships_to(doc).await.unwrap().len(), 0);
  }

  #[tokio::test]
  async fn duplicate_submission_keeps_counter() {
    let store = MemoryStore::new();
    let actor = Actor::new("u1", "Ana");
    let draft = || SubmissionDraft::new(&actor, RecordType::Rfi, json!({ "id": "R1" })).unwrap();

    assert!(matches!(store.commit_submission(draft()).await.unwrap(), Insert::Done(_)));
    assert_eq!(store.commit_submission(draft()).await.unwrap(), Insert::Conflict);
    assert_eq!(store.next_sequence(RecordType::Rfi).await.unwrap(), 2);
  }
}
