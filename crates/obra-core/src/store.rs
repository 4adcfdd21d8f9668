//! The `AuditStore` trait: the backing-store port of the core.
//!
//! The trait is implemented by storage backends (e.g. `obra-store-sqlite`,
//! or [`crate::memory::MemoryStore`] for tests). The services in this crate
//! depend on the abstraction only.

use std::future::Future;

use uuid::Uuid;

use crate::{
  activity::{ActivityEntry, ActivityQuery},
  history::{Comment, HistoryEntry},
  record::{RecordRef, RecordType},
  relationship::Relationship,
  submission::{Submission, SubmissionDraft},
};

/// Outcome of a write that a uniqueness rule may refuse.
///
/// A refusal is part of the domain, not a backend failure: the caller maps
/// it to a typed conflict instead of retrying.
#[derive(Debug, Clone, PartialEq)]
pub enum Insert<T> {
  Done(T),
  /// An equivalent row already exists. Nothing was written.
  Conflict,
}

/// Abstraction over the persistence of relationships, history, comments,
/// submissions, code sequences and the activity log.
///
/// History, comments and activity entries are append-only: no method updates
/// or deletes them. Relationship rows are inserted and hard-deleted, never
/// updated.
///
/// Methods that take several rows (`insert_relationship`,
/// `delete_relationship`, `commit_submission`) must apply them atomically.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait AuditStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Code sequences ────────────────────────────────────────────────────

  /// Atomically increment and return the counter for `record_type`. The
  /// first call for a type returns 1.
  fn next_sequence(
    &self,
    record_type: RecordType,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Submissions ───────────────────────────────────────────────────────

  /// In one transaction: allocate the next sequence for the draft's record
  /// type, complete the draft with it, persist the submission and append
  /// its `create` history entry.
  ///
  /// Returns [`Insert::Conflict`] without consuming a sequence value when the
  /// draft's record was already submitted. The check and the write must not
  /// interleave with another commit.
  fn commit_submission(
    &self,
    draft: SubmissionDraft,
  ) -> impl Future<Output = Result<Insert<Submission>, Self::Error>> + Send + '_;

  fn get_submission(
    &self,
    item: RecordRef,
  ) -> impl Future<Output = Result<Option<Submission>, Self::Error>> + Send + '_;

  // ── Relationships ─────────────────────────────────────────────────────

  /// Persist `relationship` together with the `audit` entries recording it.
  ///
  /// Returns [`Insert::Conflict`] and writes nothing if the two endpoints are
  /// already linked in either direction. The check and the write must not
  /// interleave with another insert.
  fn insert_relationship(
    &self,
    relationship: Relationship,
    audit: Vec<HistoryEntry>,
  ) -> impl Future<Output = Result<Insert<()>, Self::Error>> + Send + '_;

  fn get_relationship(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Relationship>, Self::Error>> + Send + '_;

  /// Delete relationship `id`. The `audit` entries are appended only if a
  /// row was actually removed. Returns whether it was.
  fn delete_relationship(
    &self,
    id: Uuid,
    audit: Vec<HistoryEntry>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Relationships whose `source` is `record`, oldest first.
  fn relationships_from(
    &self,
    record: RecordRef,
  ) -> impl Future<Output = Result<Vec<Relationship>, Self::Error>> + Send + '_;

  /// Relationships whose `target` is `record`, oldest first.
  fn relationships_to(
    &self,
    record: RecordRef,
  ) -> impl Future<Output = Result<Vec<Relationship>, Self::Error>> + Send + '_;

  // ── History & comments ────────────────────────────────────────────────

  fn append_history(
    &self,
    entry: HistoryEntry,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// All history for `item`, newest first.
  fn history_for(
    &self,
    item: RecordRef,
  ) -> impl Future<Output = Result<Vec<HistoryEntry>, Self::Error>> + Send + '_;

  fn append_comment(
    &self,
    comment: Comment,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// All comments on `item`, newest first.
  fn comments_for(
    &self,
    item: RecordRef,
  ) -> impl Future<Output = Result<Vec<Comment>, Self::Error>> + Send + '_;

  // ── Activity log ──────────────────────────────────────────────────────

  fn append_activity(
    &self,
    entry: ActivityEntry,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Entries matching `query` (see [`ActivityQuery::matches`]), newest
  /// first, truncated to `query.limit`.
  fn activity<'a>(
    &'a self,
    query: &'a ActivityQuery,
  ) -> impl Future<Output = Result<Vec<ActivityEntry>, Self::Error>> + Send + 'a;
}
