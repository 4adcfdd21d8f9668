//! History ledger: per-record audit trail and comments.
//!
//! Every write entry point requires an acting user and fails with
//! [`Error::NotAuthenticated`] without one; nothing is written under a
//! made-up identity.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
  Error, Result,
  history::{Action, Change, Comment, HistoryEntry, TimelineEntry, merge_timeline},
  identity::Actor,
  record::RecordRef,
  store::AuditStore,
};

/// The audit-logging port business services depend on.
pub struct HistoryLedger<S> {
  store: Arc<S>,
}

impl<S> Clone for HistoryLedger<S> {
  fn clone(&self) -> Self { Self { store: self.store.clone() } }
}

impl<S: AuditStore> HistoryLedger<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Append one history entry for `item`, stamped now and attributed to
  /// `actor`. Visible to [`HistoryLedger::get_history`] immediately.
  pub async fn add_history_item(
    &self,
    actor: Option<&Actor>,
    item: RecordRef,
    action: Action,
    changes: Vec<Change>,
  ) -> Result<HistoryEntry> {
    let actor = actor.ok_or(Error::NotAuthenticated)?;
    let entry = HistoryEntry::new(actor, item, action, changes, Utc::now());

    self
      .store
      .append_history(entry.clone())
      .await
      .map_err(Error::store)?;
    tracing::info!(
      item = %entry.item,
      action = entry.action.as_str(),
      user = %actor.id,
      "history entry appended"
    );
    Ok(entry)
  }

  /// Append a comment to `item`. Content is stored as given; rejecting blank
  /// comments is up to the caller.
  pub async fn add_comment(
    &self,
    actor: Option<&Actor>,
    item: RecordRef,
    content: impl Into<String>,
  ) -> Result<Comment> {
    let actor = actor.ok_or(Error::NotAuthenticated)?;
    let comment = Comment {
      comment_id: Uuid::new_v4(),
      item,
      user_id: actor.id.clone(),
      user_name: actor.name.clone(),
      content: content.into(),
      timestamp: Utc::now(),
    };

    self
      .store
      .append_comment(comment.clone())
      .await
      .map_err(Error::store)?;
    tracing::info!(item = %comment.item, user = %actor.id, "comment added");
    Ok(comment)
  }

  /// History of `item`, newest first.
  pub async fn get_history(&self, item: RecordRef) -> Result<Vec<HistoryEntry>> {
    tracing::debug!(%item, "loading history");
    self.store.history_for(item).await.map_err(Error::store)
  }

  /// Comments on `item`, newest first.
  pub async fn get_comments(&self, item: RecordRef) -> Result<Vec<Comment>> {
    self.store.comments_for(item).await.map_err(Error::store)
  }

  /// History and comments of `item` merged into one newest-first timeline.
  pub async fn timeline(&self, item: RecordRef) -> Result<Vec<TimelineEntry>> {
    let history = self.get_history(item.clone()).await?;
    let comments = self.get_comments(item).await?;
    Ok(merge_timeline(history, comments))
  }
}
