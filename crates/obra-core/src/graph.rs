//! Relationship graph: symmetric links between records.
//!
//! A link is stored as a single directed row. Reads go through both
//! directions: rows where the record is the source contribute their target,
//! rows where it is the target contribute their source. Never store a
//! mirrored second row; the two could diverge.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
  Error, Result,
  history::{Action, Change, HistoryEntry},
  identity::Actor,
  record::RecordRef,
  relationship::{NewRelationship, Relationship},
  store::{AuditStore, Insert},
};

/// History field under which link changes are recorded.
pub const RELATIONSHIPS_FIELD: &str = "relationships";

pub struct RelationshipGraph<S> {
  store: Arc<S>,
}

impl<S> Clone for RelationshipGraph<S> {
  fn clone(&self) -> Self { Self { store: self.store.clone() } }
}

impl<S: AuditStore> RelationshipGraph<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Link two records. Both endpoints gain an `update` history entry in the
  /// same write.
  ///
  /// Fails with [`Error::SelfRelationship`] for a record linked to itself and
  /// [`Error::AlreadyRelated`] if the pair is linked in either direction.
  pub async fn add_relationship(
    &self,
    actor: Option<&Actor>,
    input: NewRelationship,
  ) -> Result<Relationship> {
    let actor = actor.ok_or(Error::NotAuthenticated)?;
    let NewRelationship { source, target, project_id } = input;

    if source == target {
      return Err(Error::SelfRelationship(source));
    }
    if self
      .get_relationships(source.clone())
      .await?
      .iter()
      .any(|r| r.joins(&source, &target))
    {
      return Err(Error::AlreadyRelated(source, target));
    }

    let now = Utc::now();
    let relationship = Relationship {
      relationship_id: Uuid::new_v4(),
      source,
      target,
      created_at: now,
      created_by: actor.id.clone(),
      project_id,
    };
    let audit = link_audit(actor, &relationship, "Added", now);

    let inserted = self
      .store
      .insert_relationship(relationship.clone(), audit)
      .await
      .map_err(Error::store)?;
    if inserted == Insert::Conflict {
      return Err(Error::AlreadyRelated(relationship.source, relationship.target));
    }

    tracing::info!(
      id = %relationship.relationship_id,
      source = %relationship.source,
      target = %relationship.target,
      user = %actor.id,
      "relationship added"
    );
    Ok(relationship)
  }

  /// Unlink by relationship id. Removing an unknown id is a no-op, so a
  /// repeated call leaves the same state as a single one. Returns the link
  /// this call removed, if any.
  pub async fn remove_relationship(
    &self,
    actor: Option<&Actor>,
    id: Uuid,
  ) -> Result<Option<Relationship>> {
    let actor = actor.ok_or(Error::NotAuthenticated)?;

    let Some(relationship) = self
      .store
      .get_relationship(id)
      .await
      .map_err(Error::store)?
    else {
      tracing::debug!(%id, "relationship already absent");
      return Ok(None);
    };

    let audit = link_audit(actor, &relationship, "Removed", Utc::now());
    let removed = self
      .store
      .delete_relationship(id, audit)
      .await
      .map_err(Error::store)?;

    if !removed {
      return Ok(None);
    }
    tracing::info!(%id, user = %actor.id, "relationship removed");
    Ok(Some(relationship))
  }

  /// Records linked to `record`, from either side. Links where `record` is
  /// the source come first, each side oldest first.
  pub async fn get_related_items(&self, record: RecordRef) -> Result<Vec<RecordRef>> {
    let outgoing = self
      .store
      .relationships_from(record.clone())
      .await
      .map_err(Error::store)?;
    let incoming = self
      .store
      .relationships_to(record.clone())
      .await
      .map_err(Error::store)?;

    Ok(
      outgoing
        .iter()
        .chain(&incoming)
        .filter_map(|r| r.other_end(&record))
        .cloned()
        .collect(),
    )
  }

  /// Full relationship rows touching `record`, from either side.
  pub async fn get_relationships(&self, record: RecordRef) -> Result<Vec<Relationship>> {
    let mut rows = self
      .store
      .relationships_from(record.clone())
      .await
      .map_err(Error::store)?;
    let incoming = self
      .store
      .relationships_to(record)
      .await
      .map_err(Error::store)?;

    // A legacy self-link shows up on both sides; keep it once.
    let incoming: Vec<Relationship> = incoming
      .into_iter()
      .filter(|r| !rows.iter().any(|o| o.relationship_id == r.relationship_id))
      .collect();
    rows.extend(incoming);
    Ok(rows)
  }
}

/// One `update` entry per endpoint, each naming the opposite endpoint.
fn link_audit(
  actor: &Actor,
  relationship: &Relationship,
  verb: &str,
  at: chrono::DateTime<Utc>,
) -> Vec<HistoryEntry> {
  let entry = |item: &RecordRef, other: &RecordRef| {
    HistoryEntry::new(
      actor,
      item.clone(),
      Action::Update,
      vec![Change::set(
        RELATIONSHIPS_FIELD,
        format!("{verb} relationship with {other}"),
      )],
      at,
    )
  };
  vec![
    entry(&relationship.source, &relationship.target),
    entry(&relationship.target, &relationship.source),
  ]
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{ledger::HistoryLedger, memory::MemoryStore, record::RecordType};

  struct Fixture {
    graph:  RelationshipGraph<MemoryStore>,
    ledger: HistoryLedger<MemoryStore>,
    actor:  Actor,
  }

  fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    Fixture {
      graph:  RelationshipGraph::new(store.clone()),
      ledger: HistoryLedger::new(store),
      actor:  Actor::new("u1", "João Silva"),
    }
  }

  fn link(source: &RecordRef, target: &RecordRef) -> NewRelationship {
    NewRelationship {
      source:     source.clone(),
      target:     target.clone(),
      project_id: "P1".into(),
    }
  }

  fn doc() -> RecordRef { RecordRef::new(RecordType::Document, "DOC-1") }

  fn nc() -> RecordRef { RecordRef::new(RecordType::NonConformity, "NC-1") }

  #[tokio::test]
  async fn document_to_nc_is_visible_from_both_sides() {
    let f = fixture();
    f.graph.add_relationship(Some(&f.actor), link(&doc(), &nc())).await.unwrap();

    assert_eq!(f.graph.get_related_items(nc()).await.unwrap(), vec![doc()]);
    assert_eq!(f.graph.get_related_items(doc()).await.unwrap(), vec![nc()]);

    let doc_history = f.ledger.get_history(doc()).await.unwrap();
    let nc_history = f.ledger.get_history(nc()).await.unwrap();
    assert_eq!(doc_history.len(), 1);
    assert_eq!(nc_history.len(), 1);
    assert_eq!(doc_history[0].action, Action::Update);
    assert_eq!(doc_history[0].changes[0].field, RELATIONSHIPS_FIELD);
    assert_eq!(nc_history[0].changes[0].new_value, "Added relationship with document DOC-1");
    assert_eq!(doc_history[0].changes[0].new_value, "Added relationship with nc NC-1");
  }

  #[tokio::test]
  async fn related_items_union_both_directions() {
    let f = fixture();
    let material = RecordRef::new(RecordType::Material, "M1");
    let test = RecordRef::new(RecordType::Test, "T1");

    f.graph.add_relationship(Some(&f.actor), link(&material, &test)).await.unwrap();
    f.graph.add_relationship(Some(&f.actor), link(&nc(), &material)).await.unwrap();
    f.graph.add_relationship(Some(&f.actor), link(&material, &doc())).await.unwrap();

    let related = f.graph.get_related_items(material.clone()).await.unwrap();
    assert_eq!(related, vec![test, doc(), nc()]);

    let rows = f.graph.get_relationships(material.clone()).await.unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.touches(&material)));
    assert!(rows.iter().all(|r| r.project_id == "P1" && r.created_by == "u1"));
  }

  #[tokio::test]
  async fn unauthenticated_link_writes_nothing() {
    let f = fixture();
    let err = f.graph.add_relationship(None, link(&doc(), &nc())).await.unwrap_err();
    assert!(matches!(err, Error::NotAuthenticated));

    assert!(f.graph.get_relationships(doc()).await.unwrap().is_empty());
    assert!(f.ledger.get_history(doc()).await.unwrap().is_empty());
    assert!(f.ledger.get_history(nc()).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn self_and_duplicate_links_are_rejected() {
    let f = fixture();

    let err = f.graph.add_relationship(Some(&f.actor), link(&doc(), &doc())).await.unwrap_err();
    assert!(matches!(err, Error::SelfRelationship(_)));

    f.graph.add_relationship(Some(&f.actor), link(&doc(), &nc())).await.unwrap();
    let err = f.graph.add_relationship(Some(&f.actor), link(&nc(), &doc())).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyRelated(_, _)));
    assert_eq!(f.graph.get_relationships(doc()).await.unwrap().len(), 1);
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn concurrent_links_in_both_directions_store_one_row() {
    let f = fixture();

    let handles: Vec<_> = (0..8)
      .map(|i| {
        let graph = f.graph.clone();
        let actor = f.actor.clone();
        let input = if i % 2 == 0 { link(&doc(), &nc()) } else { link(&nc(), &doc()) };
        tokio::spawn(async move { graph.add_relationship(Some(&actor), input).await })
      })
      .collect();

    let mut linked = 0;
    for h in handles {
      match h.await.unwrap() {
        Ok(_) => linked += 1,
        Err(err) => assert!(matches!(err, Error::AlreadyRelated(_, _)), "{err:?}"),
      }
    }
    assert_eq!(linked, 1);
    assert_eq!(f.graph.get_related_items(doc()).await.unwrap(), vec![nc()]);
    assert_eq!(f.ledger.get_history(nc()).await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn removal_is_idempotent() {
    let f = fixture();
    let kept = f
      .graph
      .add_relationship(Some(&f.actor), link(&doc(), &RecordRef::new(RecordType::Rfi, "R1")))
      .await
      .unwrap();
    let gone = f.graph.add_relationship(Some(&f.actor), link(&doc(), &nc())).await.unwrap();

    let removed = f.graph.remove_relationship(Some(&f.actor), gone.relationship_id).await.unwrap();
    assert_eq!(removed.as_ref(), Some(&gone));
    let after_once = f.graph.get_relationships(doc()).await.unwrap();
    let history_once = f.ledger.get_history(nc()).await.unwrap();

    let again = f.graph.remove_relationship(Some(&f.actor), gone.relationship_id).await.unwrap();
    assert!(again.is_none());
    assert_eq!(f.graph.get_relationships(doc()).await.unwrap(), after_once);
    assert_eq!(f.ledger.get_history(nc()).await.unwrap(), history_once);

    assert_eq!(after_once, vec![kept]);
    assert!(f.graph.get_related_items(nc()).await.unwrap().is_empty());
    assert_eq!(history_once.len(), 2);
    assert_eq!(history_once[0].changes[0].new_value, "Removed relationship with document DOC-1");
  }

  #[tokio::test]
  async fn removing_unknown_id_is_a_no_op() {
    let f = fixture();
    let removed = f.graph.remove_relationship(Some(&f.actor), Uuid::new_v4()).await.unwrap();
    assert!(removed.is_none());
  }

  #[tokio::test]
  async fn removal_requires_actor() {
    let f = fixture();
    let rel = f.graph.add_relationship(Some(&f.actor), link(&doc(), &nc())).await.unwrap();
    let err = f.graph.remove_relationship(None, rel.relationship_id).await.unwrap_err();
    assert!(matches!(err, Error::NotAuthenticated));
    assert_eq!(f.graph.get_related_items(doc()).await.unwrap(), vec![nc()]);
  }
}
