//! Relationship: an undirected link between two records.
//!
//! Each link is stored once, with whichever side the user picked first as
//! `source`. Reads treat both sides equally; see [`crate::graph`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::RecordRef;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
  pub relationship_id: Uuid,
  pub source:          RecordRef,
  pub target:          RecordRef,
  pub created_at:      DateTime<Utc>,
  /// Id of the user who created the link.
  pub created_by:      String,
  pub project_id:      String,
}

impl Relationship {
  /// Whether `record` is either endpoint.
  pub fn touches(&self, record: &RecordRef) -> bool {
    &self.source == record || &self.target == record
  }

  /// The endpoint opposite `record`, or `None` if `record` is not on this
  /// link. For a self-link both ends are the same record.
  pub fn other_end(&self, record: &RecordRef) -> Option<&RecordRef> {
    if &self.source == record {
      Some(&self.target)
    } else if &self.target == record {
      Some(&self.source)
    } else {
      None
    }
  }

  /// Whether this link joins `a` and `b`, in either direction.
  pub fn joins(&self, a: &RecordRef, b: &RecordRef) -> bool {
    (&self.source == a && &self.target == b)
      || (&self.source == b && &self.target == a)
  }
}

/// Input to [`crate::graph::RelationshipGraph::add_relationship`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRelationship {
  pub source:     RecordRef,
  pub target:     RecordRef,
  pub project_id: String,
}
