//! [`Services`]: the five core services wired to one shared store.

use std::sync::Arc;

use crate::{
  activity::ActivityLog, codes::CodeGenerator, graph::RelationshipGraph,
  ledger::HistoryLedger, store::AuditStore, submission::SubmissionWorkflow,
};

/// Cloning is cheap: every service holds the same reference-counted store.
pub struct Services<S> {
  pub codes:       CodeGenerator<S>,
  pub ledger:      HistoryLedger<S>,
  pub graph:       RelationshipGraph<S>,
  pub submissions: SubmissionWorkflow<S>,
  pub activity:    ActivityLog<S>,
}

impl<S> Clone for Services<S> {
  fn clone(&self) -> Self {
    Self {
      codes:       self.codes.clone(),
      ledger:      self.ledger.clone(),
      graph:       self.graph.clone(),
      submissions: self.submissions.clone(),
      activity:    self.activity.clone(),
    }
  }
}

impl<S: AuditStore> Services<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self {
      codes:       CodeGenerator::new(store.clone()),
      ledger:      HistoryLedger::new(store.clone()),
      graph:       RelationshipGraph::new(store.clone()),
      submissions: SubmissionWorkflow::new(store.clone()),
      activity:    ActivityLog::new(store),
    }
  }
}
