//! Error types for `obra-core`.

use thiserror::Error;

use crate::record::RecordRef;

#[derive(Debug, Error)]
pub enum Error {
  /// A write was attempted without an acting user.
  #[error("not authenticated")]
  NotAuthenticated,

  /// The backing store could not be reached or rejected the operation.
  #[error("backing store unavailable: {0}")]
  StoreUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("unknown record type: {0:?}")]
  UnknownRecordType(String),

  #[error("invalid record code: {0:?}")]
  InvalidRecordCode(String),

  #[error("invalid submission payload: {0}")]
  InvalidPayload(String),

  #[error("{0} was already submitted")]
  AlreadySubmitted(RecordRef),

  #[error("cannot relate {0} to itself")]
  SelfRelationship(RecordRef),

  #[error("{0} and {1} are already related")]
  AlreadyRelated(RecordRef, RecordRef),
}

impl Error {
  /// Wrap a backend error.
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::StoreUnavailable(Box::new(err))
  }

  /// Whether the failure may clear up on its own. Only read paths should be
  /// retried automatically; writes have no idempotency key. Conflicts are
  /// never transient.
  pub fn is_transient(&self) -> bool { matches!(self, Self::StoreUnavailable(_)) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
