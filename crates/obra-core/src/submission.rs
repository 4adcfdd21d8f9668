//! Submission workflow: the composite first write for a new business record.
//!
//! Submitting assigns a record code, an initial state and a `create` history
//! entry. The store applies all three in one transaction, so a failure
//! leaves no trace: no consumed sequence number, no payload, no history.

use std::sync::Arc;

use chrono::{DateTime, Datelike as _, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{
  Error, Result,
  codes::RecordCode,
  history::{Action, Change, HistoryEntry},
  identity::Actor,
  record::{RecordRef, RecordType},
  store::{AuditStore, Insert},
};

/// Payload key holding the record code.
pub const CODE_KEY: &str = "codigo";
/// Payload key holding the record state label.
pub const STATE_KEY: &str = "estado";
pub const SUBMITTED_AT_KEY: &str = "dataSubmissao";
pub const SUBMITTED_BY_KEY: &str = "submittedBy";

// ─── Submission ──────────────────────────────────────────────────────────────

/// A prepared record payload, as produced by [`SubmissionWorkflow`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
  pub item:         RecordRef,
  #[serde(with = "code_as_string")]
  pub code:         RecordCode,
  pub state:        String,
  pub submitted_at: DateTime<Utc>,
  pub submitted_by: String,
  /// The caller's fields merged with the assigned code, state, timestamp
  /// and submitter.
  pub payload:      Value,
}

mod code_as_string {
  use serde::{Deserialize as _, Deserializer, Serializer, de::Error as _};

  use crate::codes::RecordCode;

  pub fn serialize<S: Serializer>(code: &RecordCode, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(code)
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<RecordCode, D::Error> {
    let raw = String::deserialize(d)?;
    RecordCode::parse(&raw).map_err(D::Error::custom)
  }
}

// ─── Draft ───────────────────────────────────────────────────────────────────

/// Everything needed to complete a submission except its sequence number,
/// which only the store can allocate.
#[derive(Debug, Clone)]
pub struct SubmissionDraft {
  pub actor:        Actor,
  pub item:         RecordRef,
  pub data:         Map<String, Value>,
  pub submitted_at: DateTime<Utc>,
}

impl SubmissionDraft {
  /// Validate `data` and resolve the record id: `data.id` when it is a
  /// non-empty string, otherwise a fresh UUID.
  pub fn new(actor: &Actor, record_type: RecordType, data: Value) -> Result<Self> {
    let Value::Object(mut data) = data else {
      return Err(Error::InvalidPayload("record data must be a JSON object".into()));
    };

    let id = match data.get("id") {
      Some(Value::String(id)) if !id.trim().is_empty() => id.clone(),
      Some(Value::String(_)) | None | Some(Value::Null) => {
        let id = Uuid::new_v4().to_string();
        data.insert("id".into(), Value::String(id.clone()));
        id
      }
      Some(other) => {
        return Err(Error::InvalidPayload(format!(
          "record id must be a string, got {other}"
        )));
      }
    };

    Ok(Self {
      actor: actor.clone(),
      item: RecordRef::new(record_type, id),
      data,
      submitted_at: Utc::now(),
    })
  }

  /// Finish the draft with the allocated `sequence`, yielding the submission
  /// and its `create` history entry.
  pub fn complete(self, sequence: u64) -> (Submission, HistoryEntry) {
    let record_type = self.item.record_type;
    let code = RecordCode::new(record_type, self.submitted_at.year(), sequence);
    let state = record_type.initial_state();

    let mut payload = self.data;
    payload.insert(CODE_KEY.into(), Value::String(code.to_string()));
    payload.insert(STATE_KEY.into(), Value::String(state.into()));
    payload.insert(
      SUBMITTED_AT_KEY.into(),
      Value::String(self.submitted_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    payload.insert(SUBMITTED_BY_KEY.into(), Value::String(self.actor.id.clone()));

    let entry = HistoryEntry::new(
      &self.actor,
      self.item.clone(),
      Action::Create,
      vec![
        Change::set(CODE_KEY, code.to_string()),
        Change::set(STATE_KEY, state),
      ],
      self.submitted_at,
    );

    let submission = Submission {
      item: self.item,
      code,
      state: state.to_owned(),
      submitted_at: self.submitted_at,
      submitted_by: self.actor.id,
      payload: Value::Object(payload),
    };

    (submission, entry)
  }
}

// ─── Workflow ────────────────────────────────────────────────────────────────

pub struct SubmissionWorkflow<S> {
  store: Arc<S>,
}

impl<S> Clone for SubmissionWorkflow<S> {
  fn clone(&self) -> Self { Self { store: self.store.clone() } }
}

impl<S: AuditStore> SubmissionWorkflow<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// The fixed state label a new record of `record_type` starts in.
  pub fn initial_state(record_type: RecordType) -> &'static str {
    record_type.initial_state()
  }

  /// Assign a code and initial state to a new record and write its first
  /// history entry.
  pub async fn submit_record(
    &self,
    actor: Option<&Actor>,
    record_type: RecordType,
    data: Value,
  ) -> Result<Submission> {
    let actor = actor.ok_or(Error::NotAuthenticated)?;
    let draft = SubmissionDraft::new(actor, record_type, data)?;

    if self
      .store
      .get_submission(draft.item.clone())
      .await
      .map_err(Error::store)?
      .is_some()
    {
      return Err(Error::AlreadySubmitted(draft.item));
    }

    let item = draft.item.clone();
    let submission = match self
      .store
      .commit_submission(draft)
      .await
      .map_err(Error::store)?
    {
      Insert::Done(submission) => submission,
      Insert::Conflict => return Err(Error::AlreadySubmitted(item)),
    };

    tracing::info!(
      item = %submission.item,
      code = %submission.code,
      user = %actor.id,
      "record submitted"
    );
    Ok(submission)
  }

  /// The payload recorded when `item` was submitted, if it was.
  pub async fn get_submission(&self, item: RecordRef) -> Result<Option<Submission>> {
    self.store.get_submission(item).await.map_err(Error::store)
  }
}
