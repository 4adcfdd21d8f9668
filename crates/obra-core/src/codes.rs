//! Record codes (`NC-2024-003`) and the generator that mints them.
//!
//! The per-type counter lives in the backing store so that it survives
//! restarts and is shared between server instances. It is never reset when
//! the calendar year changes; the year in the code is informational.

use std::{fmt, str::FromStr, sync::Arc};

use chrono::{Datelike as _, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, record::RecordType, store::AuditStore};

// ─── RecordCode ──────────────────────────────────────────────────────────────

/// A human-readable, sequentially assigned record identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordCode {
  pub record_type: RecordType,
  pub year:        i32,
  pub sequence:    u64,
}

impl RecordCode {
  pub fn new(record_type: RecordType, year: i32, sequence: u64) -> Self {
    Self { record_type, year, sequence }
  }

  /// Parse `PREFIX-YEAR-NNN`. The sequence must have at least three digits.
  pub fn parse(s: &str) -> Result<Self> {
    let invalid = || Error::InvalidRecordCode(s.to_owned());

    let mut parts = s.splitn(3, '-');
    let (Some(prefix), Some(year), Some(seq)) =
      (parts.next(), parts.next(), parts.next())
    else {
      return Err(invalid());
    };

    let record_type = RecordType::from_code_prefix(prefix).ok_or_else(invalid)?;
    if year.len() != 4 || seq.len() < 3 {
      return Err(invalid());
    }
    if !year.bytes().chain(seq.bytes()).all(|b| b.is_ascii_digit()) {
      return Err(invalid());
    }
    let year = year.parse().map_err(|_| invalid())?;
    let sequence = seq.parse().map_err(|_| invalid())?;

    Ok(Self { record_type, year, sequence })
  }
}

impl fmt::Display for RecordCode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{}-{:04}-{:03}",
      self.record_type.code_prefix(),
      self.year,
      self.sequence
    )
  }
}

impl FromStr for RecordCode {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> { Self::parse(s) }
}

// ─── Generator ───────────────────────────────────────────────────────────────

/// Mints codes from the store's per-type sequence.
pub struct CodeGenerator<S> {
  store: Arc<S>,
}

impl<S> Clone for CodeGenerator<S> {
  fn clone(&self) -> Self { Self { store: self.store.clone() } }
}

impl<S: AuditStore> CodeGenerator<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Advance the counter for `record_type` by one and render the new code
  /// with the current calendar year.
  pub async fn generate(&self, record_type: RecordType) -> Result<RecordCode> {
    let sequence = self
      .store
      .next_sequence(record_type)
      .await
      .map_err(Error::store)?;
    let code = RecordCode::new(record_type, Utc::now().year(), sequence);
    tracing::debug!(%code, "generated record code");
    Ok(code)
  }
}
