//! Record references: the `(type, id)` pairs the core links and audits.
//!
//! Business records themselves (their fields, their storage) belong to the
//! surrounding application. The core only ever sees a [`RecordRef`].

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

// ─── RecordType ──────────────────────────────────────────────────────────────

/// The closed set of business record kinds managed per project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
  Document,
  Test,
  Material,
  #[serde(rename = "nc", alias = "nonConformity")]
  NonConformity,
  Checklist,
  Rfi,
}

impl RecordType {
  pub const ALL: [Self; 6] = [
    Self::Document,
    Self::Test,
    Self::Material,
    Self::NonConformity,
    Self::Checklist,
    Self::Rfi,
  ];

  /// The wire name. Must match the serde renames above.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Document => "document",
      Self::Test => "test",
      Self::Material => "material",
      Self::NonConformity => "nc",
      Self::Checklist => "checklist",
      Self::Rfi => "rfi",
    }
  }

  /// Prefix of the human-readable record code, e.g. `ENS` in `ENS-2024-007`.
  pub fn code_prefix(self) -> &'static str {
    match self {
      Self::Document => "DOC",
      Self::Test => "ENS",
      Self::Material => "MAT",
      Self::NonConformity => "NC",
      Self::Checklist => "CKL",
      Self::Rfi => "RFI",
    }
  }

  /// Inverse of [`RecordType::code_prefix`].
  pub fn from_code_prefix(prefix: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|t| t.code_prefix() == prefix)
  }

  /// The state label a freshly submitted record starts in.
  pub fn initial_state(self) -> &'static str {
    match self {
      Self::Document => "Rascunho",
      Self::Test => "Agendado",
      Self::Material => "Pendente",
      Self::NonConformity => "Aberta",
      Self::Checklist => "Pendente",
      Self::Rfi => "Submetido",
    }
  }
}

impl fmt::Display for RecordType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for RecordType {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "document" => Ok(Self::Document),
      "test" => Ok(Self::Test),
      "material" => Ok(Self::Material),
      "nc" | "nonConformity" => Ok(Self::NonConformity),
      "checklist" => Ok(Self::Checklist),
      "rfi" => Ok(Self::Rfi),
      other => Err(Error::UnknownRecordType(other.to_owned())),
    }
  }
}

// ─── RecordRef ───────────────────────────────────────────────────────────────

/// A pointer to one business record. `id` is opaque and unique within its
/// type only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordRef {
  #[serde(rename = "type")]
  pub record_type: RecordType,
  pub id:          String,
}

impl RecordRef {
  pub fn new(record_type: RecordType, id: impl Into<String>) -> Self {
    Self { record_type, id: id.into() }
  }
}

impl fmt::Display for RecordRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}", self.record_type, self.id)
  }
}
