//! The acting user. Authentication happens upstream; the core only needs to
//! know who (if anyone) is performing a write.

use serde::{Deserialize, Serialize};

/// Access level of a user within the application.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Admin,
  Fiscal,
  #[default]
  Viewer,
}

impl Role {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Admin => "admin",
      Self::Fiscal => "fiscal",
      Self::Viewer => "viewer",
    }
  }
}

/// An authenticated user on whose behalf a write is made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
  pub id:   String,
  pub name: String,
  #[serde(default)]
  pub role: Role,
}

impl Actor {
  pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
    Self { id: id.into(), name: name.into(), role: Role::default() }
  }

  pub fn with_role(mut self, role: Role) -> Self {
    self.role = role;
    self
  }
}

/// The project ("obra") a user is currently working in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectContext {
  pub id:   String,
  pub name: Option<String>,
}
