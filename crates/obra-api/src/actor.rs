//! [`CurrentUser`] extractor.
//!
//! Authentication happens in front of this API; the upstream layer forwards
//! the verified identity as plain headers. A request without `x-user-id`
//! carries no actor and every write it attempts fails with 401.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, request::Parts},
};
use obra_core::identity::{Actor, ProjectContext, Role};

use crate::error::ApiError;

pub const USER_ID: &str = "x-user-id";
pub const USER_NAME: &str = "x-user-name";
pub const USER_ROLE: &str = "x-user-role";
pub const PROJECT_ID: &str = "x-project-id";
pub const PROJECT_NAME: &str = "x-project-name";

/// The acting user and project, as forwarded by the auth layer.
#[derive(Debug, Clone, Default)]
pub struct CurrentUser {
  pub actor:   Option<Actor>,
  pub project: Option<ProjectContext>,
}

impl CurrentUser {
  pub fn actor(&self) -> Option<&Actor> { self.actor.as_ref() }

  pub fn project(&self) -> Option<&ProjectContext> { self.project.as_ref() }

  pub fn from_headers(headers: &HeaderMap) -> Result<Self, ApiError> {
    let actor = match header(headers, USER_ID)? {
      Some(id) => {
        let name = header(headers, USER_NAME)?.unwrap_or_else(|| id.clone());
        let role = match header(headers, USER_ROLE)? {
          Some(r) => parse_role(&r)?,
          None => Role::default(),
        };
        Some(Actor::new(id, name).with_role(role))
      }
      None => None,
    };

    let project = match header(headers, PROJECT_ID)? {
      Some(id) => Some(ProjectContext { id, name: header(headers, PROJECT_NAME)? }),
      None => None,
    };

    Ok(Self { actor, project })
  }
}

fn header(headers: &HeaderMap, name: &str) -> Result<Option<String>, ApiError> {
  let Some(value) = headers.get(name) else {
    return Ok(None);
  };
  let value = value
    .to_str()
    .map_err(|_| ApiError::BadRequest(format!("{name} is not valid text")))?
    .trim();
  Ok((!value.is_empty()).then(|| value.to_owned()))
}

fn parse_role(s: &str) -> Result<Role, ApiError> {
  match s.to_ascii_lowercase().as_str() {
    "admin" => Ok(Role::Admin),
    "fiscal" => Ok(Role::Fiscal),
    "viewer" => Ok(Role::Viewer),
    other => Err(ApiError::BadRequest(format!("unknown role {other:?}"))),
  }
}

impl<St> FromRequestParts<St> for CurrentUser
where
  St: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &St,
  ) -> Result<Self, Self::Rejection> {
    Self::from_headers(&parts.headers)
  }
}
