//! Caller identity — who is asking, threaded explicitly through every call.
//!
//! Authorization decisions never read ambient state. Every store operation
//! takes a [`Caller`], built by the API layer from the verified identity
//! claim, so the decision for a given call is a pure function of its inputs.

use serde::{Deserialize, Serialize};

/// The closed set of roles recognised by the authorization rules.
///
/// Mirrored by a CHECK constraint on `users.role`; adding a variant here
/// requires a schema migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
  Public,
  Admin,
  PolicyWorkingGroup,
}

impl Role {
  /// Roles allowed to manage drafts and suggestions (the admin dashboard).
  pub fn is_manager(self) -> bool {
    matches!(self, Role::Admin | Role::PolicyWorkingGroup)
  }
}

/// A verified identity: the subject id issued by the external identity
/// provider, the claimed email, and the role resolved from the `users` table
/// at request time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  /// Primary key of the `users` row — the provider's subject id, not a
  /// locally generated one.
  pub user_id: String,
  pub email:   String,
  pub role:    Role,
}

/// The requesting principal for a store operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
  /// No identity claim was presented. Passes only the explicitly public
  /// predicates (approved-document reads, suggestion inserts).
  Anonymous,
  /// An authenticated end user.
  User(Identity),
  /// The privileged backend-internal execution mode. Bypasses every
  /// authorization predicate, though operations keyed to an owning email
  /// (review submission) still demand a user identity. Must never be
  /// constructed from request data.
  Service,
}

impl Caller {
  pub fn user(user_id: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
    Caller::User(Identity {
      user_id: user_id.into(),
      email:   email.into(),
      role,
    })
  }

  /// The caller's role, if it has one. `Service` has no role — it is not
  /// identity-bound.
  pub fn role(&self) -> Option<Role> {
    match self {
      Caller::User(id) => Some(id.role),
      _ => None,
    }
  }

  pub fn email(&self) -> Option<&str> {
    match self {
      Caller::User(id) => Some(&id.email),
      _ => None,
    }
  }

  pub fn user_id(&self) -> Option<&str> {
    match self {
      Caller::User(id) => Some(&id.user_id),
      _ => None,
    }
  }

  pub fn is_authenticated(&self) -> bool {
    matches!(self, Caller::User(_) | Caller::Service)
  }

  pub fn is_service(&self) -> bool {
    matches!(self, Caller::Service)
  }
}
