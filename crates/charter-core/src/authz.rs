//! Row-level authorization rules.
//!
//! Each table has a small set of pure predicates, one per operation kind,
//! OR-composed: a caller need only satisfy one applicable predicate. The
//! predicates take the caller and the minimal row context they inspect (a
//! document's status, a review's owner email), so every decision is a pure
//! function — unit-testable with no database in sight.
//!
//! [`Caller::Service`] bypasses the entire rule set. It is the privileged
//! backend-internal execution mode and is never built from request data.

use std::fmt;

use crate::{
  error::{Error, Result},
  identity::{Caller, Role},
  policy::DocumentStatus,
};

/// The four row operation kinds the rules gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
  Select,
  Insert,
  Update,
  Delete,
}

impl fmt::Display for Operation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      Operation::Select => "select",
      Operation::Insert => "insert",
      Operation::Update => "update",
      Operation::Delete => "delete",
    };
    f.write_str(s)
  }
}

/// The resource a rule is evaluated against, carrying whatever row context
/// the predicates inspect. `None` context means "no specific row" (e.g. an
/// insert, or a listing where row filtering happens in the query).
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
  Policy { status: Option<DocumentStatus> },
  Bylaw { status: Option<DocumentStatus> },
  Suggestion,
  PolicyVersion,
  Review { user_email: Option<&'a str> },
  User,
}

impl Resource<'_> {
  pub fn table(&self) -> &'static str {
    match self {
      Resource::Policy { .. } => "policies",
      Resource::Bylaw { .. } => "bylaws",
      Resource::Suggestion => "suggestions",
      Resource::PolicyVersion => "policy_versions",
      Resource::Review { .. } => "policy_reviews",
      Resource::User => "users",
    }
  }
}

// ─── Per-table predicates ────────────────────────────────────────────────────

/// Approved documents are readable by anyone, authenticated or not.
fn public_document_read(op: Operation, status: Option<DocumentStatus>) -> bool {
  op == Operation::Select && status == Some(DocumentStatus::Approved)
}

/// Managers (admin, working group) may read, insert, and update documents.
/// Delete is reserved for admins — no predicate grants it to the working
/// group.
fn manager_document_write(caller: &Caller, op: Operation) -> bool {
  match op {
    Operation::Select | Operation::Insert | Operation::Update => {
      caller.role().is_some_and(Role::is_manager)
    }
    Operation::Delete => caller.role() == Some(Role::Admin),
  }
}

/// Suggestion inserts are unconditionally open; everything else is for
/// managers.
fn suggestion_rule(caller: &Caller, op: Operation) -> bool {
  match op {
    Operation::Insert => true,
    _ => caller.role().is_some_and(Role::is_manager),
  }
}

/// Reviews: users write only their own row (email match), any authenticated
/// identity may read, only admins delete.
fn review_rule(caller: &Caller, op: Operation, row_email: Option<&str>) -> bool {
  match op {
    Operation::Insert | Operation::Update => match (caller.email(), row_email) {
      (Some(claimed), Some(row)) => claimed == row,
      _ => false,
    },
    Operation::Select => caller.is_authenticated(),
    Operation::Delete => caller.role() == Some(Role::Admin),
  }
}

/// Versions are write-once history: readable by admins, written only by the
/// store's own snapshot orchestration (which runs under the already
/// authorized policy update, not through this gate).
fn version_rule(caller: &Caller, op: Operation) -> bool {
  op == Operation::Select && caller.role() == Some(Role::Admin)
}

/// User rows are owned by the auth integration; end-user management of them
/// is admin-only.
fn user_rule(caller: &Caller, _op: Operation) -> bool {
  caller.role() == Some(Role::Admin)
}

// ─── Composition ─────────────────────────────────────────────────────────────

/// Evaluate the OR of every predicate applicable to `(op, resource)`.
pub fn authorize(caller: &Caller, op: Operation, resource: Resource<'_>) -> bool {
  if caller.is_service() {
    return true;
  }
  match resource {
    Resource::Policy { status } | Resource::Bylaw { status } => {
      public_document_read(op, status) || manager_document_write(caller, op)
    }
    Resource::Suggestion => suggestion_rule(caller, op),
    Resource::Review { user_email } => review_rule(caller, op, user_email),
    Resource::PolicyVersion => version_rule(caller, op),
    Resource::User => user_rule(caller, op),
  }
}

/// [`authorize`], surfaced as a [`Result`] for use on store write paths.
pub fn check(caller: &Caller, op: Operation, resource: Resource<'_>) -> Result<()> {
  if authorize(caller, op, resource) {
    Ok(())
  } else {
    Err(Error::forbidden(op, resource.table()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn admin() -> Caller {
    Caller::user("u-admin", "admin@example.org", Role::Admin)
  }

  fn wg() -> Caller {
    Caller::user("u-wg", "wg@example.org", Role::PolicyWorkingGroup)
  }

  fn member() -> Caller {
    Caller::user("u-pub", "member@example.org", Role::Public)
  }

  // ── Documents ─────────────────────────────────────────────────────────────

  #[test]
  fn approved_documents_are_publicly_readable() {
    let res = Resource::Policy { status: Some(DocumentStatus::Approved) };
    assert!(authorize(&Caller::Anonymous, Operation::Select, res));
    assert!(authorize(&member(), Operation::Select, res));
  }

  #[test]
  fn draft_documents_are_hidden_from_the_public() {
    let res = Resource::Policy { status: Some(DocumentStatus::Draft) };
    assert!(!authorize(&Caller::Anonymous, Operation::Select, res));
    assert!(!authorize(&member(), Operation::Select, res));
    assert!(authorize(&wg(), Operation::Select, res));
    assert!(authorize(&admin(), Operation::Select, res));
  }

  #[test]
  fn working_group_writes_documents_but_cannot_delete() {
    let res = Resource::Bylaw { status: None };
    assert!(authorize(&wg(), Operation::Insert, res));
    assert!(authorize(&wg(), Operation::Update, res));
    assert!(!authorize(&wg(), Operation::Delete, res));
    assert!(authorize(&admin(), Operation::Delete, res));
  }

  #[test]
  fn public_role_cannot_write_documents() {
    let res = Resource::Policy { status: None };
    assert!(!authorize(&member(), Operation::Insert, res));
    assert!(!authorize(&member(), Operation::Update, res));
    assert!(!authorize(&Caller::Anonymous, Operation::Insert, res));
  }

  // ── Suggestions ───────────────────────────────────────────────────────────

  #[test]
  fn anyone_may_insert_a_suggestion() {
    assert!(authorize(&Caller::Anonymous, Operation::Insert, Resource::Suggestion));
    assert!(authorize(&member(), Operation::Insert, Resource::Suggestion));
  }

  #[test]
  fn only_managers_manage_suggestions() {
    for op in [Operation::Select, Operation::Update, Operation::Delete] {
      assert!(!authorize(&Caller::Anonymous, op, Resource::Suggestion));
      assert!(!authorize(&member(), op, Resource::Suggestion));
      assert!(authorize(&wg(), op, Resource::Suggestion));
      assert!(authorize(&admin(), op, Resource::Suggestion));
    }
  }

  // ── Reviews ───────────────────────────────────────────────────────────────

  #[test]
  fn reviews_are_written_only_by_their_owner() {
    let own = Resource::Review { user_email: Some("member@example.org") };
    let other = Resource::Review { user_email: Some("someone-else@example.org") };
    assert!(authorize(&member(), Operation::Insert, own));
    assert!(authorize(&member(), Operation::Update, own));
    assert!(!authorize(&member(), Operation::Insert, other));
    assert!(!authorize(&Caller::Anonymous, Operation::Insert, own));
  }

  #[test]
  fn any_authenticated_identity_reads_reviews() {
    let res = Resource::Review { user_email: None };
    assert!(authorize(&member(), Operation::Select, res));
    assert!(authorize(&wg(), Operation::Select, res));
    assert!(!authorize(&Caller::Anonymous, Operation::Select, res));
  }

  #[test]
  fn review_delete_is_admin_only() {
    // No self-delete: even the row owner cannot remove their review.
    let own = Resource::Review { user_email: Some("member@example.org") };
    assert!(!authorize(&member(), Operation::Delete, own));
    assert!(authorize(&admin(), Operation::Delete, own));
  }

  // ── Versions and users ────────────────────────────────────────────────────

  #[test]
  fn version_history_is_admin_read_only() {
    assert!(authorize(&admin(), Operation::Select, Resource::PolicyVersion));
    assert!(!authorize(&wg(), Operation::Select, Resource::PolicyVersion));
    assert!(!authorize(&admin(), Operation::Insert, Resource::PolicyVersion));
    assert!(!authorize(&admin(), Operation::Update, Resource::PolicyVersion));
    assert!(!authorize(&admin(), Operation::Delete, Resource::PolicyVersion));
  }

  #[test]
  fn user_management_is_admin_only() {
    assert!(authorize(&admin(), Operation::Update, Resource::User));
    assert!(!authorize(&wg(), Operation::Update, Resource::User));
    assert!(!authorize(&member(), Operation::Select, Resource::User));
  }

  // ── Service bypass ────────────────────────────────────────────────────────

  #[test]
  fn service_bypasses_every_predicate() {
    let cases: Vec<Resource<'_>> = vec![
      Resource::Policy { status: Some(DocumentStatus::Draft) },
      Resource::Bylaw { status: None },
      Resource::Suggestion,
      Resource::PolicyVersion,
      Resource::Review { user_email: Some("anyone@example.org") },
      Resource::User,
    ];
    for res in cases {
      for op in [Operation::Select, Operation::Insert, Operation::Update, Operation::Delete] {
        assert!(authorize(&Caller::Service, op, res));
      }
    }
  }

  #[test]
  fn check_reports_the_denied_operation() {
    let err = check(&member(), Operation::Delete, Resource::Suggestion).unwrap_err();
    assert!(matches!(
      err,
      crate::Error::Forbidden { op: Operation::Delete, resource: "suggestions" }
    ));
  }
}
