//! Error types for `charter-core`.
//!
//! The store trait returns this type directly so callers can map the
//! taxonomy of spec failures — authorization denial, missing rows,
//! constraint violations — to their own surfaces without downcasting.
//! Backend faults travel boxed in [`Error::Backend`].

use thiserror::Error;
use uuid::Uuid;

use crate::authz::Operation;

#[derive(Debug, Error)]
pub enum Error {
  /// No permitting authorization predicate matched the operation.
  #[error("{op} on {resource} denied")]
  Forbidden { op: Operation, resource: &'static str },

  /// The operation requires an authenticated identity and none was given.
  #[error("authentication required")]
  Unauthenticated,

  #[error("policy not found: {0}")]
  PolicyNotFound(String),

  #[error("bylaw not found: {0}")]
  BylawNotFound(i64),

  #[error("suggestion not found: {0}")]
  SuggestionNotFound(Uuid),

  #[error("user not found: {0}")]
  UserNotFound(String),

  #[error("policy id already exists: {0}")]
  DuplicatePolicyId(String),

  #[error("bylaw number already exists: {0}")]
  DuplicateBylawNumber(i64),

  #[error("email already registered: {0}")]
  DuplicateEmail(String),

  #[error("policy {0} is already approved")]
  AlreadyApproved(String),

  #[error("a suggestion must name a policy or a bylaw")]
  SuggestionTargetMissing,

  /// A storage-layer fault (connection, SQL, decode).
  #[error("backend error: {0}")]
  Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn forbidden(op: Operation, resource: &'static str) -> Self {
    Error::Forbidden { op, resource }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
