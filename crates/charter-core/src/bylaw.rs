//! Bylaw — same lifecycle shape as a policy, keyed by an integer number.
//!
//! The integer `number` (unique) is the external identifier, a deliberate
//! modeling contrast with the policy's dotted text id. Bylaws have no
//! version history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::policy::DocumentStatus;

/// A persisted bylaw row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bylaw {
  pub id:         Uuid,
  /// External integer identifier, unique across bylaws.
  pub number:     i64,
  pub title:      String,
  pub content:    String,
  pub status:     DocumentStatus,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  pub created_by: Option<String>,
  pub updated_by: Option<String>,
}

/// Input for creating a bylaw; always created as a draft.
#[derive(Debug, Clone)]
pub struct NewBylaw {
  pub number:  i64,
  pub title:   String,
  pub content: String,
}

/// Partial update for a bylaw. No `updated_at` — server-stamped.
#[derive(Debug, Clone, Default)]
pub struct BylawPatch {
  pub number:  Option<i64>,
  pub title:   Option<String>,
  pub content: Option<String>,
}
