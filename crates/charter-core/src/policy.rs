//! Policy — a numbered governance document with a draft/approved lifecycle.
//!
//! A policy carries two identifiers: the internal primary key (`id`, a UUID)
//! used for foreign keys, and the externally visible `policy_id` text (e.g.
//! `"1.1.1"`) that every API path and review record uses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status shared by policies and bylaws. Only approved documents
/// are visible to unauthenticated callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
  Draft,
  Approved,
}

/// A persisted policy row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
  pub id:         Uuid,
  /// External text identifier, unique across policies.
  pub policy_id:  String,
  pub name:       String,
  /// Section grouping, e.g. `"1"`, `"2"`, `"3"`.
  pub section:    String,
  pub content:    String,
  pub status:     DocumentStatus,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  /// User id of the creating caller; absent for rows written by the
  /// privileged service path.
  pub created_by: Option<String>,
  pub updated_by: Option<String>,
}

/// Input for creating a policy. Status is not accepted — new policies are
/// always created as drafts; only the approve operation promotes them.
#[derive(Debug, Clone)]
pub struct NewPolicy {
  pub policy_id: String,
  pub name:      String,
  pub section:   String,
  pub content:   String,
}

/// Partial update for a policy. `None` leaves the field untouched. There is
/// no `updated_at` here on purpose: the store stamps it on every update.
#[derive(Debug, Clone, Default)]
pub struct PolicyPatch {
  pub name:    Option<String>,
  pub section: Option<String>,
  pub content: Option<String>,
}

impl PolicyPatch {
  /// Whether applying this patch to `policy` would change any stored field.
  /// Updates also force the status back to draft, so an approved policy is
  /// considered changed even by an empty patch.
  pub fn changes(&self, policy: &Policy) -> bool {
    self.name.as_ref().is_some_and(|n| *n != policy.name)
      || self.section.as_ref().is_some_and(|s| *s != policy.section)
      || self.content.as_ref().is_some_and(|c| *c != policy.content)
      || policy.status != DocumentStatus::Draft
  }
}

/// An immutable snapshot of a policy's fields taken just before an edit.
/// Version rows are write-once and removed only by the parent cascade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyVersion {
  pub id:             Uuid,
  /// Internal key of the parent policy (`policies.id`, not the text id).
  pub policy_id:      Uuid,
  pub version_number: i64,
  pub name:           String,
  pub section:        String,
  pub content:        String,
  pub status:         DocumentStatus,
  pub created_at:     DateTime<Utc>,
  pub created_by:     Option<String>,
}
