//! Suggestion — free-text commentary optionally linked to a policy or bylaw.
//!
//! Suggestions are independent of their target's lifecycle: deleting the
//! referenced document nullifies the link (`ON DELETE SET NULL`) instead of
//! removing the suggestion. Anyone may create one; only managers may read,
//! update, or delete them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionStatus {
  Pending,
  Reviewed,
  Implemented,
  Rejected,
}

/// A persisted suggestion row. The link columns hold internal row ids, not
/// the external identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
  pub id:         Uuid,
  pub policy_id:  Option<Uuid>,
  pub bylaw_id:   Option<Uuid>,
  pub suggestion: String,
  pub status:     SuggestionStatus,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Input for creating a suggestion. Targets are named by their external
/// identifiers; the store resolves them to internal keys and rejects the
/// insert when neither is given or a named target does not exist.
#[derive(Debug, Clone)]
pub struct NewSuggestion {
  /// External text id of the target policy, e.g. `"1.1.1"`.
  pub policy_id:  Option<String>,
  /// External number of the target bylaw.
  pub bylaw_number: Option<i64>,
  pub suggestion: String,
}

/// Manager-side partial update.
#[derive(Debug, Clone, Default)]
pub struct SuggestionPatch {
  pub status:     Option<SuggestionStatus>,
  pub suggestion: Option<String>,
}

/// A suggestion joined with display information about its (still-linked)
/// target, as returned by listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionListing {
  #[serde(flatten)]
  pub suggestion: Suggestion,
  /// External id and name of the linked policy, when the link survives.
  pub policy:     Option<LinkedPolicy>,
  /// Number and title of the linked bylaw, when the link survives.
  pub bylaw:      Option<LinkedBylaw>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedPolicy {
  pub policy_id: String,
  pub name:      String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedBylaw {
  pub number: i64,
  pub title:  String,
}
