//! Policy reviews — one current opinion per (policy, reviewer) pair.
//!
//! A review is keyed on the policy's external text id and the reviewer's
//! email, with a UNIQUE constraint over the pair. Re-submitting updates the
//! existing row; there is no per-user history and no self-delete path (a
//! wrong review is corrected by updating it, removed only by an admin).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
  Confirm,
  NeedsWork,
}

/// Aggregate view of a policy's reviews: who confirmed, who wants rework.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewTally {
  pub confirmed:  ReviewGroup,
  pub needs_work: ReviewGroup,
}

/// One side of the tally: how many reviewers, and who they are.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewGroup {
  pub count:  usize,
  pub people: Vec<String>,
}

impl ReviewGroup {
  pub fn new(people: Vec<String>) -> Self {
    ReviewGroup { count: people.len(), people }
  }
}
