//! User — the join between an external identity and an authorization role.
//!
//! The primary key is intentionally the subject id issued by the identity
//! provider, never locally generated: one provider identity maps to exactly
//! one role row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  /// The identity provider's subject id.
  pub id:         String,
  pub email:      String,
  pub name:       Option<String>,
  pub role:       Role,
  pub created_at: DateTime<Utc>,
}
