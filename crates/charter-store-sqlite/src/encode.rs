//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Status and role enums are
//! stored in their wire spelling (the same strings the CHECK constraints
//! name). UUIDs are stored as hyphenated lowercase strings.

use charter_core::{
  Result,
  bylaw::Bylaw,
  identity::Role,
  policy::{DocumentStatus, Policy, PolicyVersion},
  review::ReviewStatus,
  suggestion::{LinkedBylaw, LinkedPolicy, Suggestion, SuggestionListing, SuggestionStatus},
  user::User,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::decode_err;

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> {
  Uuid::parse_str(s).map_err(|e| decode_err(format!("bad uuid {s:?}: {e}")))
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| decode_err(format!("bad timestamp {s:?}: {e}")))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn encode_document_status(s: DocumentStatus) -> &'static str {
  match s {
    DocumentStatus::Draft => "draft",
    DocumentStatus::Approved => "approved",
  }
}

pub fn decode_document_status(s: &str) -> Result<DocumentStatus> {
  match s {
    "draft" => Ok(DocumentStatus::Draft),
    "approved" => Ok(DocumentStatus::Approved),
    other => Err(decode_err(format!("unknown document status: {other:?}"))),
  }
}

pub fn encode_suggestion_status(s: SuggestionStatus) -> &'static str {
  match s {
    SuggestionStatus::Pending => "pending",
    SuggestionStatus::Reviewed => "reviewed",
    SuggestionStatus::Implemented => "implemented",
    SuggestionStatus::Rejected => "rejected",
  }
}

pub fn decode_suggestion_status(s: &str) -> Result<SuggestionStatus> {
  match s {
    "pending" => Ok(SuggestionStatus::Pending),
    "reviewed" => Ok(SuggestionStatus::Reviewed),
    "implemented" => Ok(SuggestionStatus::Implemented),
    "rejected" => Ok(SuggestionStatus::Rejected),
    other => Err(decode_err(format!("unknown suggestion status: {other:?}"))),
  }
}

pub fn encode_review_status(s: ReviewStatus) -> &'static str {
  match s {
    ReviewStatus::Confirm => "confirm",
    ReviewStatus::NeedsWork => "needs_work",
  }
}

pub fn decode_review_status(s: &str) -> Result<ReviewStatus> {
  match s {
    "confirm" => Ok(ReviewStatus::Confirm),
    "needs_work" => Ok(ReviewStatus::NeedsWork),
    other => Err(decode_err(format!("unknown review status: {other:?}"))),
  }
}

pub fn encode_role(r: Role) -> &'static str {
  match r {
    Role::Public => "public",
    Role::Admin => "admin",
    Role::PolicyWorkingGroup => "policy_working_group",
  }
}

pub fn decode_role(s: &str) -> Result<Role> {
  match s {
    "public" => Ok(Role::Public),
    "admin" => Ok(Role::Admin),
    "policy_working_group" => Ok(Role::PolicyWorkingGroup),
    other => Err(decode_err(format!("unknown role: {other:?}"))),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `policies` row.
pub struct RawPolicy {
  pub id:         String,
  pub policy_id:  String,
  pub name:       String,
  pub section:    String,
  pub content:    String,
  pub status:     String,
  pub created_at: String,
  pub updated_at: String,
  pub created_by: Option<String>,
  pub updated_by: Option<String>,
}

impl RawPolicy {
  pub fn into_policy(self) -> Result<Policy> {
    Ok(Policy {
      id:         decode_uuid(&self.id)?,
      policy_id:  self.policy_id,
      name:       self.name,
      section:    self.section,
      content:    self.content,
      status:     decode_document_status(&self.status)?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
      created_by: self.created_by,
      updated_by: self.updated_by,
    })
  }
}

/// Raw strings read directly from a `bylaws` row.
pub struct RawBylaw {
  pub id:         String,
  pub number:     i64,
  pub title:      String,
  pub content:    String,
  pub status:     String,
  pub created_at: String,
  pub updated_at: String,
  pub created_by: Option<String>,
  pub updated_by: Option<String>,
}

impl RawBylaw {
  pub fn into_bylaw(self) -> Result<Bylaw> {
    Ok(Bylaw {
      id:         decode_uuid(&self.id)?,
      number:     self.number,
      title:      self.title,
      content:    self.content,
      status:     decode_document_status(&self.status)?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
      created_by: self.created_by,
      updated_by: self.updated_by,
    })
  }
}

/// Raw strings read from a `policy_versions` row.
pub struct RawVersion {
  pub id:             String,
  pub policy_id:      String,
  pub version_number: i64,
  pub name:           String,
  pub section:        String,
  pub content:        String,
  pub status:         String,
  pub created_at:     String,
  pub created_by:     Option<String>,
}

impl RawVersion {
  pub fn into_version(self) -> Result<PolicyVersion> {
    Ok(PolicyVersion {
      id:             decode_uuid(&self.id)?,
      policy_id:      decode_uuid(&self.policy_id)?,
      version_number: self.version_number,
      name:           self.name,
      section:        self.section,
      content:        self.content,
      status:         decode_document_status(&self.status)?,
      created_at:     decode_dt(&self.created_at)?,
      created_by:     self.created_by,
    })
  }
}

/// A `suggestions` row left-joined with its target's display columns.
pub struct RawSuggestion {
  pub id:           String,
  pub policy_id:    Option<String>,
  pub bylaw_id:     Option<String>,
  pub suggestion:   String,
  pub status:       String,
  pub created_at:   String,
  pub updated_at:   String,
  // joined from policies / bylaws; NULL when the link was severed
  pub policy_ext_id: Option<String>,
  pub policy_name:   Option<String>,
  pub bylaw_number:  Option<i64>,
  pub bylaw_title:   Option<String>,
}

impl RawSuggestion {
  pub fn into_listing(self) -> Result<SuggestionListing> {
    let policy = match (self.policy_ext_id, self.policy_name) {
      (Some(policy_id), Some(name)) => Some(LinkedPolicy { policy_id, name }),
      _ => None,
    };
    let bylaw = match (self.bylaw_number, self.bylaw_title) {
      (Some(number), Some(title)) => Some(LinkedBylaw { number, title }),
      _ => None,
    };
    Ok(SuggestionListing {
      suggestion: Suggestion {
        id:         decode_uuid(&self.id)?,
        policy_id:  self.policy_id.as_deref().map(decode_uuid).transpose()?,
        bylaw_id:   self.bylaw_id.as_deref().map(decode_uuid).transpose()?,
        suggestion: self.suggestion,
        status:     decode_suggestion_status(&self.status)?,
        created_at: decode_dt(&self.created_at)?,
        updated_at: decode_dt(&self.updated_at)?,
      },
      policy,
      bylaw,
    })
  }
}

/// Raw strings read from a `users` row.
pub struct RawUser {
  pub id:         String,
  pub email:      String,
  pub name:       Option<String>,
  pub role:       String,
  pub created_at: String,
}

impl RawUser {
  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:         self.id,
      email:      self.email,
      name:       self.name,
      role:       decode_role(&self.role)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}
