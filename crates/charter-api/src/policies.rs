//! Handlers for `/policies` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/policies` | Manager listing; drafts included |
//! | `GET`    | `/policies/approved` | Public listing; approved only |
//! | `GET`    | `/policies/{policy_id}` | 404 for drafts the caller may not see |
//! | `POST`   | `/policies` | Manager; 201; created as draft; 400 on duplicate id |
//! | `PUT`    | `/policies/{policy_id}` | Manager; forces draft; snapshots prior state |
//! | `PUT`    | `/policies/{policy_id}/approve` | Admin; 400 when already approved |
//! | `DELETE` | `/policies/{policy_id}` | Admin; 204 |
//! | `GET`    | `/policies/{policy_id}/versions` | Admin |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use charter_core::{
  policy::{DocumentStatus, NewPolicy, Policy, PolicyPatch, PolicyVersion},
  store::{GovernanceStore, PolicyQuery},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  AppState,
  auth::{CurrentCaller, require_admin, require_manager},
  error::ApiError,
};

/// Listing page size when the query names none; hard cap regardless.
pub const DEFAULT_PAGE: usize = 50;
pub const MAX_PAGE: usize = 100;

// ─── Wire types ──────────────────────────────────────────────────────────────

/// A policy as it appears on the wire. External field names differ from the
/// internal ones (`policy_name` vs `name`, `policy_content` vs `content`).
#[derive(Debug, Serialize, Deserialize)]
pub struct PolicyBody {
  pub id:             Uuid,
  pub policy_id:      String,
  pub policy_name:    String,
  pub section:        String,
  pub policy_content: String,
  pub status:         DocumentStatus,
  pub created_at:     DateTime<Utc>,
  pub updated_at:     DateTime<Utc>,
  pub created_by:     Option<String>,
  pub updated_by:     Option<String>,
}

impl From<Policy> for PolicyBody {
  fn from(p: Policy) -> Self {
    Self {
      id:             p.id,
      policy_id:      p.policy_id,
      policy_name:    p.name,
      section:        p.section,
      policy_content: p.content,
      status:         p.status,
      created_at:     p.created_at,
      updated_at:     p.updated_at,
      created_by:     p.created_by,
      updated_by:     p.updated_by,
    }
  }
}

/// JSON body accepted by `POST /policies`.
#[derive(Debug, Deserialize)]
pub struct NewPolicyBody {
  pub policy_id:      String,
  pub policy_name:    String,
  pub section:        String,
  pub policy_content: String,
}

/// JSON body accepted by `PUT /policies/{policy_id}`. Absent fields keep
/// their stored values.
#[derive(Debug, Deserialize)]
pub struct UpdatePolicyBody {
  pub policy_name:    Option<String>,
  pub section:        Option<String>,
  pub policy_content: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VersionBody {
  pub id:             Uuid,
  pub version_number: i64,
  pub policy_name:    String,
  pub section:        String,
  pub policy_content: String,
  pub status:         DocumentStatus,
  pub created_at:     DateTime<Utc>,
  pub created_by:     Option<String>,
}

impl From<PolicyVersion> for VersionBody {
  fn from(v: PolicyVersion) -> Self {
    Self {
      id:             v.id,
      version_number: v.version_number,
      policy_name:    v.name,
      section:        v.section,
      policy_content: v.content,
      status:         v.status,
      created_at:     v.created_at,
      created_by:     v.created_by,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub status:    Option<DocumentStatus>,
  pub section:   Option<String>,
  pub policy_id: Option<String>,
  pub search:    Option<String>,
  pub limit:     Option<usize>,
  pub offset:    Option<usize>,
}

impl ListParams {
  fn into_query(self, status_override: Option<DocumentStatus>) -> PolicyQuery {
    PolicyQuery {
      status:    status_override.or(self.status),
      section:   self.section,
      policy_id: self.policy_id,
      search:    self.search,
      limit:     Some(self.limit.unwrap_or(DEFAULT_PAGE).min(MAX_PAGE)),
      offset:    self.offset,
    }
  }
}

// ─── Handlers ────────────────────────────────────────────────────────────────

/// `GET /policies` — the management view, drafts included.
pub async fn list<S>(
  State(state): State<AppState<S>>,
  CurrentCaller(caller): CurrentCaller,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<PolicyBody>>, ApiError>
where
  S: GovernanceStore + Clone + Send + Sync + 'static,
{
  require_manager(&caller)?;
  let policies = state
    .store
    .list_policies(&caller, &params.into_query(None))
    .await?;
  Ok(Json(policies.into_iter().map(PolicyBody::from).collect()))
}

/// `GET /policies/approved` — the public view.
pub async fn list_approved<S>(
  State(state): State<AppState<S>>,
  CurrentCaller(caller): CurrentCaller,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<PolicyBody>>, ApiError>
where
  S: GovernanceStore + Clone + Send + Sync + 'static,
{
  let query = params.into_query(Some(DocumentStatus::Approved));
  let policies = state.store.list_policies(&caller, &query).await?;
  Ok(Json(policies.into_iter().map(PolicyBody::from).collect()))
}

/// `GET /policies/{policy_id}` — a draft the caller may not see reads as 404.
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  CurrentCaller(caller): CurrentCaller,
  Path(policy_id): Path<String>,
) -> Result<Json<PolicyBody>, ApiError>
where
  S: GovernanceStore + Clone + Send + Sync + 'static,
{
  let policy = state
    .store
    .get_policy(&caller, &policy_id)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("policy {policy_id} not found")))?;
  Ok(Json(policy.into()))
}

/// `POST /policies`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  CurrentCaller(caller): CurrentCaller,
  Json(body): Json<NewPolicyBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: GovernanceStore + Clone + Send + Sync + 'static,
{
  require_manager(&caller)?;
  let policy = state
    .store
    .create_policy(&caller, NewPolicy {
      policy_id: body.policy_id,
      name:      body.policy_name,
      section:   body.section,
      content:   body.policy_content,
    })
    .await?;
  Ok((StatusCode::CREATED, Json(PolicyBody::from(policy))))
}

/// `PUT /policies/{policy_id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  CurrentCaller(caller): CurrentCaller,
  Path(policy_id): Path<String>,
  Json(body): Json<UpdatePolicyBody>,
) -> Result<Json<PolicyBody>, ApiError>
where
  S: GovernanceStore + Clone + Send + Sync + 'static,
{
  require_manager(&caller)?;
  let policy = state
    .store
    .update_policy(&caller, &policy_id, PolicyPatch {
      name:    body.policy_name,
      section: body.section,
      content: body.policy_content,
    })
    .await?;
  Ok(Json(policy.into()))
}

/// `PUT /policies/{policy_id}/approve`
pub async fn approve<S>(
  State(state): State<AppState<S>>,
  CurrentCaller(caller): CurrentCaller,
  Path(policy_id): Path<String>,
) -> Result<Json<PolicyBody>, ApiError>
where
  S: GovernanceStore + Clone + Send + Sync + 'static,
{
  require_admin(&caller)?;
  let policy = state.store.approve_policy(&caller, &policy_id).await?;
  Ok(Json(policy.into()))
}

/// `DELETE /policies/{policy_id}`
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  CurrentCaller(caller): CurrentCaller,
  Path(policy_id): Path<String>,
) -> Result<StatusCode, ApiError>
where
  S: GovernanceStore + Clone + Send + Sync + 'static,
{
  require_admin(&caller)?;
  state.store.delete_policy(&caller, &policy_id).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `GET /policies/{policy_id}/versions`
pub async fn versions<S>(
  State(state): State<AppState<S>>,
  CurrentCaller(caller): CurrentCaller,
  Path(policy_id): Path<String>,
) -> Result<Json<Vec<VersionBody>>, ApiError>
where
  S: GovernanceStore + Clone + Send + Sync + 'static,
{
  require_admin(&caller)?;
  let versions = state.store.list_policy_versions(&caller, &policy_id).await?;
  Ok(Json(versions.into_iter().map(VersionBody::from).collect()))
}
