//! Handlers for `/bylaws` endpoints. Same role gates as `/policies`, with
//! the bylaw number as the external identifier.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use charter_core::{
  bylaw::{Bylaw, BylawPatch, NewBylaw},
  policy::DocumentStatus,
  store::{BylawQuery, GovernanceStore},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  AppState,
  auth::{CurrentCaller, require_admin, require_manager},
  error::ApiError,
  policies::{DEFAULT_PAGE, MAX_PAGE},
};

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct BylawBody {
  pub id:           Uuid,
  pub bylaw_number: i64,
  pub bylaw_title:  String,
  pub content:      String,
  pub status:       DocumentStatus,
  pub created_at:   DateTime<Utc>,
  pub updated_at:   DateTime<Utc>,
  pub created_by:   Option<String>,
  pub updated_by:   Option<String>,
}

impl From<Bylaw> for BylawBody {
  fn from(b: Bylaw) -> Self {
    Self {
      id:           b.id,
      bylaw_number: b.number,
      bylaw_title:  b.title,
      content:      b.content,
      status:       b.status,
      created_at:   b.created_at,
      updated_at:   b.updated_at,
      created_by:   b.created_by,
      updated_by:   b.updated_by,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct NewBylawBody {
  pub bylaw_number: i64,
  pub bylaw_title:  String,
  pub content:      String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBylawBody {
  pub bylaw_number: Option<i64>,
  pub bylaw_title:  Option<String>,
  pub content:      Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub status: Option<DocumentStatus>,
  pub search: Option<String>,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

impl ListParams {
  fn into_query(self, status_override: Option<DocumentStatus>) -> BylawQuery {
    BylawQuery {
      status: status_override.or(self.status),
      search: self.search,
      limit:  Some(self.limit.unwrap_or(DEFAULT_PAGE).min(MAX_PAGE)),
      offset: self.offset,
    }
  }
}

// ─── Handlers ────────────────────────────────────────────────────────────────

/// `GET /bylaws`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  CurrentCaller(caller): CurrentCaller,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<BylawBody>>, ApiError>
where
  S: GovernanceStore + Clone + Send + Sync + 'static,
{
  require_manager(&caller)?;
  let bylaws = state
    .store
    .list_bylaws(&caller, &params.into_query(None))
    .await?;
  Ok(Json(bylaws.into_iter().map(BylawBody::from).collect()))
}

/// `GET /bylaws/approved`
pub async fn list_approved<S>(
  State(state): State<AppState<S>>,
  CurrentCaller(caller): CurrentCaller,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<BylawBody>>, ApiError>
where
  S: GovernanceStore + Clone + Send + Sync + 'static,
{
  let query = params.into_query(Some(DocumentStatus::Approved));
  let bylaws = state.store.list_bylaws(&caller, &query).await?;
  Ok(Json(bylaws.into_iter().map(BylawBody::from).collect()))
}

/// `GET /bylaws/{number}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  CurrentCaller(caller): CurrentCaller,
  Path(number): Path<i64>,
) -> Result<Json<BylawBody>, ApiError>
where
  S: GovernanceStore + Clone + Send + Sync + 'static,
{
  let bylaw = state
    .store
    .get_bylaw(&caller, number)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("bylaw {number} not found")))?;
  Ok(Json(bylaw.into()))
}

/// `POST /bylaws`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  CurrentCaller(caller): CurrentCaller,
  Json(body): Json<NewBylawBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: GovernanceStore + Clone + Send + Sync + 'static,
{
  require_manager(&caller)?;
  let bylaw = state
    .store
    .create_bylaw(&caller, NewBylaw {
      number:  body.bylaw_number,
      title:   body.bylaw_title,
      content: body.content,
    })
    .await?;
  Ok((StatusCode::CREATED, Json(BylawBody::from(bylaw))))
}

/// `PUT /bylaws/{number}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  CurrentCaller(caller): CurrentCaller,
  Path(number): Path<i64>,
  Json(body): Json<UpdateBylawBody>,
) -> Result<Json<BylawBody>, ApiError>
where
  S: GovernanceStore + Clone + Send + Sync + 'static,
{
  require_manager(&caller)?;
  let bylaw = state
    .store
    .update_bylaw(&caller, number, BylawPatch {
      number:  body.bylaw_number,
      title:   body.bylaw_title,
      content: body.content,
    })
    .await?;
  Ok(Json(bylaw.into()))
}

/// `PUT /bylaws/{number}/approve`
pub async fn approve<S>(
  State(state): State<AppState<S>>,
  CurrentCaller(caller): CurrentCaller,
  Path(number): Path<i64>,
) -> Result<Json<BylawBody>, ApiError>
where
  S: GovernanceStore + Clone + Send + Sync + 'static,
{
  require_admin(&caller)?;
  let bylaw = state.store.approve_bylaw(&caller, number).await?;
  Ok(Json(bylaw.into()))
}

/// `DELETE /bylaws/{number}`
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  CurrentCaller(caller): CurrentCaller,
  Path(number): Path<i64>,
) -> Result<StatusCode, ApiError>
where
  S: GovernanceStore + Clone + Send + Sync + 'static,
{
  require_admin(&caller)?;
  state.store.delete_bylaw(&caller, number).await?;
  Ok(StatusCode::NO_CONTENT)
}
