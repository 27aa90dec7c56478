//! Handlers for `/suggestions` endpoints.
//!
//! Creation is deliberately open to anonymous callers; everything else is a
//! management view.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use charter_core::{
  store::{GovernanceStore, SuggestionQuery},
  suggestion::{NewSuggestion, SuggestionListing, SuggestionPatch, SuggestionStatus},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  AppState,
  auth::{CurrentCaller, require_manager},
  error::ApiError,
  policies::{DEFAULT_PAGE, MAX_PAGE},
};

// ─── Wire types ──────────────────────────────────────────────────────────────

/// A suggestion with its target named by external identifiers, as listings
/// return it.
#[derive(Debug, Serialize, Deserialize)]
pub struct SuggestionBody {
  pub id:         Uuid,
  pub suggestion: String,
  pub status:     SuggestionStatus,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  /// Present while the policy link survives.
  pub policy_id:   Option<String>,
  pub policy_name: Option<String>,
  /// Present while the bylaw link survives.
  pub bylaw_number: Option<i64>,
  pub bylaw_title:  Option<String>,
}

impl From<SuggestionListing> for SuggestionBody {
  fn from(listing: SuggestionListing) -> Self {
    let (policy_id, policy_name) = listing
      .policy
      .map(|p| (Some(p.policy_id), Some(p.name)))
      .unwrap_or((None, None));
    let (bylaw_number, bylaw_title) = listing
      .bylaw
      .map(|b| (Some(b.number), Some(b.title)))
      .unwrap_or((None, None));
    Self {
      id: listing.suggestion.id,
      suggestion: listing.suggestion.suggestion,
      status: listing.suggestion.status,
      created_at: listing.suggestion.created_at,
      updated_at: listing.suggestion.updated_at,
      policy_id,
      policy_name,
      bylaw_number,
      bylaw_title,
    }
  }
}

/// JSON body accepted by `POST /suggestions`. At least one target must be
/// named; a named target must exist.
#[derive(Debug, Deserialize)]
pub struct NewSuggestionBody {
  pub policy_id:    Option<String>,
  pub bylaw_number: Option<i64>,
  pub suggestion:   String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSuggestionBody {
  pub status:     Option<SuggestionStatus>,
  pub suggestion: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub status:       Option<SuggestionStatus>,
  pub policy_id:    Option<String>,
  pub bylaw_number: Option<i64>,
  pub limit:        Option<usize>,
  pub offset:       Option<usize>,
}

// ─── Handlers ────────────────────────────────────────────────────────────────

/// `POST /suggestions` — open to everyone, authenticated or not.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  CurrentCaller(caller): CurrentCaller,
  Json(body): Json<NewSuggestionBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: GovernanceStore + Clone + Send + Sync + 'static,
{
  let listing = state
    .store
    .create_suggestion(&caller, NewSuggestion {
      policy_id:    body.policy_id,
      bylaw_number: body.bylaw_number,
      suggestion:   body.suggestion,
    })
    .await?;
  Ok((StatusCode::CREATED, Json(SuggestionBody::from(listing))))
}

/// `GET /suggestions`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  CurrentCaller(caller): CurrentCaller,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<SuggestionBody>>, ApiError>
where
  S: GovernanceStore + Clone + Send + Sync + 'static,
{
  require_manager(&caller)?;
  let query = SuggestionQuery {
    status:       params.status,
    policy_id:    params.policy_id,
    bylaw_number: params.bylaw_number,
    limit:        Some(params.limit.unwrap_or(DEFAULT_PAGE).min(MAX_PAGE)),
    offset:       params.offset,
  };
  let listings = state.store.list_suggestions(&caller, &query).await?;
  Ok(Json(listings.into_iter().map(SuggestionBody::from).collect()))
}

/// `PUT /suggestions/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  CurrentCaller(caller): CurrentCaller,
  Path(id): Path<Uuid>,
  Json(body): Json<UpdateSuggestionBody>,
) -> Result<Json<SuggestionBody>, ApiError>
where
  S: GovernanceStore + Clone + Send + Sync + 'static,
{
  require_manager(&caller)?;
  let listing = state
    .store
    .update_suggestion(&caller, id, SuggestionPatch {
      status:     body.status,
      suggestion: body.suggestion,
    })
    .await?;
  Ok(Json(listing.into()))
}

/// `DELETE /suggestions/{id}`
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  CurrentCaller(caller): CurrentCaller,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: GovernanceStore + Clone + Send + Sync + 'static,
{
  require_manager(&caller)?;
  state.store.delete_suggestion(&caller, id).await?;
  Ok(StatusCode::NO_CONTENT)
}
