//! Handlers for policy review endpoints.
//!
//! A review is one reviewer's standing opinion on one policy; resubmitting
//! replaces the opinion rather than adding a second row.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use charter_core::{
  review::{ReviewStatus, ReviewTally},
  store::GovernanceStore,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
  AppState,
  auth::{CurrentCaller, require_admin, require_identity},
  error::ApiError,
};

/// JSON body accepted by `POST /policies/{policy_id}/reviews`.
#[derive(Debug, Deserialize)]
pub struct ReviewBody {
  pub review_status: ReviewStatus,
}

/// `POST /policies/{policy_id}/reviews`
pub async fn submit<S>(
  State(state): State<AppState<S>>,
  CurrentCaller(caller): CurrentCaller,
  Path(policy_id): Path<String>,
  Json(body): Json<ReviewBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: GovernanceStore + Clone + Send + Sync + 'static,
{
  require_identity(&caller)?;
  state
    .store
    .submit_review(&caller, &policy_id, body.review_status)
    .await?;
  Ok((
    StatusCode::CREATED,
    Json(json!({ "policy_id": policy_id, "review_status": body.review_status })),
  ))
}

/// `GET /policies/{policy_id}/reviews`
pub async fn tally<S>(
  State(state): State<AppState<S>>,
  CurrentCaller(caller): CurrentCaller,
  Path(policy_id): Path<String>,
) -> Result<Json<ReviewTally>, ApiError>
where
  S: GovernanceStore + Clone + Send + Sync + 'static,
{
  require_identity(&caller)?;
  let tally = state.store.review_tally(&caller, &policy_id).await?;
  Ok(Json(tally))
}

/// `DELETE /policies/reviews/reset-all` — clears every review row, e.g. at
/// the start of a new review cycle.
pub async fn reset_all<S>(
  State(state): State<AppState<S>>,
  CurrentCaller(caller): CurrentCaller,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: GovernanceStore + Clone + Send + Sync + 'static,
{
  require_admin(&caller)?;
  let deleted = state.store.reset_all_reviews(&caller).await?;
  Ok(Json(json!({ "deleted": deleted })))
}
