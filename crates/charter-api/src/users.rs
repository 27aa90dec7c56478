//! Handlers for `/auth` endpoints: the caller's own identity plus the
//! admin-side user management surface. Login itself lives with the external
//! identity provider, not here.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use charter_core::{
  identity::{Caller, Role},
  store::GovernanceStore,
  user::User,
};
use serde::{Deserialize, Serialize};

use crate::{
  AppState,
  auth::{CurrentCaller, require_admin, require_identity},
  error::ApiError,
};

/// `GET /auth/me` response.
#[derive(Debug, Serialize)]
pub struct MeBody {
  pub user_id: String,
  pub email:   String,
  pub role:    Role,
}

/// JSON body accepted by `PUT /auth/users/{id}/role`.
#[derive(Debug, Deserialize)]
pub struct RoleBody {
  pub role: Role,
}

/// `GET /auth/me`
pub async fn me(CurrentCaller(caller): CurrentCaller) -> Result<Json<MeBody>, ApiError> {
  require_identity(&caller)?;
  let Caller::User(identity) = caller else {
    // Service callers never arrive through the HTTP extractor.
    return Err(ApiError::unauthorized());
  };
  Ok(Json(MeBody {
    user_id: identity.user_id,
    email:   identity.email,
    role:    identity.role,
  }))
}

/// `GET /auth/users`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  CurrentCaller(caller): CurrentCaller,
) -> Result<Json<Vec<User>>, ApiError>
where
  S: GovernanceStore + Clone + Send + Sync + 'static,
{
  require_admin(&caller)?;
  let users = state.store.list_users(&caller).await?;
  Ok(Json(users))
}

/// `PUT /auth/users/{id}/role`
pub async fn set_role<S>(
  State(state): State<AppState<S>>,
  CurrentCaller(caller): CurrentCaller,
  Path(user_id): Path<String>,
  Json(body): Json<RoleBody>,
) -> Result<Json<User>, ApiError>
where
  S: GovernanceStore + Clone + Send + Sync + 'static,
{
  require_admin(&caller)?;
  let user = state.store.set_user_role(&caller, &user_id, body.role).await?;
  Ok(Json(user))
}

/// `DELETE /auth/users/{id}`
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  CurrentCaller(caller): CurrentCaller,
  Path(user_id): Path<String>,
) -> Result<StatusCode, ApiError>
where
  S: GovernanceStore + Clone + Send + Sync + 'static,
{
  require_admin(&caller)?;
  state.store.delete_user(&caller, &user_id).await?;
  Ok(StatusCode::NO_CONTENT)
}
