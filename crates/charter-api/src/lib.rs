//! JSON REST API for Charter.
//!
//! Exposes an axum [`Router`] backed by any
//! [`charter_core::store::GovernanceStore`]. Identity arrives as a bearer
//! token checked by the state's [`auth::TokenVerifier`]; everything else —
//! TLS, reverse proxying — is the deployment's concern.

pub mod auth;
pub mod bylaws;
pub mod error;
pub mod policies;
pub mod reviews;
pub mod suggestions;
pub mod users;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Json, Router,
  routing::{delete, get, post, put},
};
use charter_core::store::GovernanceStore;
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;

use auth::{StaticTokenSet, Subject, TokenVerifier};

pub use error::ApiError;

// ─── Configuration ───────────────────────────────────────────────────────────

/// One recognised token: its SHA-256 digest and the subject it belongs to.
#[derive(Deserialize, Clone)]
pub struct TokenEntry {
  pub sha256:  String,
  pub user_id: String,
  pub email:   String,
}

/// Runtime server configuration, deserialised from `config.toml` with
/// `CHARTER_`-prefixed environment overrides.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  /// Recognised bearer tokens. Digests come from `charter-server hash-token`.
  #[serde(default)]
  pub tokens:     Vec<TokenEntry>,
}

impl ServerConfig {
  /// Build the token verifier declared by this configuration.
  pub fn verifier(&self) -> StaticTokenSet {
    StaticTokenSet::new(self.tokens.iter().map(|entry| {
      (entry.sha256.clone(), Subject {
        user_id: entry.user_id.clone(),
        email:   entry.email.clone(),
      })
    }))
  }
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: GovernanceStore> {
  pub store:    Arc<S>,
  pub verifier: Arc<dyn TokenVerifier>,
  pub config:   Arc<ServerConfig>,
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the full `/api` router for `state`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: GovernanceStore + Clone + Send + Sync + 'static,
{
  Router::new()
    .route("/api/health", get(health))
    // Policies
    .route(
      "/api/policies",
      get(policies::list::<S>).post(policies::create::<S>),
    )
    .route("/api/policies/approved", get(policies::list_approved::<S>))
    .route(
      "/api/policies/reviews/reset-all",
      delete(reviews::reset_all::<S>),
    )
    .route(
      "/api/policies/{policy_id}",
      get(policies::get_one::<S>)
        .put(policies::update::<S>)
        .delete(policies::delete::<S>),
    )
    .route("/api/policies/{policy_id}/approve", put(policies::approve::<S>))
    .route("/api/policies/{policy_id}/versions", get(policies::versions::<S>))
    .route(
      "/api/policies/{policy_id}/reviews",
      post(reviews::submit::<S>).get(reviews::tally::<S>),
    )
    // Bylaws
    .route(
      "/api/bylaws",
      get(bylaws::list::<S>).post(bylaws::create::<S>),
    )
    .route("/api/bylaws/approved", get(bylaws::list_approved::<S>))
    .route(
      "/api/bylaws/{number}",
      get(bylaws::get_one::<S>)
        .put(bylaws::update::<S>)
        .delete(bylaws::delete::<S>),
    )
    .route("/api/bylaws/{number}/approve", put(bylaws::approve::<S>))
    // Suggestions
    .route(
      "/api/suggestions",
      get(suggestions::list::<S>).post(suggestions::create::<S>),
    )
    .route(
      "/api/suggestions/{id}",
      put(suggestions::update::<S>).delete(suggestions::delete::<S>),
    )
    // Auth
    .route("/api/auth/me", get(users::me))
    .route("/api/auth/users", get(users::list::<S>))
    .route("/api/auth/users/{id}/role", put(users::set_role::<S>))
    .route("/api/auth/users/{id}", delete(users::delete::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
  Json(json!({ "status": "ok" }))
}

// ─── Integration tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use charter_core::identity::{Caller, Role};
  use charter_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;
  use crate::auth::token_digest;

  const ADMIN_TOKEN: &str = "admin-token";
  const WG_TOKEN: &str = "wg-token";
  const MEMBER_TOKEN: &str = "member-token";

  async fn make_state() -> AppState<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();

    // Provision the three fixture users and their roles up front; the
    // extractor would otherwise create them as `public` on first request.
    store
      .ensure_user(&Caller::Service, "sub-admin", "admin@example.org")
      .await
      .unwrap();
    store
      .set_user_role(&Caller::Service, "sub-admin", Role::Admin)
      .await
      .unwrap();
    store
      .ensure_user(&Caller::Service, "sub-wg", "wg@example.org")
      .await
      .unwrap();
    store
      .set_user_role(&Caller::Service, "sub-wg", Role::PolicyWorkingGroup)
      .await
      .unwrap();
    store
      .ensure_user(&Caller::Service, "sub-member", "member@example.org")
      .await
      .unwrap();

    let tokens = vec![
      TokenEntry {
        sha256:  token_digest(ADMIN_TOKEN),
        user_id: "sub-admin".into(),
        email:   "admin@example.org".into(),
      },
      TokenEntry {
        sha256:  token_digest(WG_TOKEN),
        user_id: "sub-wg".into(),
        email:   "wg@example.org".into(),
      },
      TokenEntry {
        sha256:  token_digest(MEMBER_TOKEN),
        user_id: "sub-member".into(),
        email:   "member@example.org".into(),
      },
    ];
    let config = ServerConfig {
      host: "127.0.0.1".into(),
      port: 8080,
      store_path: ":memory:".into(),
      tokens,
    };

    AppState {
      store:    Arc::new(store),
      verifier: Arc::new(config.verifier()),
      config:   Arc::new(config),
    }
  }

  async fn request(
    state: &AppState<SqliteStore>,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
  ) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
      builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
      Some(v) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(v.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };

    let resp = router(state.clone()).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
      .await
      .unwrap();
    let value = if bytes.is_empty() {
      serde_json::Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
  }

  fn policy_body(ext_id: &str) -> serde_json::Value {
    json!({
      "policy_id":      ext_id,
      "policy_name":    format!("Policy {ext_id}"),
      "section":        "governance",
      "policy_content": "Members shall act in good faith.",
    })
  }

  // ── Health ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn health_needs_no_auth() {
    let state = make_state().await;
    let (status, body) = request(&state, "GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
  }

  // ── Policies ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn create_policy_maps_wire_fields() {
    let state = make_state().await;
    let (status, body) = request(
      &state,
      "POST",
      "/api/policies",
      Some(ADMIN_TOKEN),
      Some(policy_body("GOV-1")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["policy_id"], "GOV-1");
    assert_eq!(body["policy_name"], "Policy GOV-1");
    assert_eq!(body["policy_content"], "Members shall act in good faith.");
    assert_eq!(body["status"], "draft");
    // Internal field names never leak onto the wire.
    assert!(body.get("name").is_none());
    assert!(body.get("content").is_none());
  }

  #[tokio::test]
  async fn duplicate_policy_id_is_400() {
    let state = make_state().await;
    request(&state, "POST", "/api/policies", Some(ADMIN_TOKEN), Some(policy_body("GOV-1"))).await;
    let (status, _) = request(
      &state,
      "POST",
      "/api/policies",
      Some(ADMIN_TOKEN),
      Some(policy_body("GOV-1")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn management_listing_gated_by_role() {
    let state = make_state().await;
    request(&state, "POST", "/api/policies", Some(ADMIN_TOKEN), Some(policy_body("GOV-1"))).await;

    let (status, _) = request(&state, "GET", "/api/policies", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = request(&state, "GET", "/api/policies", Some(MEMBER_TOKEN), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = request(&state, "GET", "/api/policies", Some(WG_TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn approved_listing_is_public_and_filtered() {
    let state = make_state().await;
    request(&state, "POST", "/api/policies", Some(ADMIN_TOKEN), Some(policy_body("GOV-1"))).await;
    request(&state, "POST", "/api/policies", Some(ADMIN_TOKEN), Some(policy_body("GOV-2"))).await;
    request(&state, "PUT", "/api/policies/GOV-2/approve", Some(ADMIN_TOKEN), None).await;

    let (status, body) = request(&state, "GET", "/api/policies/approved", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["policy_id"], "GOV-2");
  }

  #[tokio::test]
  async fn management_listing_filters_by_policy_id() {
    let state = make_state().await;
    request(&state, "POST", "/api/policies", Some(ADMIN_TOKEN), Some(policy_body("GOV-1"))).await;
    request(&state, "POST", "/api/policies", Some(ADMIN_TOKEN), Some(policy_body("GOV-2"))).await;

    let (status, body) =
      request(&state, "GET", "/api/policies?policy_id=GOV-2", Some(ADMIN_TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["policy_id"], "GOV-2");
  }

  #[tokio::test]
  async fn draft_reads_as_404_for_anonymous() {
    let state = make_state().await;
    request(&state, "POST", "/api/policies", Some(ADMIN_TOKEN), Some(policy_body("GOV-1"))).await;

    let (status, _) = request(&state, "GET", "/api/policies/GOV-1", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = request(&state, "GET", "/api/policies/GOV-1", Some(WG_TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
  }

  #[tokio::test]
  async fn update_forces_draft_and_approve_is_admin_only() {
    let state = make_state().await;
    request(&state, "POST", "/api/policies", Some(ADMIN_TOKEN), Some(policy_body("GOV-1"))).await;

    let (status, _) =
      request(&state, "PUT", "/api/policies/GOV-1/approve", Some(WG_TOKEN), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) =
      request(&state, "PUT", "/api/policies/GOV-1/approve", Some(ADMIN_TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "approved");

    // Re-approving is a 400, editing knocks it back to draft.
    let (status, _) =
      request(&state, "PUT", "/api/policies/GOV-1/approve", Some(ADMIN_TOKEN), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = request(
      &state,
      "PUT",
      "/api/policies/GOV-1",
      Some(WG_TOKEN),
      Some(json!({ "policy_content": "Revised." })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "draft");
    assert_eq!(body["policy_content"], "Revised.");
  }

  #[tokio::test]
  async fn versions_listing_is_admin_only() {
    let state = make_state().await;
    request(&state, "POST", "/api/policies", Some(ADMIN_TOKEN), Some(policy_body("GOV-1"))).await;
    request(
      &state,
      "PUT",
      "/api/policies/GOV-1",
      Some(ADMIN_TOKEN),
      Some(json!({ "policy_content": "Revised." })),
    )
    .await;

    let (status, _) =
      request(&state, "GET", "/api/policies/GOV-1/versions", Some(WG_TOKEN), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) =
      request(&state, "GET", "/api/policies/GOV-1/versions", Some(ADMIN_TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["version_number"], 1);
    assert_eq!(rows[0]["policy_content"], "Members shall act in good faith.");
  }

  #[tokio::test]
  async fn delete_policy_is_admin_only_204() {
    let state = make_state().await;
    request(&state, "POST", "/api/policies", Some(ADMIN_TOKEN), Some(policy_body("GOV-1"))).await;

    let (status, _) = request(&state, "DELETE", "/api/policies/GOV-1", Some(WG_TOKEN), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) =
      request(&state, "DELETE", "/api/policies/GOV-1", Some(ADMIN_TOKEN), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) =
      request(&state, "DELETE", "/api/policies/GOV-1", Some(ADMIN_TOKEN), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  // ── Bylaws ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn bylaw_wire_mapping_and_gates() {
    let state = make_state().await;
    let (status, body) = request(
      &state,
      "POST",
      "/api/bylaws",
      Some(WG_TOKEN),
      Some(json!({
        "bylaw_number": 7,
        "bylaw_title":  "Quorum",
        "content":      "Quorum is one third of voting members.",
      })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["bylaw_number"], 7);
    assert_eq!(body["bylaw_title"], "Quorum");
    assert_eq!(body["status"], "draft");

    // Hidden from the public until approved.
    let (status, _) = request(&state, "GET", "/api/bylaws/7", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    request(&state, "PUT", "/api/bylaws/7/approve", Some(ADMIN_TOKEN), None).await;
    let (status, body) = request(&state, "GET", "/api/bylaws/7", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "approved");
  }

  // ── Suggestions ───────────────────────────────────────────────────────────

  #[tokio::test]
  async fn anonymous_suggestion_roundtrip() {
    let state = make_state().await;
    request(&state, "POST", "/api/policies", Some(ADMIN_TOKEN), Some(policy_body("GOV-1"))).await;

    let (status, body) = request(
      &state,
      "POST",
      "/api/suggestions",
      None,
      Some(json!({ "policy_id": "GOV-1", "suggestion": "Define member." })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["policy_id"], "GOV-1");
    assert_eq!(body["policy_name"], "Policy GOV-1");

    // Listing stays a management view.
    let (status, _) = request(&state, "GET", "/api/suggestions", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = request(&state, "GET", "/api/suggestions", Some(MEMBER_TOKEN), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, listing) =
      request(&state, "GET", "/api/suggestions", Some(WG_TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing.as_array().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn suggestion_target_validation() {
    let state = make_state().await;

    let (status, _) = request(
      &state,
      "POST",
      "/api/suggestions",
      None,
      Some(json!({ "suggestion": "untargeted" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = request(
      &state,
      "POST",
      "/api/suggestions",
      None,
      Some(json!({ "policy_id": "NOPE-1", "suggestion": "about nothing" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  // ── Reviews ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn review_cycle() {
    let state = make_state().await;
    request(&state, "POST", "/api/policies", Some(ADMIN_TOKEN), Some(policy_body("GOV-1"))).await;

    let (status, _) = request(
      &state,
      "POST",
      "/api/policies/GOV-1/reviews",
      None,
      Some(json!({ "review_status": "confirm" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = request(
      &state,
      "POST",
      "/api/policies/GOV-1/reviews",
      Some(MEMBER_TOKEN),
      Some(json!({ "review_status": "needs_work" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Resubmission replaces the opinion.
    request(
      &state,
      "POST",
      "/api/policies/GOV-1/reviews",
      Some(MEMBER_TOKEN),
      Some(json!({ "review_status": "confirm" })),
    )
    .await;

    let (status, _) = request(&state, "GET", "/api/policies/GOV-1/reviews", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, tally) =
      request(&state, "GET", "/api/policies/GOV-1/reviews", Some(MEMBER_TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tally["confirmed"]["count"], 1);
    assert_eq!(tally["confirmed"]["people"][0], "member@example.org");
    assert_eq!(tally["needs_work"]["count"], 0);

    let (status, _) =
      request(&state, "DELETE", "/api/policies/reviews/reset-all", Some(WG_TOKEN), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) =
      request(&state, "DELETE", "/api/policies/reviews/reset-all", Some(ADMIN_TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 1);
  }

  // ── Auth ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn me_reports_the_resolved_identity() {
    let state = make_state().await;

    let (status, _) = request(&state, "GET", "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = request(&state, "GET", "/api/auth/me", Some(WG_TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "wg@example.org");
    assert_eq!(body["role"], "policy_working_group");
  }

  #[tokio::test]
  async fn user_management_is_admin_only() {
    let state = make_state().await;

    let (status, _) = request(&state, "GET", "/api/auth/users", Some(WG_TOKEN), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = request(&state, "GET", "/api/auth/users", Some(ADMIN_TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);

    let (status, body) = request(
      &state,
      "PUT",
      "/api/auth/users/sub-member/role",
      Some(ADMIN_TOKEN),
      Some(json!({ "role": "policy_working_group" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "policy_working_group");

    // The new role applies from the member's next request.
    let (status, _) = request(&state, "GET", "/api/policies", Some(MEMBER_TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) =
      request(&state, "DELETE", "/api/auth/users/sub-member", Some(ADMIN_TOKEN), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
  }
}
