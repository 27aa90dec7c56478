//! Bearer-token extractor and the identity-provider seam.
//!
//! The server never checks passwords itself — an external identity provider
//! issues tokens, and a [`TokenVerifier`] maps a presented token to the
//! provider's subject. The shipped [`StaticTokenSet`] verifier is a
//! config-declared table of SHA-256 token digests, which is enough for small
//! deployments and for tests.

use std::collections::HashMap;

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use charter_core::{
  identity::{Caller, Role},
  store::GovernanceStore,
};
use sha2::{Digest as _, Sha256};

use crate::{AppState, error::ApiError};

// ─── Verifier seam ───────────────────────────────────────────────────────────

/// An externally-verified subject: the provider's stable id plus the email
/// it attests to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
  pub user_id: String,
  pub email:   String,
}

/// Maps a bearer token to the subject it was issued to, or `None` for a
/// token this deployment does not recognise.
pub trait TokenVerifier: Send + Sync {
  fn verify(&self, token: &str) -> Option<Subject>;
}

/// A fixed table of token digests, loaded from configuration. Tokens are
/// stored hashed so the config file never holds a usable credential.
#[derive(Clone, Default)]
pub struct StaticTokenSet {
  subjects: HashMap<String, Subject>,
}

/// Lowercase hex SHA-256 of a token, as stored in the config table and
/// printed by `charter-server hash-token`.
pub fn token_digest(token: &str) -> String {
  hex::encode(Sha256::digest(token.as_bytes()))
}

impl StaticTokenSet {
  pub fn new(entries: impl IntoIterator<Item = (String, Subject)>) -> Self {
    Self {
      subjects: entries
        .into_iter()
        .map(|(digest, subject)| (digest.to_lowercase(), subject))
        .collect(),
    }
  }
}

impl TokenVerifier for StaticTokenSet {
  fn verify(&self, token: &str) -> Option<Subject> {
    self.subjects.get(&token_digest(token)).cloned()
  }
}

// ─── Extractor ───────────────────────────────────────────────────────────────

/// The caller resolved for this request.
///
/// Absent or unrecognised credentials yield [`Caller::Anonymous`] rather
/// than a rejection: plenty of routes serve anonymous readers, and the ones
/// that do not answer 401 via the role gates below. A verified subject is
/// provisioned on first sight and its role re-read on every request, so a
/// role change applies from the next request onward.
pub struct CurrentCaller(pub Caller);

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
}

impl<S> FromRequestParts<AppState<S>> for CurrentCaller
where
  S: GovernanceStore + Clone + Send + Sync + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let subject = bearer_token(&parts.headers).and_then(|t| state.verifier.verify(t));
    let Some(subject) = subject else {
      return Ok(CurrentCaller(Caller::Anonymous));
    };

    // Provisioning and the role read run as the service; the resulting
    // identity carries whatever role the row holds right now.
    let user = state
      .store
      .ensure_user(&Caller::Service, &subject.user_id, &subject.email)
      .await?;

    Ok(CurrentCaller(Caller::user(user.id, user.email, user.role)))
  }
}

// ─── Role gates ──────────────────────────────────────────────────────────────

/// 401 unless the request carries a verified identity.
pub fn require_identity(caller: &Caller) -> Result<(), ApiError> {
  if caller.is_authenticated() {
    Ok(())
  } else {
    Err(ApiError::unauthorized())
  }
}

/// 401 for anonymous callers, 403 for members outside the working group and
/// administration.
pub fn require_manager(caller: &Caller) -> Result<(), ApiError> {
  require_identity(caller)?;
  match caller.role() {
    Some(role) if role.is_manager() => Ok(()),
    None if caller.is_service() => Ok(()),
    _ => Err(ApiError::Forbidden("management role required".into())),
  }
}

/// 401 for anonymous callers, 403 for everyone but administrators.
pub fn require_admin(caller: &Caller) -> Result<(), ApiError> {
  require_identity(caller)?;
  match caller.role() {
    Some(Role::Admin) => Ok(()),
    None if caller.is_service() => Ok(()),
    _ => Err(ApiError::Forbidden("administrator role required".into())),
  }
}

#[cfg(test)]
mod tests {
  use std::{path::PathBuf, sync::Arc};

  use axum::http::Request;
  use charter_store_sqlite::SqliteStore;

  use super::*;
  use crate::ServerConfig;

  const TOKEN: &str = "testing-token";

  async fn make_state() -> AppState<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let verifier = StaticTokenSet::new([(
      token_digest(TOKEN),
      Subject {
        user_id: "sub-1".into(),
        email:   "alice@example.org".into(),
      },
    )]);

    AppState {
      store:    Arc::new(store),
      verifier: Arc::new(verifier),
      config:   Arc::new(ServerConfig {
        host:       "127.0.0.1".to_string(),
        port:       8080,
        store_path: PathBuf::from(":memory:"),
        tokens:     vec![],
      }),
    }
  }

  async fn extract(
    req: Request<axum::body::Body>,
    state: &AppState<SqliteStore>,
  ) -> Caller {
    let (mut parts, _) = req.into_parts();
    CurrentCaller::from_request_parts(&mut parts, state)
      .await
      .unwrap()
      .0
  }

  #[tokio::test]
  async fn missing_token_is_anonymous() {
    let state = make_state().await;
    let req = Request::builder()
      .body(axum::body::Body::empty())
      .unwrap();
    assert!(matches!(extract(req, &state).await, Caller::Anonymous));
  }

  #[tokio::test]
  async fn unknown_token_is_anonymous() {
    let state = make_state().await;
    let req = Request::builder()
      .header(header::AUTHORIZATION, "Bearer wrong")
      .body(axum::body::Body::empty())
      .unwrap();
    assert!(matches!(extract(req, &state).await, Caller::Anonymous));
  }

  #[tokio::test]
  async fn known_token_provisions_a_public_user() {
    let state = make_state().await;
    let req = Request::builder()
      .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
      .body(axum::body::Body::empty())
      .unwrap();

    let caller = extract(req, &state).await;
    let Caller::User(identity) = caller else {
      panic!("expected a user caller")
    };
    assert_eq!(identity.user_id, "sub-1");
    assert_eq!(identity.email, "alice@example.org");
    assert_eq!(identity.role, Role::Public);
  }

  #[tokio::test]
  async fn role_change_applies_on_next_request() {
    let state = make_state().await;

    let req = Request::builder()
      .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
      .body(axum::body::Body::empty())
      .unwrap();
    extract(req, &state).await;

    state
      .store
      .set_user_role(&Caller::Service, "sub-1", Role::Admin)
      .await
      .unwrap();

    let req = Request::builder()
      .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
      .body(axum::body::Body::empty())
      .unwrap();
    assert_eq!(extract(req, &state).await.role(), Some(Role::Admin));
  }

  #[test]
  fn digest_is_lowercase_hex() {
    let digest = token_digest("abc");
    assert_eq!(digest.len(), 64);
    assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(digest, digest.to_lowercase());
  }
}
