//! The `GovernanceStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g.
//! `charter-store-sqlite`). The API layer depends on this abstraction, not
//! on any concrete backend.
//!
//! Every method takes the [`Caller`] first; backends evaluate the
//! [`authz`](crate::authz) rules per operation before touching any row and
//! return [`Error::Forbidden`](crate::Error::Forbidden) when no predicate
//! permits the call. There is no caching of role lookups — the caller the
//! API hands in was resolved for this request alone.

use std::future::Future;

use uuid::Uuid;

use crate::{
  Result,
  bylaw::{Bylaw, BylawPatch, NewBylaw},
  identity::{Caller, Role},
  policy::{DocumentStatus, NewPolicy, Policy, PolicyPatch, PolicyVersion},
  review::{ReviewStatus, ReviewTally},
  suggestion::{NewSuggestion, SuggestionListing, SuggestionPatch},
  user::User,
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Filters for [`GovernanceStore::list_policies`].
#[derive(Debug, Clone, Default)]
pub struct PolicyQuery {
  pub status:    Option<DocumentStatus>,
  pub section:   Option<String>,
  /// Restrict to one external policy id.
  pub policy_id: Option<String>,
  /// Case-insensitive substring match over id, name, and content.
  pub search:    Option<String>,
  pub limit:     Option<usize>,
  pub offset:    Option<usize>,
}

/// Filters for [`GovernanceStore::list_bylaws`].
#[derive(Debug, Clone, Default)]
pub struct BylawQuery {
  pub status: Option<DocumentStatus>,
  /// Case-insensitive substring match over title and content.
  pub search: Option<String>,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

/// Filters for [`GovernanceStore::list_suggestions`]. Targets are named by
/// their external identifiers.
#[derive(Debug, Clone, Default)]
pub struct SuggestionQuery {
  pub status:       Option<crate::suggestion::SuggestionStatus>,
  pub policy_id:    Option<String>,
  pub bylaw_number: Option<i64>,
  pub limit:        Option<usize>,
  pub offset:       Option<usize>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Charter governance store backend.
///
/// Multi-step operations (update + version snapshot, review upsert) are
/// atomic: either every statement applies or none does.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait GovernanceStore: Send + Sync {
  // ── Policies ──────────────────────────────────────────────────────────

  /// List policies matching `query`. Callers without the manager read
  /// predicate see only approved rows, whatever the filters say.
  fn list_policies<'a>(
    &'a self,
    caller: &'a Caller,
    query: &'a PolicyQuery,
  ) -> impl Future<Output = Result<Vec<Policy>>> + Send + 'a;

  /// Fetch one policy by its external text id. Returns `None` when the row
  /// does not exist or the caller's read predicate hides it.
  fn get_policy<'a>(
    &'a self,
    caller: &'a Caller,
    policy_id: &'a str,
  ) -> impl Future<Output = Result<Option<Policy>>> + Send + 'a;

  /// Create a policy. Always lands as a draft; duplicate external ids are
  /// rejected.
  fn create_policy<'a>(
    &'a self,
    caller: &'a Caller,
    input: NewPolicy,
  ) -> impl Future<Output = Result<Policy>> + Send + 'a;

  /// Apply `patch`. When any stored field actually changes, the pre-update
  /// row is first snapshotted into the version history with the next
  /// version number, and the status is forced back to draft. `updated_at`
  /// and `updated_by` are stamped by the store.
  fn update_policy<'a>(
    &'a self,
    caller: &'a Caller,
    policy_id: &'a str,
    patch: PolicyPatch,
  ) -> impl Future<Output = Result<Policy>> + Send + 'a;

  /// Promote a draft to approved. Rejects a policy that is already
  /// approved.
  fn approve_policy<'a>(
    &'a self,
    caller: &'a Caller,
    policy_id: &'a str,
  ) -> impl Future<Output = Result<Policy>> + Send + 'a;

  /// Delete a policy. Version rows cascade away with it; suggestions keep
  /// their row and lose the link.
  fn delete_policy<'a>(
    &'a self,
    caller: &'a Caller,
    policy_id: &'a str,
  ) -> impl Future<Output = Result<()>> + Send + 'a;

  /// Version history for a policy, newest first.
  fn list_policy_versions<'a>(
    &'a self,
    caller: &'a Caller,
    policy_id: &'a str,
  ) -> impl Future<Output = Result<Vec<PolicyVersion>>> + Send + 'a;

  // ── Bylaws ────────────────────────────────────────────────────────────

  fn list_bylaws<'a>(
    &'a self,
    caller: &'a Caller,
    query: &'a BylawQuery,
  ) -> impl Future<Output = Result<Vec<Bylaw>>> + Send + 'a;

  fn get_bylaw<'a>(
    &'a self,
    caller: &'a Caller,
    number: i64,
  ) -> impl Future<Output = Result<Option<Bylaw>>> + Send + 'a;

  fn create_bylaw<'a>(
    &'a self,
    caller: &'a Caller,
    input: NewBylaw,
  ) -> impl Future<Output = Result<Bylaw>> + Send + 'a;

  fn update_bylaw<'a>(
    &'a self,
    caller: &'a Caller,
    number: i64,
    patch: BylawPatch,
  ) -> impl Future<Output = Result<Bylaw>> + Send + 'a;

  fn approve_bylaw<'a>(
    &'a self,
    caller: &'a Caller,
    number: i64,
  ) -> impl Future<Output = Result<Bylaw>> + Send + 'a;

  fn delete_bylaw<'a>(
    &'a self,
    caller: &'a Caller,
    number: i64,
  ) -> impl Future<Output = Result<()>> + Send + 'a;

  // ── Suggestions ───────────────────────────────────────────────────────

  /// Create a suggestion. Open to every caller; the named target must
  /// exist and at least one target must be named.
  fn create_suggestion<'a>(
    &'a self,
    caller: &'a Caller,
    input: NewSuggestion,
  ) -> impl Future<Output = Result<SuggestionListing>> + Send + 'a;

  /// List suggestions with their linked-target display data, newest first.
  fn list_suggestions<'a>(
    &'a self,
    caller: &'a Caller,
    query: &'a SuggestionQuery,
  ) -> impl Future<Output = Result<Vec<SuggestionListing>>> + Send + 'a;

  fn update_suggestion<'a>(
    &'a self,
    caller: &'a Caller,
    id: Uuid,
    patch: SuggestionPatch,
  ) -> impl Future<Output = Result<SuggestionListing>> + Send + 'a;

  fn delete_suggestion<'a>(
    &'a self,
    caller: &'a Caller,
    id: Uuid,
  ) -> impl Future<Output = Result<()>> + Send + 'a;

  // ── Reviews ───────────────────────────────────────────────────────────

  /// Record the caller's review of `policy_id`, replacing any earlier one
  /// by the same email. `created_at` is preserved across replacement;
  /// `updated_at` is re-stamped.
  fn submit_review<'a>(
    &'a self,
    caller: &'a Caller,
    policy_id: &'a str,
    status: ReviewStatus,
  ) -> impl Future<Output = Result<()>> + Send + 'a;

  /// Aggregate reviews for a policy. Authenticated callers only.
  fn review_tally<'a>(
    &'a self,
    caller: &'a Caller,
    policy_id: &'a str,
  ) -> impl Future<Output = Result<ReviewTally>> + Send + 'a;

  /// Delete every review row. Returns the number removed.
  fn reset_all_reviews<'a>(
    &'a self,
    caller: &'a Caller,
  ) -> impl Future<Output = Result<usize>> + Send + 'a;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Fetch a user row by provider subject id.
  fn get_user<'a>(
    &'a self,
    caller: &'a Caller,
    user_id: &'a str,
  ) -> impl Future<Output = Result<Option<User>>> + Send + 'a;

  /// Auth-integration upsert: create the row with role `public` on first
  /// sight of a verified subject, otherwise return the existing row
  /// unchanged. Service path only.
  fn ensure_user<'a>(
    &'a self,
    caller: &'a Caller,
    user_id: &'a str,
    email: &'a str,
  ) -> impl Future<Output = Result<User>> + Send + 'a;

  fn list_users<'a>(
    &'a self,
    caller: &'a Caller,
  ) -> impl Future<Output = Result<Vec<User>>> + Send + 'a;

  fn set_user_role<'a>(
    &'a self,
    caller: &'a Caller,
    user_id: &'a str,
    role: Role,
  ) -> impl Future<Output = Result<User>> + Send + 'a;

  fn delete_user<'a>(
    &'a self,
    caller: &'a Caller,
    user_id: &'a str,
  ) -> impl Future<Output = Result<()>> + Send + 'a;
}
