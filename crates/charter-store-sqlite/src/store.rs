//! [`SqliteStore`] — the SQLite implementation of [`GovernanceStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use charter_core::{
  Error, Result,
  authz::{Operation, Resource, authorize, check},
  bylaw::{Bylaw, BylawPatch, NewBylaw},
  identity::{Caller, Role},
  policy::{NewPolicy, Policy, PolicyPatch, PolicyVersion},
  review::{ReviewGroup, ReviewStatus, ReviewTally},
  store::{BylawQuery, GovernanceStore, PolicyQuery, SuggestionQuery},
  suggestion::{NewSuggestion, SuggestionListing, SuggestionPatch},
  user::User,
};

use crate::{
  encode::{
    RawBylaw, RawPolicy, RawSuggestion, RawUser, RawVersion, encode_document_status, encode_dt,
    encode_review_status, encode_role, encode_suggestion_status, encode_uuid,
  },
  error::{CallResultExt as _, domain},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Charter governance store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// The single write-path hook for `updated_at`: every INSERT and UPDATE
/// takes its timestamp from here. Callers cannot supply one; patch types
/// carry no such field.
fn stamp() -> String {
  encode_dt(Utc::now())
}

/// `%substring%` pattern for the case-insensitive LIKE filters.
fn like_pattern(term: &str) -> String {
  format!("%{}%", term.to_lowercase())
}

// ─── Row mappers ─────────────────────────────────────────────────────────────

const POLICY_COLS: &str =
  "id, policy_id, name, section, content, status, created_at, updated_at, created_by, updated_by";

fn policy_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawPolicy> {
  Ok(RawPolicy {
    id:         row.get(0)?,
    policy_id:  row.get(1)?,
    name:       row.get(2)?,
    section:    row.get(3)?,
    content:    row.get(4)?,
    status:     row.get(5)?,
    created_at: row.get(6)?,
    updated_at: row.get(7)?,
    created_by: row.get(8)?,
    updated_by: row.get(9)?,
  })
}

const BYLAW_COLS: &str =
  "id, number, title, content, status, created_at, updated_at, created_by, updated_by";

fn bylaw_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawBylaw> {
  Ok(RawBylaw {
    id:         row.get(0)?,
    number:     row.get(1)?,
    title:      row.get(2)?,
    content:    row.get(3)?,
    status:     row.get(4)?,
    created_at: row.get(5)?,
    updated_at: row.get(6)?,
    created_by: row.get(7)?,
    updated_by: row.get(8)?,
  })
}

const VERSION_COLS: &str =
  "id, policy_id, version_number, name, section, content, status, created_at, created_by";

fn version_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawVersion> {
  Ok(RawVersion {
    id:             row.get(0)?,
    policy_id:      row.get(1)?,
    version_number: row.get(2)?,
    name:           row.get(3)?,
    section:        row.get(4)?,
    content:        row.get(5)?,
    status:         row.get(6)?,
    created_at:     row.get(7)?,
    created_by:     row.get(8)?,
  })
}

/// Suggestions joined with their target's display columns.
const SUGGESTION_SELECT: &str = "SELECT s.id, s.policy_id, s.bylaw_id, s.suggestion, s.status,
          s.created_at, s.updated_at,
          p.policy_id, p.name, b.number, b.title
   FROM suggestions s
   LEFT JOIN policies p ON p.id = s.policy_id
   LEFT JOIN bylaws   b ON b.id = s.bylaw_id";

fn suggestion_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawSuggestion> {
  Ok(RawSuggestion {
    id:            row.get(0)?,
    policy_id:     row.get(1)?,
    bylaw_id:      row.get(2)?,
    suggestion:    row.get(3)?,
    status:        row.get(4)?,
    created_at:    row.get(5)?,
    updated_at:    row.get(6)?,
    policy_ext_id: row.get(7)?,
    policy_name:   row.get(8)?,
    bylaw_number:  row.get(9)?,
    bylaw_title:   row.get(10)?,
  })
}

fn user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawUser> {
  Ok(RawUser {
    id:         row.get(0)?,
    email:      row.get(1)?,
    name:       row.get(2)?,
    role:       row.get(3)?,
    created_at: row.get(4)?,
  })
}

// ─── Construction ────────────────────────────────────────────────────────────

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path)
      .await
      .map_err(|e| Error::Backend(Box::new(e)))?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory()
      .await
      .map_err(|e| Error::Backend(Box::new(e)))?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await
      .domainify()
  }

  /// Raw connection access for schema-level test assertions.
  #[cfg(test)]
  pub(crate) fn raw(&self) -> &tokio_rusqlite::Connection {
    &self.conn
  }
}

// ─── GovernanceStore impl ────────────────────────────────────────────────────

impl GovernanceStore for SqliteStore {
  // ── Policies ──────────────────────────────────────────────────────────────

  async fn list_policies(&self, caller: &Caller, query: &PolicyQuery) -> Result<Vec<Policy>> {
    // No up-front check: the public read predicate is row-dependent, so the
    // privilege gate moves into the query as a status filter.
    let privileged =
      authorize(caller, Operation::Select, Resource::Policy { status: None }) as i64;

    let status  = query.status.map(encode_document_status).map(str::to_owned);
    let section = query.section.clone();
    let ext_id  = query.policy_id.clone();
    let search  = query.search.as_deref().map(like_pattern);
    let limit   = query.limit.unwrap_or(100) as i64;
    let offset  = query.offset.unwrap_or(0) as i64;

    let raws: Vec<RawPolicy> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {POLICY_COLS} FROM policies
           WHERE (?1 IS NULL OR status = ?1)
             AND (?2 IS NULL OR section = ?2)
             AND (?3 IS NULL OR policy_id = ?3)
             AND (?4 IS NULL OR LOWER(name) LIKE ?4
                  OR LOWER(policy_id) LIKE ?4 OR LOWER(content) LIKE ?4)
             AND (?5 = 1 OR status = 'approved')
           ORDER BY section, policy_id
           LIMIT ?6 OFFSET ?7"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![status, section, ext_id, search, privileged, limit, offset],
            policy_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .domainify()?;

    raws.into_iter().map(RawPolicy::into_policy).collect()
  }

  async fn get_policy(&self, caller: &Caller, policy_id: &str) -> Result<Option<Policy>> {
    let ext_id = policy_id.to_owned();

    let raw: Option<RawPolicy> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {POLICY_COLS} FROM policies WHERE policy_id = ?1"),
              rusqlite::params![ext_id],
              policy_row,
            )
            .optional()?,
        )
      })
      .await
      .domainify()?;

    let Some(policy) = raw.map(RawPolicy::into_policy).transpose()? else {
      return Ok(None);
    };

    // An existing row the caller may not see reads as absent.
    if !authorize(caller, Operation::Select, Resource::Policy { status: Some(policy.status) }) {
      return Ok(None);
    }
    Ok(Some(policy))
  }

  async fn create_policy(&self, caller: &Caller, input: NewPolicy) -> Result<Policy> {
    check(caller, Operation::Insert, Resource::Policy { status: None })?;

    let actor = caller.user_id().map(str::to_owned);
    let now_str = stamp();
    let id_str = encode_uuid(Uuid::new_v4());

    let raw: RawPolicy = self
      .conn
      .call(move |conn| {
        let taken: bool = conn
          .query_row(
            "SELECT 1 FROM policies WHERE policy_id = ?1",
            rusqlite::params![input.policy_id],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if taken {
          return Err(domain(Error::DuplicatePolicyId(input.policy_id)));
        }

        conn.execute(
          "INSERT INTO policies (
             id, policy_id, name, section, content, status,
             created_at, updated_at, created_by, updated_by
           ) VALUES (?1, ?2, ?3, ?4, ?5, 'draft', ?6, ?6, ?7, ?7)",
          rusqlite::params![
            id_str,
            input.policy_id,
            input.name,
            input.section,
            input.content,
            now_str,
            actor,
          ],
        )?;

        let row = conn.query_row(
          &format!("SELECT {POLICY_COLS} FROM policies WHERE id = ?1"),
          rusqlite::params![id_str],
          policy_row,
        )?;
        Ok(row)
      })
      .await
      .domainify()?;

    raw.into_policy()
  }

  async fn update_policy(
    &self,
    caller: &Caller,
    policy_id: &str,
    patch: PolicyPatch,
  ) -> Result<Policy> {
    check(caller, Operation::Update, Resource::Policy { status: None })?;

    let actor = caller.user_id().map(str::to_owned);
    let ext_id = policy_id.to_owned();
    let now_str = stamp();

    let raw: RawPolicy = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let existing = tx
          .query_row(
            &format!("SELECT {POLICY_COLS} FROM policies WHERE policy_id = ?1"),
            rusqlite::params![ext_id],
            policy_row,
          )
          .optional()?
          .ok_or_else(|| domain(Error::PolicyNotFound(ext_id.clone())))?;
        let existing = existing.into_policy().map_err(domain)?;

        // Snapshot the pre-update state when something actually changes.
        if patch.changes(&existing) {
          let parent_id = encode_uuid(existing.id);
          let next: i64 = tx.query_row(
            "SELECT COALESCE(MAX(version_number), 0) + 1
             FROM policy_versions WHERE policy_id = ?1",
            rusqlite::params![parent_id],
            |r| r.get(0),
          )?;
          tx.execute(
            "INSERT INTO policy_versions (
               id, policy_id, version_number, name, section, content,
               status, created_at, created_by
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            rusqlite::params![
              encode_uuid(Uuid::new_v4()),
              parent_id,
              next,
              existing.name,
              existing.section,
              existing.content,
              encode_document_status(existing.status),
              now_str,
              actor,
            ],
          )?;
        }

        // Any edit forces the document back to draft; only the approve
        // operation promotes it again.
        let name    = patch.name.unwrap_or_else(|| existing.name.clone());
        let section = patch.section.unwrap_or_else(|| existing.section.clone());
        let content = patch.content.unwrap_or_else(|| existing.content.clone());

        tx.execute(
          "UPDATE policies
           SET name = ?1, section = ?2, content = ?3, status = 'draft',
               updated_at = ?4, updated_by = ?5
           WHERE policy_id = ?6",
          rusqlite::params![name, section, content, now_str, actor, ext_id],
        )?;

        let updated = tx.query_row(
          &format!("SELECT {POLICY_COLS} FROM policies WHERE policy_id = ?1"),
          rusqlite::params![ext_id],
          policy_row,
        )?;

        tx.commit()?;
        Ok(updated)
      })
      .await
      .domainify()?;

    raw.into_policy()
  }

  async fn approve_policy(&self, caller: &Caller, policy_id: &str) -> Result<Policy> {
    check(caller, Operation::Update, Resource::Policy { status: None })?;

    let actor = caller.user_id().map(str::to_owned);
    let ext_id = policy_id.to_owned();
    let now_str = stamp();

    let raw: RawPolicy = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let status: String = tx
          .query_row(
            "SELECT status FROM policies WHERE policy_id = ?1",
            rusqlite::params![ext_id],
            |r| r.get(0),
          )
          .optional()?
          .ok_or_else(|| domain(Error::PolicyNotFound(ext_id.clone())))?;
        if status == "approved" {
          return Err(domain(Error::AlreadyApproved(ext_id)));
        }

        tx.execute(
          "UPDATE policies
           SET status = 'approved', updated_at = ?1, updated_by = ?2
           WHERE policy_id = ?3",
          rusqlite::params![now_str, actor, ext_id],
        )?;

        let updated = tx.query_row(
          &format!("SELECT {POLICY_COLS} FROM policies WHERE policy_id = ?1"),
          rusqlite::params![ext_id],
          policy_row,
        )?;

        tx.commit()?;
        Ok(updated)
      })
      .await
      .domainify()?;

    raw.into_policy()
  }

  async fn delete_policy(&self, caller: &Caller, policy_id: &str) -> Result<()> {
    check(caller, Operation::Delete, Resource::Policy { status: None })?;

    let ext_id = policy_id.to_owned();
    self
      .conn
      .call(move |conn| {
        // Versions cascade, suggestion links null out (schema FK clauses).
        let affected = conn.execute(
          "DELETE FROM policies WHERE policy_id = ?1",
          rusqlite::params![ext_id],
        )?;
        if affected == 0 {
          return Err(domain(Error::PolicyNotFound(ext_id)));
        }
        Ok(())
      })
      .await
      .domainify()
  }

  async fn list_policy_versions(
    &self,
    caller: &Caller,
    policy_id: &str,
  ) -> Result<Vec<PolicyVersion>> {
    check(caller, Operation::Select, Resource::PolicyVersion)?;

    let ext_id = policy_id.to_owned();
    let raws: Vec<RawVersion> = self
      .conn
      .call(move |conn| {
        let parent: String = conn
          .query_row(
            "SELECT id FROM policies WHERE policy_id = ?1",
            rusqlite::params![ext_id],
            |r| r.get(0),
          )
          .optional()?
          .ok_or_else(|| domain(Error::PolicyNotFound(ext_id)))?;

        let mut stmt = conn.prepare(&format!(
          "SELECT {VERSION_COLS} FROM policy_versions
           WHERE policy_id = ?1
           ORDER BY version_number DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![parent], version_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .domainify()?;

    raws.into_iter().map(RawVersion::into_version).collect()
  }

  // ── Bylaws ────────────────────────────────────────────────────────────────

  async fn list_bylaws(&self, caller: &Caller, query: &BylawQuery) -> Result<Vec<Bylaw>> {
    let privileged =
      authorize(caller, Operation::Select, Resource::Bylaw { status: None }) as i64;

    let status = query.status.map(encode_document_status).map(str::to_owned);
    let search = query.search.as_deref().map(like_pattern);
    let limit  = query.limit.unwrap_or(100) as i64;
    let offset = query.offset.unwrap_or(0) as i64;

    let raws: Vec<RawBylaw> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {BYLAW_COLS} FROM bylaws
           WHERE (?1 IS NULL OR status = ?1)
             AND (?2 IS NULL OR LOWER(title) LIKE ?2 OR LOWER(content) LIKE ?2)
             AND (?3 = 1 OR status = 'approved')
           ORDER BY number
           LIMIT ?4 OFFSET ?5"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![status, search, privileged, limit, offset],
            bylaw_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .domainify()?;

    raws.into_iter().map(RawBylaw::into_bylaw).collect()
  }

  async fn get_bylaw(&self, caller: &Caller, number: i64) -> Result<Option<Bylaw>> {
    let raw: Option<RawBylaw> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {BYLAW_COLS} FROM bylaws WHERE number = ?1"),
              rusqlite::params![number],
              bylaw_row,
            )
            .optional()?,
        )
      })
      .await
      .domainify()?;

    let Some(bylaw) = raw.map(RawBylaw::into_bylaw).transpose()? else {
      return Ok(None);
    };
    if !authorize(caller, Operation::Select, Resource::Bylaw { status: Some(bylaw.status) }) {
      return Ok(None);
    }
    Ok(Some(bylaw))
  }

  async fn create_bylaw(&self, caller: &Caller, input: NewBylaw) -> Result<Bylaw> {
    check(caller, Operation::Insert, Resource::Bylaw { status: None })?;

    let actor = caller.user_id().map(str::to_owned);
    let now_str = stamp();
    let id_str = encode_uuid(Uuid::new_v4());

    let raw: RawBylaw = self
      .conn
      .call(move |conn| {
        let taken: bool = conn
          .query_row(
            "SELECT 1 FROM bylaws WHERE number = ?1",
            rusqlite::params![input.number],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if taken {
          return Err(domain(Error::DuplicateBylawNumber(input.number)));
        }

        conn.execute(
          "INSERT INTO bylaws (
             id, number, title, content, status,
             created_at, updated_at, created_by, updated_by
           ) VALUES (?1, ?2, ?3, ?4, 'draft', ?5, ?5, ?6, ?6)",
          rusqlite::params![id_str, input.number, input.title, input.content, now_str, actor],
        )?;

        let row = conn.query_row(
          &format!("SELECT {BYLAW_COLS} FROM bylaws WHERE id = ?1"),
          rusqlite::params![id_str],
          bylaw_row,
        )?;
        Ok(row)
      })
      .await
      .domainify()?;

    raw.into_bylaw()
  }

  async fn update_bylaw(&self, caller: &Caller, number: i64, patch: BylawPatch) -> Result<Bylaw> {
    check(caller, Operation::Update, Resource::Bylaw { status: None })?;

    let actor = caller.user_id().map(str::to_owned);
    let now_str = stamp();

    let raw: RawBylaw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let existing = tx
          .query_row(
            &format!("SELECT {BYLAW_COLS} FROM bylaws WHERE number = ?1"),
            rusqlite::params![number],
            bylaw_row,
          )
          .optional()?
          .ok_or_else(|| domain(Error::BylawNotFound(number)))?;

        let new_number = patch.number.unwrap_or(existing.number);
        if new_number != existing.number {
          let taken: bool = tx
            .query_row(
              "SELECT 1 FROM bylaws WHERE number = ?1",
              rusqlite::params![new_number],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
          if taken {
            return Err(domain(Error::DuplicateBylawNumber(new_number)));
          }
        }

        let title   = patch.title.unwrap_or_else(|| existing.title.clone());
        let content = patch.content.unwrap_or_else(|| existing.content.clone());

        tx.execute(
          "UPDATE bylaws
           SET number = ?1, title = ?2, content = ?3, status = 'draft',
               updated_at = ?4, updated_by = ?5
           WHERE id = ?6",
          rusqlite::params![new_number, title, content, now_str, actor, existing.id],
        )?;

        let updated = tx.query_row(
          &format!("SELECT {BYLAW_COLS} FROM bylaws WHERE id = ?1"),
          rusqlite::params![existing.id],
          bylaw_row,
        )?;

        tx.commit()?;
        Ok(updated)
      })
      .await
      .domainify()?;

    raw.into_bylaw()
  }

  async fn approve_bylaw(&self, caller: &Caller, number: i64) -> Result<Bylaw> {
    check(caller, Operation::Update, Resource::Bylaw { status: None })?;

    let actor = caller.user_id().map(str::to_owned);
    let now_str = stamp();

    let raw: RawBylaw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let status: String = tx
          .query_row(
            "SELECT status FROM bylaws WHERE number = ?1",
            rusqlite::params![number],
            |r| r.get(0),
          )
          .optional()?
          .ok_or_else(|| domain(Error::BylawNotFound(number)))?;
        if status == "approved" {
          return Err(domain(Error::AlreadyApproved(number.to_string())));
        }

        tx.execute(
          "UPDATE bylaws
           SET status = 'approved', updated_at = ?1, updated_by = ?2
           WHERE number = ?3",
          rusqlite::params![now_str, actor, number],
        )?;

        let updated = tx.query_row(
          &format!("SELECT {BYLAW_COLS} FROM bylaws WHERE number = ?1"),
          rusqlite::params![number],
          bylaw_row,
        )?;

        tx.commit()?;
        Ok(updated)
      })
      .await
      .domainify()?;

    raw.into_bylaw()
  }

  async fn delete_bylaw(&self, caller: &Caller, number: i64) -> Result<()> {
    check(caller, Operation::Delete, Resource::Bylaw { status: None })?;

    self
      .conn
      .call(move |conn| {
        let affected = conn.execute(
          "DELETE FROM bylaws WHERE number = ?1",
          rusqlite::params![number],
        )?;
        if affected == 0 {
          return Err(domain(Error::BylawNotFound(number)));
        }
        Ok(())
      })
      .await
      .domainify()
  }

  // ── Suggestions ───────────────────────────────────────────────────────────

  async fn create_suggestion(
    &self,
    caller: &Caller,
    input: NewSuggestion,
  ) -> Result<SuggestionListing> {
    check(caller, Operation::Insert, Resource::Suggestion)?;

    if input.policy_id.is_none() && input.bylaw_number.is_none() {
      return Err(Error::SuggestionTargetMissing);
    }

    let now_str = stamp();
    let id_str = encode_uuid(Uuid::new_v4());

    let raw: RawSuggestion = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        // Resolve external identifiers to internal row ids; a named target
        // must exist.
        let policy_key: Option<String> = match &input.policy_id {
          Some(ext) => Some(
            tx.query_row(
              "SELECT id FROM policies WHERE policy_id = ?1",
              rusqlite::params![ext],
              |r| r.get(0),
            )
            .optional()?
            .ok_or_else(|| domain(Error::PolicyNotFound(ext.clone())))?,
          ),
          None => None,
        };
        let bylaw_key: Option<String> = match input.bylaw_number {
          Some(number) => Some(
            tx.query_row(
              "SELECT id FROM bylaws WHERE number = ?1",
              rusqlite::params![number],
              |r| r.get(0),
            )
            .optional()?
            .ok_or_else(|| domain(Error::BylawNotFound(number)))?,
          ),
          None => None,
        };

        tx.execute(
          "INSERT INTO suggestions (
             id, policy_id, bylaw_id, suggestion, status, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, 'pending', ?5, ?5)",
          rusqlite::params![id_str, policy_key, bylaw_key, input.suggestion, now_str],
        )?;

        let row = tx.query_row(
          &format!("{SUGGESTION_SELECT} WHERE s.id = ?1"),
          rusqlite::params![id_str],
          suggestion_row,
        )?;

        tx.commit()?;
        Ok(row)
      })
      .await
      .domainify()?;

    raw.into_listing()
  }

  async fn list_suggestions(
    &self,
    caller: &Caller,
    query: &SuggestionQuery,
  ) -> Result<Vec<SuggestionListing>> {
    check(caller, Operation::Select, Resource::Suggestion)?;

    let status = query.status.map(encode_suggestion_status).map(str::to_owned);
    let ext_id = query.policy_id.clone();
    let number = query.bylaw_number;
    let limit  = query.limit.unwrap_or(100) as i64;
    let offset = query.offset.unwrap_or(0) as i64;

    let raws: Vec<RawSuggestion> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "{SUGGESTION_SELECT}
           WHERE (?1 IS NULL OR s.status = ?1)
             AND (?2 IS NULL OR p.policy_id = ?2)
             AND (?3 IS NULL OR b.number = ?3)
           ORDER BY s.created_at DESC
           LIMIT ?4 OFFSET ?5"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![status, ext_id, number, limit, offset],
            suggestion_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .domainify()?;

    raws.into_iter().map(RawSuggestion::into_listing).collect()
  }

  async fn update_suggestion(
    &self,
    caller: &Caller,
    id: Uuid,
    patch: SuggestionPatch,
  ) -> Result<SuggestionListing> {
    check(caller, Operation::Update, Resource::Suggestion)?;

    let id_str = encode_uuid(id);
    let now_str = stamp();
    let status = patch.status.map(encode_suggestion_status).map(str::to_owned);
    let text   = patch.suggestion;

    let raw: RawSuggestion = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let exists: bool = tx
          .query_row(
            "SELECT 1 FROM suggestions WHERE id = ?1",
            rusqlite::params![id_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !exists {
          return Err(domain(Error::SuggestionNotFound(id)));
        }

        tx.execute(
          "UPDATE suggestions
           SET status     = COALESCE(?1, status),
               suggestion = COALESCE(?2, suggestion),
               updated_at = ?3
           WHERE id = ?4",
          rusqlite::params![status, text, now_str, id_str],
        )?;

        let row = tx.query_row(
          &format!("{SUGGESTION_SELECT} WHERE s.id = ?1"),
          rusqlite::params![id_str],
          suggestion_row,
        )?;

        tx.commit()?;
        Ok(row)
      })
      .await
      .domainify()?;

    raw.into_listing()
  }

  async fn delete_suggestion(&self, caller: &Caller, id: Uuid) -> Result<()> {
    check(caller, Operation::Delete, Resource::Suggestion)?;

    let id_str = encode_uuid(id);
    self
      .conn
      .call(move |conn| {
        let affected = conn.execute(
          "DELETE FROM suggestions WHERE id = ?1",
          rusqlite::params![id_str],
        )?;
        if affected == 0 {
          return Err(domain(Error::SuggestionNotFound(id)));
        }
        Ok(())
      })
      .await
      .domainify()
  }

  // ── Reviews ───────────────────────────────────────────────────────────────

  async fn submit_review(
    &self,
    caller: &Caller,
    policy_id: &str,
    status: ReviewStatus,
  ) -> Result<()> {
    // Reviews are always written as the caller's own row, so the email-match
    // predicate reduces to "has a verified email".
    let email = caller.email().ok_or(Error::Unauthenticated)?.to_owned();
    check(caller, Operation::Insert, Resource::Review { user_email: Some(&email) })?;

    let ext_id = policy_id.to_owned();
    let status_str = encode_review_status(status).to_owned();
    let now_str = stamp();
    let id_str = encode_uuid(Uuid::new_v4());

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        // The text reference to policies.policy_id is app-enforced.
        let policy_exists: bool = tx
          .query_row(
            "SELECT 1 FROM policies WHERE policy_id = ?1",
            rusqlite::params![ext_id],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !policy_exists {
          return Err(domain(Error::PolicyNotFound(ext_id)));
        }

        // One row per (policy, email): a resubmission replaces the opinion
        // in place, keeping created_at.
        let existing: Option<String> = tx
          .query_row(
            "SELECT id FROM policy_reviews WHERE policy_id = ?1 AND user_email = ?2",
            rusqlite::params![ext_id, email],
            |r| r.get(0),
          )
          .optional()?;

        match existing {
          Some(review_id) => {
            tx.execute(
              "UPDATE policy_reviews
               SET review_status = ?1, updated_at = ?2
               WHERE id = ?3",
              rusqlite::params![status_str, now_str, review_id],
            )?;
          }
          None => {
            tx.execute(
              "INSERT INTO policy_reviews (
                 id, policy_id, user_email, review_status, created_at, updated_at
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
              rusqlite::params![id_str, ext_id, email, status_str, now_str],
            )?;
          }
        }

        tx.commit()?;
        Ok(())
      })
      .await
      .domainify()
  }

  async fn review_tally(&self, caller: &Caller, policy_id: &str) -> Result<ReviewTally> {
    check(caller, Operation::Select, Resource::Review { user_email: None })?;

    let ext_id = policy_id.to_owned();
    let rows: Vec<(String, String)> = self
      .conn
      .call(move |conn| {
        let policy_exists: bool = conn
          .query_row(
            "SELECT 1 FROM policies WHERE policy_id = ?1",
            rusqlite::params![ext_id],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !policy_exists {
          return Err(domain(Error::PolicyNotFound(ext_id)));
        }

        let mut stmt = conn.prepare(
          "SELECT review_status, user_email FROM policy_reviews
           WHERE policy_id = ?1
           ORDER BY user_email",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![ext_id], |r| Ok((r.get(0)?, r.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .domainify()?;

    let mut confirmed = Vec::new();
    let mut needs_work = Vec::new();
    for (status, email) in rows {
      match crate::encode::decode_review_status(&status)? {
        ReviewStatus::Confirm => confirmed.push(email),
        ReviewStatus::NeedsWork => needs_work.push(email),
      }
    }

    Ok(ReviewTally {
      confirmed:  ReviewGroup::new(confirmed),
      needs_work: ReviewGroup::new(needs_work),
    })
  }

  async fn reset_all_reviews(&self, caller: &Caller) -> Result<usize> {
    check(caller, Operation::Delete, Resource::Review { user_email: None })?;

    self
      .conn
      .call(|conn| Ok(conn.execute("DELETE FROM policy_reviews", [])?))
      .await
      .domainify()
  }

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn get_user(&self, caller: &Caller, user_id: &str) -> Result<Option<User>> {
    check(caller, Operation::Select, Resource::User)?;

    let id = user_id.to_owned();
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT id, email, name, role, created_at FROM users WHERE id = ?1",
              rusqlite::params![id],
              user_row,
            )
            .optional()?,
        )
      })
      .await
      .domainify()?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn ensure_user(&self, caller: &Caller, user_id: &str, email: &str) -> Result<User> {
    check(caller, Operation::Insert, Resource::User)?;

    let id = user_id.to_owned();
    let email = email.to_owned();
    let now_str = stamp();

    let raw: RawUser = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let existing = tx
          .query_row(
            "SELECT id, email, name, role, created_at FROM users WHERE id = ?1",
            rusqlite::params![id],
            user_row,
          )
          .optional()?;
        if let Some(user) = existing {
          tx.commit()?;
          return Ok(user);
        }

        let email_taken: bool = tx
          .query_row(
            "SELECT 1 FROM users WHERE email = ?1",
            rusqlite::params![email],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if email_taken {
          return Err(domain(Error::DuplicateEmail(email)));
        }

        tx.execute(
          "INSERT INTO users (id, email, name, role, created_at)
           VALUES (?1, ?2, NULL, 'public', ?3)",
          rusqlite::params![id, email, now_str],
        )?;

        let user = tx.query_row(
          "SELECT id, email, name, role, created_at FROM users WHERE id = ?1",
          rusqlite::params![id],
          user_row,
        )?;

        tx.commit()?;
        Ok(user)
      })
      .await
      .domainify()?;

    raw.into_user()
  }

  async fn list_users(&self, caller: &Caller) -> Result<Vec<User>> {
    check(caller, Operation::Select, Resource::User)?;

    let raws: Vec<RawUser> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT id, email, name, role, created_at FROM users ORDER BY created_at",
        )?;
        let rows = stmt
          .query_map([], user_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .domainify()?;

    raws.into_iter().map(RawUser::into_user).collect()
  }

  async fn set_user_role(&self, caller: &Caller, user_id: &str, role: Role) -> Result<User> {
    check(caller, Operation::Update, Resource::User)?;

    let id = user_id.to_owned();
    let role_str = encode_role(role).to_owned();

    let raw: RawUser = self
      .conn
      .call(move |conn| {
        let affected = conn.execute(
          "UPDATE users SET role = ?1 WHERE id = ?2",
          rusqlite::params![role_str, id],
        )?;
        if affected == 0 {
          return Err(domain(Error::UserNotFound(id)));
        }
        let user = conn.query_row(
          "SELECT id, email, name, role, created_at FROM users WHERE id = ?1",
          rusqlite::params![id],
          user_row,
        )?;
        Ok(user)
      })
      .await
      .domainify()?;

    raw.into_user()
  }

  async fn delete_user(&self, caller: &Caller, user_id: &str) -> Result<()> {
    check(caller, Operation::Delete, Resource::User)?;

    let id = user_id.to_owned();
    self
      .conn
      .call(move |conn| {
        let affected =
          conn.execute("DELETE FROM users WHERE id = ?1", rusqlite::params![id])?;
        if affected == 0 {
          return Err(domain(Error::UserNotFound(id)));
        }
        Ok(())
      })
      .await
      .domainify()
  }
}
