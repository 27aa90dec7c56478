//! Error plumbing between the backend and `charter_core::Error`.
//!
//! Domain errors raised inside a [`tokio_rusqlite`] `call` closure cross the
//! thread boundary boxed in [`tokio_rusqlite::Error::Other`] and are
//! recovered by downcast on the async side; everything else becomes
//! [`charter_core::Error::Backend`].

use charter_core::Error as CoreError;
use thiserror::Error;

/// A column value that could not be decoded into its domain type.
#[derive(Debug, Error)]
#[error("decode error: {0}")]
pub struct DecodeError(pub String);

pub fn decode_err(msg: impl Into<String>) -> CoreError {
  CoreError::Backend(Box::new(DecodeError(msg.into())))
}

/// Wrap a domain error for transport out of a `call` closure.
pub fn domain(err: CoreError) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(err))
}

/// Recover the domain error smuggled through [`domain`], or fall back to a
/// backend fault.
pub fn unwrap_domain(err: tokio_rusqlite::Error) -> CoreError {
  match err {
    tokio_rusqlite::Error::Other(boxed) => match boxed.downcast::<CoreError>() {
      Ok(core) => *core,
      Err(other) => CoreError::Backend(other),
    },
    other => CoreError::Backend(Box::new(other)),
  }
}

/// Shorthand for `.await?`-ing a `call` and restoring domain errors.
pub trait CallResultExt<T> {
  fn domainify(self) -> Result<T, CoreError>;
}

impl<T> CallResultExt<T> for Result<T, tokio_rusqlite::Error> {
  fn domainify(self) -> Result<T, CoreError> {
    self.map_err(unwrap_domain)
  }
}
