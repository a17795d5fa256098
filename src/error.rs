//! Error taxonomy for the Guardian core.
//!
//! Internal library code returns one of these precise variants; the CLI's
//! outermost frame flattens them into `anyhow::Error` for reporting, while
//! the hook adapter (`crate::hook`) degrades every variant to an allow
//! decision instead of propagating it (see `docs` on `hook::run`).
//!
//! Two kinds from the design's error table are intentionally absent here:
//! a malformed cost file never becomes an `Err` (it is tolerated silently
//! by `budget::check`), and a broken audit chain is reported as data via
//! `audit::VerifyReport`, not as an exception.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum GuardianError {
    #[error("no policy file at {0}")]
    PolicyMissing(PathBuf),

    #[error("invalid policy file {path}: {message}")]
    PolicyInvalid { path: PathBuf, message: String },

    #[error("invalid pattern `{pattern}` in policy: {message}")]
    PatternInvalid { pattern: String, message: String },

    #[error("malformed hook input: {0}")]
    HookInputInvalid(String),

    #[error("audit log I/O error at {path}: {message}")]
    AuditIoError { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, GuardianError>;
