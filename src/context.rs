//! Per-process state (spec.md §9, REDESIGN FLAGS): the policy cache,
//! compiled pattern cache, action counter, and audit sequence/last-hash all
//! live in one `GuardianContext` instead of module-scoped statics. That
//! keeps repeated invocations within a single test process — or a host
//! that reuses the process across requests — isolated from one another.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use crate::error::Result;
use crate::patterns::CompiledPatterns;
use crate::policy::{self, types::Policy};

/// A loaded policy plus its compiled regex sets, cached until the backing
/// file's modification time changes.
pub struct CompiledPolicy {
    pub policy: Policy,
    pub patterns: CompiledPatterns,
}

struct PolicyCache {
    path: PathBuf,
    mtime: Option<SystemTime>,
    compiled: Arc<CompiledPolicy>,
}

/// State tracked for the currently-open audit file: the last sequence
/// number and hash, recovered from the file's tail on first use and reset
/// whenever the file rotates.
pub struct AuditState {
    pub path: PathBuf,
    pub seq: u64,
    pub last_hash: String,
}

pub struct GuardianContext {
    pub cwd: PathBuf,
    policy_cache: Option<PolicyCache>,
    action_count: u64,
    pub audit_state: Option<AuditState>,
}

impl GuardianContext {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            policy_cache: None,
            action_count: 0,
            audit_state: None,
        }
    }

    /// Loads (and compiles) the policy for `self.cwd`, reusing the cached
    /// value as long as the file's modification time hasn't changed. A
    /// file that disappeared or can no longer be stat'd forces a reload.
    pub fn policy(&mut self) -> Result<Arc<CompiledPolicy>> {
        let path = policy::policy_path(&self.cwd);
        let current_mtime = std::fs::metadata(&path).and_then(|m| m.modified()).ok();

        if let Some(cache) = &self.policy_cache {
            if cache.path == path && cache.mtime == current_mtime && current_mtime.is_some() {
                return Ok(cache.compiled.clone());
            }
        }

        let loaded = policy::load_from_path(&path)?;
        let patterns = CompiledPatterns::compile(&loaded)?;
        let compiled = Arc::new(CompiledPolicy {
            policy: loaded,
            patterns,
        });

        self.policy_cache = Some(PolicyCache {
            path,
            mtime: current_mtime,
            compiled: compiled.clone(),
        });

        Ok(compiled)
    }

    /// Increments and returns the process-local action counter. Called
    /// once per request regardless of whether budget enforcement is
    /// enabled (spec.md §4.4 step 4).
    pub fn increment_action_count(&mut self) -> u64 {
        self.action_count += 1;
        self.action_count
    }

    pub fn action_count(&self) -> u64 {
        self.action_count
    }
}

pub fn resolve_path(cwd: &Path, raw: &str) -> PathBuf {
    let candidate = Path::new(raw);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        cwd.join(candidate)
    }
}
