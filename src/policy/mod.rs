//! Policy loading and validation (spec.md §4.1).

pub mod defaults;
pub mod types;

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{GuardianError, Result};
use types::{Mode, Policy, CURRENT_POLICY_VERSION};

/// Resolves the on-disk location of the policy file for a workspace.
pub fn policy_path(cwd: &Path) -> PathBuf {
    cwd.join(".guardian").join("policy.json")
}

/// Reads and validates the policy document at `path`.
///
/// A missing file is `PolicyMissing`; malformed JSON or a schema violation
/// (unsupported version, unrecognized mode) is `PolicyInvalid` carrying the
/// underlying message. Other fields are accepted structurally.
pub fn load_from_path(path: &Path) -> Result<Policy> {
    let raw = fs::read_to_string(path).map_err(|_| GuardianError::PolicyMissing(path.to_path_buf()))?;

    let policy: Policy = serde_json::from_str(&raw).map_err(|e| GuardianError::PolicyInvalid {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    validate(&policy, path)?;
    Ok(policy)
}

fn validate(policy: &Policy, path: &Path) -> Result<()> {
    if policy.version != CURRENT_POLICY_VERSION {
        return Err(GuardianError::PolicyInvalid {
            path: path.to_path_buf(),
            message: format!(
                "unsupported policy version {} (expected {})",
                policy.version, CURRENT_POLICY_VERSION
            ),
        });
    }
    // `Mode` only deserializes to a recognized variant, so reaching here
    // already guarantees mode is one of enforce/audit/off.
    let _ = policy.mode;
    Ok(())
}

pub fn mode_allows_everything(mode: Mode) -> bool {
    matches!(mode, Mode::Off)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn minimal_policy_json() -> &'static str {
        r#"{
            "version": 1,
            "mode": "enforce",
            "blocklist": {},
            "allowlist": {},
            "scope": {"allowed_paths": ["{cwd}"], "denied_paths": [], "allow_outside_cwd": false},
            "audit": {},
            "kill_switch": {}
        }"#
    }

    #[test]
    fn missing_file_is_policy_missing() {
        let dir = TempDir::new().unwrap();
        let err = load_from_path(&policy_path(dir.path())).unwrap_err();
        assert!(matches!(err, GuardianError::PolicyMissing(_)));
    }

    #[test]
    fn malformed_json_is_policy_invalid() {
        let dir = TempDir::new().unwrap();
        let path = policy_path(dir.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{not json").unwrap();
        let err = load_from_path(&path).unwrap_err();
        assert!(matches!(err, GuardianError::PolicyInvalid { .. }));
    }

    #[test]
    fn wrong_version_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = policy_path(dir.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let json = minimal_policy_json().replace("\"version\": 1", "\"version\": 2");
        fs::write(&path, json).unwrap();
        let err = load_from_path(&path).unwrap_err();
        assert!(matches!(err, GuardianError::PolicyInvalid { .. }));
    }

    #[test]
    fn valid_minimal_policy_loads() {
        let dir = TempDir::new().unwrap();
        let path = policy_path(dir.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, minimal_policy_json()).unwrap();
        let policy = load_from_path(&path).unwrap();
        assert_eq!(policy.version, 1);
        assert_eq!(policy.mode, Mode::Enforce);
    }
}
