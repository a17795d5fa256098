//! `guardian init` (spec.md §4.8): scaffold a default policy and make sure
//! the workspace's `.gitignore` excludes the audit log and its rotated
//! backups.

use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::policy::{self, defaults};

const GITIGNORE_ENTRIES: &[&str] = &[".guardian/audit.jsonl", ".guardian/*.bak"];

pub fn run(cwd: &Path, force: bool) -> Result<()> {
    let path = policy::policy_path(cwd);

    if path.exists() && !force {
        bail!(
            "policy already exists at {} (pass --force to overwrite)",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let policy = defaults::default_policy();
    let json = serde_json::to_string_pretty(&policy).context("failed to serialize default policy")?;
    std::fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;

    amend_gitignore(cwd)?;

    println!("Initialized Guardian policy at {}", path.display());
    Ok(())
}

fn amend_gitignore(cwd: &Path) -> Result<()> {
    let gitignore_path = cwd.join(".gitignore");
    let existing = std::fs::read_to_string(&gitignore_path).unwrap_or_default();

    let missing: Vec<&str> = GITIGNORE_ENTRIES
        .iter()
        .copied()
        .filter(|entry| !existing.lines().any(|line| line.trim() == *entry))
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    let mut updated = existing;
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    for entry in missing {
        updated.push_str(entry);
        updated.push('\n');
    }

    std::fs::write(&gitignore_path, updated)
        .with_context(|| format!("failed to write {}", gitignore_path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn init_scaffolds_policy_and_gitignore() {
        let dir = TempDir::new().unwrap();
        run(dir.path(), false).unwrap();

        assert!(policy::policy_path(dir.path()).exists());
        let gitignore = std::fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert!(gitignore.contains(".guardian/audit.jsonl"));
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let dir = TempDir::new().unwrap();
        run(dir.path(), false).unwrap();
        assert!(run(dir.path(), false).is_err());
        assert!(run(dir.path(), true).is_ok());
    }

    #[test]
    fn init_does_not_duplicate_gitignore_entries() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".gitignore"), ".guardian/audit.jsonl\n").unwrap();
        run(dir.path(), false).unwrap();
        let gitignore = std::fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert_eq!(gitignore.matches(".guardian/audit.jsonl").count(), 1);
    }
}
