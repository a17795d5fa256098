//! Append-only, integrity-chained audit log (spec.md §4.5).

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::budget::BudgetState;
use crate::context::GuardianContext;
use crate::error::{GuardianError, Result};
use crate::pipeline::ValidationResult;
use crate::policy::types::{AuditConfig, Severity};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetSnapshot {
    pub remaining_usd: Option<f64>,
    pub action_count: u64,
}

/// A single recorded decision. Field order here is load-bearing: it is
/// the order `v, ts, sid, seq, tool, input, allowed, reason, severity,
/// policy_match, budget, cwd, hash` the hash chain is computed over, and
/// serde_json always serializes a struct's fields in declaration order
/// (unlike a `Value::Object`, whose map representation is not a
/// canonicalization guarantee across `serde_json` versions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub v: u32,
    pub ts: String,
    pub sid: Option<String>,
    pub seq: u64,
    pub tool: String,
    pub input: Option<Value>,
    pub allowed: bool,
    pub reason: Option<String>,
    pub severity: Option<Severity>,
    pub policy_match: Option<String>,
    pub budget: Option<BudgetSnapshot>,
    pub cwd: Option<String>,
    pub hash: String,
}

/// The same shape as `AuditEntry` minus `hash`, used only to produce the
/// canonical (whitespace-free, fixed field order) payload the hash chain
/// is computed over.
#[derive(Serialize)]
struct EntryForHash<'a> {
    v: u32,
    ts: &'a str,
    sid: &'a Option<String>,
    seq: u64,
    tool: &'a str,
    input: &'a Option<Value>,
    allowed: bool,
    reason: &'a Option<String>,
    severity: &'a Option<Severity>,
    policy_match: &'a Option<String>,
    budget: &'a Option<BudgetSnapshot>,
    cwd: &'a Option<String>,
}

impl AuditEntry {
    fn canonical_payload(&self) -> String {
        let view = EntryForHash {
            v: self.v,
            ts: &self.ts,
            sid: &self.sid,
            seq: self.seq,
            tool: &self.tool,
            input: &self.input,
            allowed: self.allowed,
            reason: &self.reason,
            severity: &self.severity,
            policy_match: &self.policy_match,
            budget: &self.budget,
            cwd: &self.cwd,
        };
        serde_json::to_string(&view).expect("audit entry fields always serialize")
    }

    fn expected_hash(&self, previous_hash: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(previous_hash.as_bytes());
        hasher.update(self.canonical_payload().as_bytes());
        format!("sha256:{}", hex::encode(hasher.finalize()))
    }
}

fn audit_io_err(path: &Path, e: std::io::Error) -> GuardianError {
    GuardianError::AuditIoError {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

fn resolve_audit_path(cwd: &Path, cfg: &AuditConfig) -> PathBuf {
    crate::context::resolve_path(cwd, &cfg.path)
}

/// Appends one entry to the configured audit file when `cfg.enabled`.
/// Returns `None` when auditing is disabled. Recovers sequence/hash state
/// from the file's tail on first use after process start or rotation.
pub fn append(
    ctx: &mut GuardianContext,
    cfg: &AuditConfig,
    session_id: Option<&str>,
    tool_name: &str,
    tool_input: Option<Value>,
    result: &ValidationResult,
    budget_state: &BudgetState,
    budget_cfg: &crate::policy::types::BudgetConfig,
) -> Result<Option<AuditEntry>> {
    if !cfg.enabled {
        return Ok(None);
    }

    let path = resolve_audit_path(&ctx.cwd, cfg);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| audit_io_err(&path, e))?;
    }

    maybe_rotate(&path, cfg).map_err(|e| audit_io_err(&path, e))?;

    let needs_reload = match &ctx.audit_state {
        Some(state) => state.path != path,
        None => true,
    };
    if needs_reload {
        ctx.audit_state = Some(load_tail_state(&path));
    }

    let state = ctx.audit_state.as_mut().expect("just populated above");
    let seq = state.seq + 1;
    let previous_hash = state.last_hash.clone();

    let remaining_usd = budget_cfg
        .session_limit_usd
        .zip(budget_state.session_cost_usd)
        .map(|(limit, cost)| limit - cost);

    let mut entry = AuditEntry {
        v: 1,
        ts: now_iso_millis(),
        sid: session_id.map(str::to_string),
        seq,
        tool: tool_name.to_string(),
        input: if cfg.include_tool_input { tool_input } else { None },
        allowed: result.allowed,
        reason: result.reason.clone(),
        severity: result.severity,
        policy_match: result.pattern.clone(),
        budget: Some(BudgetSnapshot {
            remaining_usd,
            action_count: budget_state.action_count,
        }),
        cwd: Some(ctx.cwd.to_string_lossy().to_string()),
        hash: String::new(),
    };

    entry.hash = if cfg.integrity == "none" {
        "none".to_string()
    } else {
        entry.expected_hash(&previous_hash)
    };

    let line = serde_json::to_string(&entry).expect("audit entry always serializes");
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| audit_io_err(&path, e))?;
    writeln!(file, "{line}").map_err(|e| audit_io_err(&path, e))?;

    state.seq = seq;
    state.last_hash = entry.hash.clone();

    Ok(Some(entry))
}

fn now_iso_millis() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Recovers `(seq, last_hash)` from the tail of an existing audit file. A
/// missing file or a corrupted trailing line both reset to a fresh
/// sequence starting at 1 with an empty previous hash.
fn load_tail_state(path: &Path) -> crate::context::AuditState {
    let fresh = || crate::context::AuditState {
        path: path.to_path_buf(),
        seq: 0,
        last_hash: String::new(),
    };

    let Ok(file) = fs::File::open(path) else {
        return fresh();
    };
    let reader = BufReader::new(file);
    let mut last_line = None;
    for line in reader.lines() {
        let Ok(line) = line else {
            return fresh();
        };
        if !line.trim().is_empty() {
            last_line = Some(line);
        }
    }

    match last_line {
        None => fresh(),
        Some(line) => match serde_json::from_str::<AuditEntry>(&line) {
            Ok(entry) => crate::context::AuditState {
                path: path.to_path_buf(),
                seq: entry.seq,
                last_hash: entry.hash,
            },
            Err(_) => fresh(),
        },
    }
}

fn maybe_rotate(path: &Path, cfg: &AuditConfig) -> std::io::Result<()> {
    let Ok(meta) = fs::metadata(path) else {
        return Ok(());
    };

    let mut should_rotate = false;
    if cfg.max_file_size_mb > 0 {
        let size_mb = meta.len() as f64 / (1024.0 * 1024.0);
        if size_mb > cfg.max_file_size_mb as f64 {
            should_rotate = true;
        }
    }

    if !should_rotate && cfg.rotation == "daily" {
        if let Ok(modified) = meta.modified() {
            let modified: chrono::DateTime<Utc> = modified.into();
            if modified.date_naive() != Utc::now().date_naive() {
                should_rotate = true;
            }
        }
    }

    if should_rotate {
        rotate(path)?;
    }
    Ok(())
}

fn rotate(path: &Path) -> std::io::Result<()> {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "audit".to_string());
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let date = Utc::now().format("%Y-%m-%d");

    let mut candidate = path.with_file_name(format!("{stem}.{date}{ext}"));
    let mut n = 1u32;
    while candidate.exists() {
        candidate = path.with_file_name(format!("{stem}.{date}.{n}{ext}"));
        n += 1;
    }
    fs::rename(path, candidate)
}

/// Result of scanning an audit file top to bottom and recomputing each
/// entry's expected hash from its predecessor and content.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    pub valid: bool,
    pub entries: usize,
    pub broken_at: Option<usize>,
}

/// An empty or absent file is valid with zero entries. The first
/// unparseable line, or the first hash mismatch, reports `valid = false`
/// with a 1-based index pointing at that line.
pub fn verify_chain(path: &Path) -> VerifyReport {
    let Ok(file) = fs::File::open(path) else {
        return VerifyReport {
            valid: true,
            entries: 0,
            broken_at: None,
        };
    };

    let reader = BufReader::new(file);
    let mut previous_hash = String::new();
    let mut count = 0usize;

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let Ok(line) = line else {
            return VerifyReport {
                valid: false,
                entries: count,
                broken_at: Some(line_no),
            };
        };
        if line.trim().is_empty() {
            continue;
        }

        let entry: AuditEntry = match serde_json::from_str(&line) {
            Ok(e) => e,
            Err(_) => {
                return VerifyReport {
                    valid: false,
                    entries: count,
                    broken_at: Some(line_no),
                }
            }
        };

        let matches = if entry.hash == "none" {
            true
        } else {
            entry.hash == entry.expected_hash(&previous_hash)
        };

        if !matches {
            return VerifyReport {
                valid: false,
                entries: count + 1,
                broken_at: Some(line_no),
            };
        }

        previous_hash = entry.hash.clone();
        count += 1;
    }

    VerifyReport {
        valid: true,
        entries: count,
        broken_at: None,
    }
}

/// Tallies allowed/denied, per-tool, and per-severity counts over an
/// audit file (`guardian audit summary`).
#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditSummary {
    pub total: usize,
    pub allowed: usize,
    pub denied: usize,
    pub by_tool: std::collections::BTreeMap<String, usize>,
    pub by_severity: std::collections::BTreeMap<String, usize>,
}

pub fn summarize(path: &Path) -> std::io::Result<AuditSummary> {
    let mut summary = AuditSummary::default();
    let Ok(file) = fs::File::open(path) else {
        return Ok(summary);
    };
    let reader = BufReader::new(file);
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let Ok(entry) = serde_json::from_str::<AuditEntry>(&line) else {
            continue;
        };
        summary.total += 1;
        if entry.allowed {
            summary.allowed += 1;
        } else {
            summary.denied += 1;
        }
        *summary.by_tool.entry(entry.tool.clone()).or_insert(0) += 1;
        if let Some(sev) = entry.severity {
            *summary.by_severity.entry(sev.as_str().to_string()).or_insert(0) += 1;
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Source;
    use tempfile::TempDir;

    fn enabled_config(dir: &Path) -> AuditConfig {
        AuditConfig {
            enabled: true,
            path: dir.join("audit.jsonl").to_string_lossy().to_string(),
            integrity: "sha256-chain".to_string(),
            include_tool_input: true,
            rotation: "none".to_string(),
            max_file_size_mb: 0,
        }
    }

    fn allow_result() -> ValidationResult {
        ValidationResult {
            allowed: true,
            reason: None,
            severity: None,
            pattern: None,
            source: Some(Source::Allowlist),
        }
    }

    #[test]
    fn sequence_increases_and_chain_verifies() {
        let dir = TempDir::new().unwrap();
        let cfg = enabled_config(dir.path());
        let mut ctx = GuardianContext::new(dir.path());
        let budget = BudgetState::default();
        let budget_cfg = crate::policy::types::BudgetConfig::default();

        for _ in 0..3 {
            append(&mut ctx, &cfg, Some("s1"), "Bash", None, &allow_result(), &budget, &budget_cfg).unwrap();
        }

        let path = resolve_audit_path(dir.path(), &cfg);
        let report = verify_chain(&path);
        assert!(report.valid);
        assert_eq!(report.entries, 3);

        let content = fs::read_to_string(&path).unwrap();
        let seqs: Vec<u64> = content
            .lines()
            .map(|l| serde_json::from_str::<AuditEntry>(l).unwrap().seq)
            .collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[test]
    fn tampering_breaks_the_chain() {
        let dir = TempDir::new().unwrap();
        let cfg = enabled_config(dir.path());
        let mut ctx = GuardianContext::new(dir.path());
        let budget = BudgetState::default();
        let budget_cfg = crate::policy::types::BudgetConfig::default();

        for _ in 0..2 {
            append(&mut ctx, &cfg, Some("s1"), "Bash", None, &allow_result(), &budget, &budget_cfg).unwrap();
        }

        let path = resolve_audit_path(dir.path(), &cfg);
        let mut content = fs::read_to_string(&path).unwrap();
        content = content.replace("\"tool\":\"Bash\"", "\"tool\":\"Read\"");
        fs::write(&path, content).unwrap();

        let report = verify_chain(&path);
        assert!(!report.valid);
        assert_eq!(report.broken_at, Some(1));
    }

    #[test]
    fn corrupted_tail_resets_sequence() {
        let dir = TempDir::new().unwrap();
        let cfg = enabled_config(dir.path());
        let path = resolve_audit_path(dir.path(), &cfg);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json at all\n").unwrap();

        let mut ctx = GuardianContext::new(dir.path());
        let budget = BudgetState::default();
        let budget_cfg = crate::policy::types::BudgetConfig::default();
        let entry = append(&mut ctx, &cfg, None, "Bash", None, &allow_result(), &budget, &budget_cfg)
            .unwrap()
            .unwrap();
        assert_eq!(entry.seq, 1);
    }

    #[test]
    fn empty_file_verifies_as_valid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.jsonl");
        let report = verify_chain(&path);
        assert!(report.valid);
        assert_eq!(report.entries, 0);
    }

    #[test]
    fn disabled_audit_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let mut cfg = enabled_config(dir.path());
        cfg.enabled = false;
        let mut ctx = GuardianContext::new(dir.path());
        let budget = BudgetState::default();
        let budget_cfg = crate::policy::types::BudgetConfig::default();
        let result = append(&mut ctx, &cfg, None, "Bash", None, &allow_result(), &budget, &budget_cfg).unwrap();
        assert!(result.is_none());
    }
}
