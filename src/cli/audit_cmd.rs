//! `guardian audit verify` / `guardian audit summary`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::audit;
use crate::cli::AuditCommands;
use crate::policy;

fn resolve(cwd: &Path, override_path: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(p) = override_path {
        return Ok(p);
    }
    let policy = policy::load_from_path(&policy::policy_path(cwd))?;
    Ok(crate::context::resolve_path(cwd, &policy.audit.path))
}

pub fn run(cwd: &Path, command: AuditCommands) -> Result<()> {
    match command {
        AuditCommands::Verify { path } => verify(cwd, path),
        AuditCommands::Summary { path } => summary(cwd, path),
    }
}

fn verify(cwd: &Path, path: Option<PathBuf>) -> Result<()> {
    let path = resolve(cwd, path)?;
    let report = audit::verify_chain(&path);

    println!("Audit chain: {}", path.display());
    println!("  entries: {}", report.entries);
    println!("  valid: {}", report.valid);

    if !report.valid {
        if let Some(broken) = report.broken_at {
            bail!("audit chain broken at line {broken}");
        }
        bail!("audit chain invalid");
    }
    Ok(())
}

fn summary(cwd: &Path, path: Option<PathBuf>) -> Result<()> {
    let path = resolve(cwd, path)?;
    let summary = audit::summarize(&path)?;

    println!("Audit summary: {}", path.display());
    println!("  total: {}", summary.total);
    println!("  allowed: {}", summary.allowed);
    println!("  denied: {}", summary.denied);
    println!("  by tool:");
    for (tool, count) in &summary.by_tool {
        println!("    {tool}: {count}");
    }
    println!("  by severity:");
    for (severity, count) in &summary.by_severity {
        println!("    {severity}: {count}");
    }
    Ok(())
}
