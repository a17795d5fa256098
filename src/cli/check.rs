//! `guardian check`: loads the policy for the current directory and
//! prints a summary, exiting non-zero on a load error.

use std::path::Path;

use anyhow::Result;

use crate::policy;

pub fn run(cwd: &Path) -> Result<()> {
    let path = policy::policy_path(cwd);
    let loaded = policy::load_from_path(&path)?;

    println!("Policy: {}", path.display());
    println!("  mode: {:?}", loaded.mode);
    println!("  blocklist.commands: {}", loaded.blocklist.commands.len());
    println!("  blocklist.file_patterns: {}", loaded.blocklist.file_patterns.len());
    println!("  blocklist.secret_patterns: {}", loaded.blocklist.secret_patterns.len());
    println!("  blocklist.network: {}", loaded.blocklist.network.len());
    println!(
        "  allowlist: {} commands, {} paths, {} domains",
        loaded.allowlist.commands.len(),
        loaded.allowlist.paths.len(),
        loaded.allowlist.domains.len()
    );
    println!("  budget.enabled: {}", loaded.budget.enabled);
    println!("  audit.enabled: {}", loaded.audit.enabled);
    println!("  kill_switch.enabled: {}", loaded.kill_switch.enabled);

    Ok(())
}
