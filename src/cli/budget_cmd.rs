//! `guardian budget`: prints the configured limits alongside the
//! process-local action count (always zero for a fresh CLI invocation)
//! and, if a cost file is configured and readable, the last known cost.

use std::path::Path;

use anyhow::Result;

use crate::policy;

pub fn run(cwd: &Path) -> Result<()> {
    let loaded = policy::load_from_path(&policy::policy_path(cwd))?;
    let budget = &loaded.budget;

    println!("Budget configuration:");
    println!("  enabled: {}", budget.enabled);
    println!("  max_actions_per_session: {}", budget.max_actions_per_session);
    println!("  action_count (this process): 0");

    match budget.session_limit_usd {
        Some(limit) => println!("  session_limit_usd: {limit:.2}"),
        None => println!("  session_limit_usd: (none)"),
    }

    if let Some(cost_file) = &budget.cost_file {
        let path = crate::context::resolve_path(cwd, cost_file);
        match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<serde_json::Value>(&content) {
                Ok(value) => {
                    let cost = value.get("total_cost_usd").and_then(|v| v.as_f64());
                    match cost {
                        Some(cost) => println!("  current session cost: ${cost:.2}"),
                        None => println!("  cost file present but missing total_cost_usd"),
                    }
                }
                Err(_) => println!("  cost file present but not valid JSON"),
            },
            Err(_) => println!("  cost file not readable: {}", path.display()),
        }
    }

    println!("  action_on_breach: {}", budget.action_on_breach);
    Ok(())
}
