//! Budget tracker (spec.md §4.4 step 4): a per-process action counter plus
//! an external cost-file reader. Guardian does not manage cost accounting
//! itself — it only reads a snapshot the agent runtime maintains.

use std::path::Path;

use serde::Serialize;

use crate::context::{resolve_path, GuardianContext};
use crate::policy::types::BudgetConfig;

#[derive(Debug, Clone, Default, Serialize)]
pub struct BudgetState {
    pub action_count: u64,
    pub session_cost_usd: Option<f64>,
    pub exceeded: bool,
    pub breach_reason: Option<String>,
}

/// Increments the action counter (regardless of `cfg.enabled`, preserved
/// for compatibility — see DESIGN.md) and evaluates both breach
/// conditions when enabled: the action-count ceiling first, then the
/// cost-file ceiling. A breach reason names whichever limit tripped.
pub fn check(ctx: &mut GuardianContext, cfg: &BudgetConfig, cwd: &Path) -> BudgetState {
    let action_count = ctx.increment_action_count();
    let mut state = BudgetState {
        action_count,
        ..Default::default()
    };

    if !cfg.enabled {
        return state;
    }

    if cfg.max_actions_per_session > 0 && action_count > cfg.max_actions_per_session {
        state.exceeded = true;
        state.breach_reason = Some(format!(
            "action budget exceeded: {action_count} of {} actions used",
            cfg.max_actions_per_session
        ));
        return state;
    }

    if let Some(limit) = cfg.session_limit_usd
        && let Some(cost_file) = &cfg.cost_file
        && let Some(cost) = read_cost_file(cwd, cost_file)
    {
        state.session_cost_usd = Some(cost);
        if cost >= limit {
            state.exceeded = true;
            state.breach_reason = Some(format!(
                "session cost ${cost:.2} reached the ${limit:.2} limit"
            ));
        }
    }

    state
}

/// Reads `total_cost_usd` from the cost snapshot file. Missing, unreadable,
/// or malformed files are tolerated silently: no breach, no cost reported.
fn read_cost_file(cwd: &Path, cost_file: &str) -> Option<f64> {
    let path = resolve_path(cwd, cost_file);
    let content = std::fs::read_to_string(path).ok()?;
    let value: serde_json::Value = serde_json::from_str(&content).ok()?;
    value.get("total_cost_usd")?.as_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn disabled() -> BudgetConfig {
        BudgetConfig {
            enabled: false,
            max_actions_per_session: 0,
            session_limit_usd: None,
            cost_file: None,
            action_on_breach: "warn".to_string(),
        }
    }

    #[test]
    fn counter_increments_even_when_disabled() {
        let mut ctx = GuardianContext::new(std::env::temp_dir());
        let cfg = disabled();
        let s1 = check(&mut ctx, &cfg, &ctx.cwd.clone());
        let s2 = check(&mut ctx, &cfg, &ctx.cwd.clone());
        assert_eq!(s1.action_count, 1);
        assert_eq!(s2.action_count, 2);
        assert!(!s2.exceeded);
    }

    #[test]
    fn action_ceiling_breach() {
        let mut ctx = GuardianContext::new(std::env::temp_dir());
        let cfg = BudgetConfig {
            enabled: true,
            max_actions_per_session: 2,
            ..disabled()
        };
        assert!(!check(&mut ctx, &cfg, &ctx.cwd.clone()).exceeded);
        assert!(!check(&mut ctx, &cfg, &ctx.cwd.clone()).exceeded);
        assert!(check(&mut ctx, &cfg, &ctx.cwd.clone()).exceeded);
    }

    #[test]
    fn missing_cost_file_is_tolerated() {
        let dir = TempDir::new().unwrap();
        let mut ctx = GuardianContext::new(dir.path());
        let cfg = BudgetConfig {
            enabled: true,
            session_limit_usd: Some(5.0),
            cost_file: Some("cost.json".to_string()),
            ..disabled()
        };
        let state = check(&mut ctx, &cfg, &ctx.cwd.clone());
        assert!(!state.exceeded);
        assert!(state.session_cost_usd.is_none());
    }

    #[test]
    fn cost_file_breach() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("cost.json"), r#"{"total_cost_usd": 7.5}"#).unwrap();
        let mut ctx = GuardianContext::new(dir.path());
        let cfg = BudgetConfig {
            enabled: true,
            session_limit_usd: Some(5.0),
            cost_file: Some("cost.json".to_string()),
            ..disabled()
        };
        let state = check(&mut ctx, &cfg, &ctx.cwd.clone());
        assert!(state.exceeded);
        assert_eq!(state.session_cost_usd, Some(7.5));
    }
}
