//! Kill controller (spec.md §4.6). Consulted only after a deny has been
//! recorded to the audit log — never before, in every kill path (see
//! REDESIGN FLAGS: the original only guaranteed this ordering for budget
//! breaches). `decide` only computes the exit code; the caller
//! (`hook::process`) is responsible for writing the single stderr
//! diagnostic line spec.md §4.6 requires before the process terminates.

use crate::pipeline::{Source, ValidationResult};
use crate::policy::types::{BudgetConfig, KillSwitchConfig, Severity};

/// Returns the exit code to terminate with, or `None` to continue. A
/// mode-`audit`-coerced result (already `allowed = true`) never triggers
/// a kill, since there is no denial to react to.
pub fn decide(cfg: &KillSwitchConfig, budget_cfg: &BudgetConfig, result: &ValidationResult) -> Option<i32> {
    if !cfg.enabled || result.allowed {
        return None;
    }

    let critical_blocklist_hit =
        cfg.on_blocklist_critical && result.severity == Some(Severity::Critical);

    let budget_breach_hit = cfg.on_budget_breach
        && result.source == Some(Source::Budget)
        && budget_cfg.action_on_breach == "kill";

    if critical_blocklist_hit || budget_breach_hit {
        Some(cfg.exit_code)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled_switch() -> KillSwitchConfig {
        KillSwitchConfig {
            enabled: true,
            on_blocklist_critical: true,
            on_budget_breach: false,
            exit_code: 2,
        }
    }

    fn budget(action_on_breach: &str) -> BudgetConfig {
        BudgetConfig {
            action_on_breach: action_on_breach.to_string(),
            ..Default::default()
        }
    }

    fn deny(source: Source, severity: Severity) -> ValidationResult {
        ValidationResult {
            allowed: false,
            reason: Some("blocked".to_string()),
            severity: Some(severity),
            pattern: None,
            source: Some(source),
        }
    }

    #[test]
    fn critical_blocklist_hit_kills() {
        let result = deny(Source::Blocklist, Severity::Critical);
        assert_eq!(decide(&enabled_switch(), &budget("warn"), &result), Some(2));
    }

    #[test]
    fn non_critical_does_not_kill() {
        let result = deny(Source::Blocklist, Severity::High);
        assert_eq!(decide(&enabled_switch(), &budget("warn"), &result), None);
    }

    #[test]
    fn allowed_result_never_kills() {
        let result = ValidationResult {
            allowed: true,
            reason: None,
            severity: Some(Severity::Critical),
            pattern: None,
            source: Some(Source::Blocklist),
        };
        assert_eq!(decide(&enabled_switch(), &budget("warn"), &result), None);
    }

    #[test]
    fn budget_breach_kills_only_when_configured() {
        let mut cfg = enabled_switch();
        cfg.on_blocklist_critical = false;
        cfg.on_budget_breach = true;
        let result = deny(Source::Budget, Severity::High);
        assert_eq!(decide(&cfg, &budget("kill"), &result), Some(2));
        assert_eq!(decide(&cfg, &budget("warn"), &result), None);
    }

    #[test]
    fn disabled_kill_switch_never_kills() {
        let mut cfg = enabled_switch();
        cfg.enabled = false;
        let result = deny(Source::Blocklist, Severity::Critical);
        assert_eq!(decide(&cfg, &budget("warn"), &result), None);
    }
}
