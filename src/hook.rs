//! Hook adapter (spec.md §4.7): the stdin/stdout protocol used by the
//! agent runtime's pre-tool-use callback. Fail-open is deliberate — any
//! internal error degrades to allow with a stderr note rather than
//! blocking the agent on Guardian's own fault (spec.md §7).

use std::io::Write;

use serde::Serialize;

use crate::context::GuardianContext;
use crate::pipeline::{self, HookInput};
use crate::{audit, kill};

#[derive(Debug, Clone, Serialize)]
pub struct HookOutput {
    #[serde(rename = "permissionDecision")]
    pub permission_decision: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "systemMessage")]
    pub system_message: Option<String>,
}

impl HookOutput {
    fn allow() -> Self {
        Self {
            permission_decision: "allow",
            reason: None,
            system_message: None,
        }
    }

    fn deny(reason: String) -> Self {
        Self {
            permission_decision: "deny",
            reason: Some(format!("[Guardian] {reason}")),
            system_message: None,
        }
    }
}

/// Outcome of processing one request: the output to emit, plus an exit
/// code when the kill switch fired. The audit entry for the triggering
/// decision has already been appended by the time this is returned.
pub struct Outcome {
    pub output: HookOutput,
    pub exit_code: Option<i32>,
}

/// Evaluates one request against the pipeline, writes the audit entry,
/// and consults the kill switch. Any internal failure (policy load, audit
/// I/O) is reported to the caller so the hook entry point can fail open.
pub fn process(ctx: &mut GuardianContext, input: &HookInput) -> crate::error::Result<Outcome> {
    let compiled = ctx.policy()?;
    let (result, budget_state) = pipeline::evaluate(ctx, &compiled, input);

    let tool_input = serde_json::Value::Object(input.tool_input.clone());
    audit::append(
        ctx,
        &compiled.policy.audit,
        input.session_id.as_deref(),
        &input.tool_name,
        Some(tool_input),
        &result,
        &budget_state,
        &compiled.policy.budget,
    )?;

    let exit_code = kill::decide(&compiled.policy.kill_switch, &compiled.policy.budget, &result);
    if let Some(code) = exit_code {
        eprintln!(
            "[Guardian] kill switch triggered: {} (severity {}); terminating with exit code {code}",
            result.reason.as_deref().unwrap_or("policy violation"),
            result.severity.map(|s| s.as_str()).unwrap_or("unknown"),
        );
    }

    let output = if result.allowed {
        HookOutput::allow()
    } else {
        HookOutput::deny(result.reason.clone().unwrap_or_else(|| "blocked by policy".to_string()))
    };

    Ok(Outcome { output, exit_code })
}

/// Runs the full stdin → decision → stdout cycle, exactly as the agent
/// runtime invokes Guardian as a pre-tool-use hook. Returns the process
/// exit code the caller should terminate with (0 for an ordinary
/// decision, or the kill switch's configured code after a kill).
pub fn run(mut reader: impl std::io::Read, mut writer: impl Write, cwd: std::path::PathBuf) -> i32 {
    let mut raw = String::new();
    if reader.read_to_string(&mut raw).is_err() {
        write_output(&mut writer, &HookOutput::allow());
        return 0;
    }

    if raw.trim().is_empty() {
        write_output(&mut writer, &HookOutput::allow());
        return 0;
    }

    let input = match parse_input(&raw) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("[Guardian] {e}; failing open");
            write_output(&mut writer, &HookOutput::allow());
            return 0;
        }
    };

    let request_cwd = input
        .cwd
        .as_ref()
        .map(std::path::PathBuf::from)
        .unwrap_or(cwd);
    let mut ctx = GuardianContext::new(request_cwd);

    match process(&mut ctx, &input) {
        Ok(outcome) => {
            write_output(&mut writer, &outcome.output);
            if let Some(code) = outcome.exit_code {
                let _ = writer.flush();
                code
            } else {
                0
            }
        }
        Err(e) => {
            eprintln!("[Guardian] {e}; failing open");
            write_output(&mut writer, &HookOutput::allow());
            0
        }
    }
}

/// Parses a raw hook request, mapping any JSON error to
/// `GuardianError::HookInputInvalid` (non-JSON or truncated requests both
/// land here and fail open at the call site, per spec.md §7).
fn parse_input(raw: &str) -> crate::error::Result<HookInput> {
    serde_json::from_str(raw).map_err(|e| crate::error::GuardianError::HookInputInvalid(e.to_string()))
}

fn write_output(writer: &mut impl Write, output: &HookOutput) {
    if let Ok(json) = serde_json::to_string(output) {
        let _ = writeln!(writer, "{json}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_policy(dir: &std::path::Path, mode: &str, extra_kill: &str) {
        let guardian_dir = dir.join(".guardian");
        std::fs::create_dir_all(&guardian_dir).unwrap();
        let json = format!(
            r#"{{
                "version": 1,
                "mode": "{mode}",
                "blocklist": {{
                    "commands": [
                        {{"pattern": "rm\\s+-rf\\s+/", "severity": "critical", "reason": "Forced file deletion"}}
                    ]
                }},
                "allowlist": {{}},
                "scope": {{"allowed_paths": ["{{cwd}}"], "denied_paths": [], "allow_outside_cwd": false}},
                "audit": {{"enabled": true, "path": ".guardian/audit.jsonl"}},
                "kill_switch": {{"enabled": true, "on_blocklist_critical": {extra_kill}}}
            }}"#
        );
        std::fs::write(guardian_dir.join("policy.json"), json).unwrap();
    }

    #[test]
    fn empty_stdin_is_fail_open_allow() {
        let mut out = Vec::new();
        let code = run(std::io::empty(), &mut out, std::env::temp_dir());
        assert_eq!(code, 0);
        assert_eq!(String::from_utf8(out).unwrap().trim(), r#"{"permissionDecision":"allow"}"#);
    }

    #[test]
    fn unparseable_stdin_is_fail_open_allow_without_audit() {
        let dir = TempDir::new().unwrap();
        write_policy(dir.path(), "enforce", "true");
        let mut out = Vec::new();
        let input = std::io::Cursor::new(b"not json".to_vec());
        let code = run(input, &mut out, dir.path().to_path_buf());
        assert_eq!(code, 0);
        assert_eq!(String::from_utf8(out).unwrap().trim(), r#"{"permissionDecision":"allow"}"#);
        assert!(!dir.path().join(".guardian/audit.jsonl").exists());
    }

    #[test]
    fn dangerous_bash_command_denies_and_kills() {
        let dir = TempDir::new().unwrap();
        write_policy(dir.path(), "enforce", "true");
        let mut out = Vec::new();
        let input = serde_json::json!({"tool_name": "Bash", "tool_input": {"command": "rm -rf /"}});
        let reader = std::io::Cursor::new(input.to_string().into_bytes());
        let code = run(reader, &mut out, dir.path().to_path_buf());
        assert_eq!(code, 2);
        let output: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(output["permissionDecision"], "deny");
        assert_eq!(output["reason"], "[Guardian] Forced file deletion");
        assert!(dir.path().join(".guardian/audit.jsonl").exists());
    }

    #[test]
    fn audit_mode_allows_but_still_records_severity() {
        let dir = TempDir::new().unwrap();
        write_policy(dir.path(), "audit", "true");
        let mut out = Vec::new();
        let input = serde_json::json!({"tool_name": "Bash", "tool_input": {"command": "rm -rf /"}});
        let reader = std::io::Cursor::new(input.to_string().into_bytes());
        let code = run(reader, &mut out, dir.path().to_path_buf());
        assert_eq!(code, 0);
        let output: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(output["permissionDecision"], "allow");

        let audit_content = std::fs::read_to_string(dir.path().join(".guardian/audit.jsonl")).unwrap();
        let entry: serde_json::Value = serde_json::from_str(audit_content.trim()).unwrap();
        assert_eq!(entry["severity"], "critical");
        assert_eq!(entry["allowed"], true);
    }
}
