//! The built-in pattern bundle `guardian init` scaffolds into a fresh
//! policy. Patterns here cover the five families called out in the system
//! overview: destructive filesystem operations, privilege escalation,
//! leaked secrets, exfiltration/network egress, and supply-chain installers
//! that pipe a remote script straight into a shell.

use super::types::{
    Allowlist, AuditConfig, Blocklist, BudgetConfig, CommandPattern, FileOperation, FilePattern,
    KillSwitchConfig, Mode, NetworkPattern, Policy, Scope, SecretPattern, Severity,
    CURRENT_POLICY_VERSION,
};

fn cmd(pattern: &str, severity: Severity, reason: &str) -> CommandPattern {
    CommandPattern {
        pattern: pattern.to_string(),
        flags: None,
        severity,
        reason: reason.to_string(),
    }
}

fn cmd_i(pattern: &str, severity: Severity, reason: &str) -> CommandPattern {
    CommandPattern {
        pattern: pattern.to_string(),
        flags: Some("i".to_string()),
        severity,
        reason: reason.to_string(),
    }
}

fn secret(pattern: &str, severity: Severity, reason: &str) -> SecretPattern {
    SecretPattern {
        pattern: pattern.to_string(),
        flags: None,
        severity,
        reason: reason.to_string(),
    }
}

fn net(pattern: &str, severity: Severity, reason: &str) -> NetworkPattern {
    NetworkPattern {
        pattern: pattern.to_string(),
        flags: Some("i".to_string()),
        severity,
        reason: reason.to_string(),
    }
}

fn file(pattern: &str, ops: &[FileOperation], severity: Severity, reason: &str) -> FilePattern {
    FilePattern {
        pattern: pattern.to_string(),
        flags: None,
        operations: ops.to_vec(),
        severity,
        reason: reason.to_string(),
    }
}

/// Destructive filesystem and privilege-escalation commands.
fn destructive_commands() -> Vec<CommandPattern> {
    vec![
        cmd(
            r"rm\s+-[a-zA-Z]*r[a-zA-Z]*f[a-zA-Z]*\s+/(\s|$)",
            Severity::Critical,
            "Forced file deletion",
        ),
        cmd(
            r"rm\s+-[a-zA-Z]*f[a-zA-Z]*r[a-zA-Z]*\s+/(\s|$)",
            Severity::Critical,
            "Forced file deletion",
        ),
        cmd(
            r":\(\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;",
            Severity::Critical,
            "Fork bomb",
        ),
        cmd(
            r"dd\s+if=/dev/(zero|random|urandom)\s+of=/dev/(sd|nvme|hd)",
            Severity::Critical,
            "Raw disk overwrite",
        ),
        cmd(
            r"mkfs\.",
            Severity::Critical,
            "Filesystem format on a live disk",
        ),
        cmd(
            r"git\s+reset\s+--hard",
            Severity::Medium,
            "Destructive git reset discards uncommitted work",
        ),
        cmd(
            r"git\s+clean\s+-[a-zA-Z]*f[a-zA-Z]*d",
            Severity::Medium,
            "Destructive git clean removes untracked files",
        ),
        cmd(
            r"git\s+push\s+.*--force",
            Severity::High,
            "Force push can overwrite shared history",
        ),
        cmd_i(
            r"chmod\s+-R\s+777",
            Severity::High,
            "World-writable permissions on a directory tree",
        ),
        cmd(
            r"sudo\s+rm\b",
            Severity::Critical,
            "Privileged deletion",
        ),
        cmd(r"^\s*sudo\s", Severity::High, "Privilege escalation via sudo"),
        cmd(
            r">\s*/dev/sd[a-z]\b",
            Severity::Critical,
            "Direct write to a block device",
        ),
    ]
}

/// Supply-chain installers that fetch and execute remote code unreviewed.
fn supply_chain_commands() -> Vec<CommandPattern> {
    vec![
        cmd(
            r"curl\s+[^|]*\|\s*(sudo\s+)?(ba)?sh",
            Severity::High,
            "Piping a remote download straight into a shell",
        ),
        cmd(
            r"wget\s+[^|]*\|\s*(sudo\s+)?(ba)?sh",
            Severity::High,
            "Piping a remote download straight into a shell",
        ),
        cmd(
            r"npm\s+install\s+.*--ignore-scripts=false",
            Severity::Low,
            "Explicitly re-enables npm install scripts",
        ),
        cmd(
            r"pip\s+install\s+.*--index-url\s+http://",
            Severity::Medium,
            "Installing from an unencrypted package index",
        ),
    ]
}

fn default_command_patterns() -> Vec<CommandPattern> {
    let mut patterns = destructive_commands();
    patterns.extend(supply_chain_commands());
    patterns
}

fn default_network_patterns() -> Vec<NetworkPattern> {
    vec![
        net(
            r"169\.254\.169\.254",
            Severity::Critical,
            "Cloud instance metadata endpoint (credential exfiltration risk)",
        ),
        net(
            r"metadata\.google\.internal",
            Severity::Critical,
            "Cloud instance metadata endpoint (credential exfiltration risk)",
        ),
        net(
            r"\b(pastebin\.com|transfer\.sh|0x0\.st)\b",
            Severity::Medium,
            "Anonymous paste/exfiltration service",
        ),
        net(
            r"^https?://\d{1,3}(\.\d{1,3}){3}([:/]|$)",
            Severity::Medium,
            "Request to a bare IP address literal",
        ),
    ]
}

fn default_secret_patterns() -> Vec<SecretPattern> {
    vec![
        secret(
            r"AKIA[0-9A-Z]{16}",
            Severity::Critical,
            "AWS access key ID",
        ),
        secret(
            r"-----BEGIN (RSA |EC |OPENSSH |DSA )?PRIVATE KEY-----",
            Severity::Critical,
            "Embedded private key material",
        ),
        secret(
            r"gh[pousr]_[A-Za-z0-9]{36}",
            Severity::Critical,
            "GitHub access token",
        ),
        secret(
            r"sk-(ant|proj)?-?[A-Za-z0-9_-]{20,}",
            Severity::High,
            "API secret key",
        ),
        secret(
            r#"(?i)(password|passwd|secret|api[_-]?key)\s*[:=]\s*['"][^'"]{8,}['"]"#,
            Severity::Medium,
            "Hardcoded credential literal",
        ),
    ]
}

fn default_file_patterns() -> Vec<FilePattern> {
    vec![
        file(
            r"(^|/)\.env(\.[a-zA-Z0-9_.-]+)?$",
            &[FileOperation::Write, FileOperation::Read],
            Severity::High,
            "Environment secrets file",
        ),
        file(
            r"(^|/)\.ssh/",
            &[FileOperation::Write, FileOperation::Read],
            Severity::High,
            "SSH credential directory",
        ),
        file(
            r"(^|/)\.aws/credentials$",
            &[FileOperation::Write, FileOperation::Read],
            Severity::High,
            "Cloud credential file",
        ),
        file(
            r"(^|/)id_(rsa|ed25519|ecdsa|dsa)$",
            &[FileOperation::Write, FileOperation::Read],
            Severity::Critical,
            "Private SSH key file",
        ),
    ]
}

/// Builds the policy `guardian init` writes for a fresh workspace: the
/// default pattern bundle, a conservative scope limited to the working
/// directory, budget disabled (left for the operator to size), daily audit
/// rotation with the hash chain on, and the kill switch wired to critical
/// blocklist hits.
pub fn default_policy() -> Policy {
    Policy {
        version: CURRENT_POLICY_VERSION,
        mode: Mode::Enforce,
        blocklist: Blocklist {
            commands: default_command_patterns(),
            file_patterns: default_file_patterns(),
            secret_patterns: default_secret_patterns(),
            network: default_network_patterns(),
        },
        allowlist: Allowlist {
            commands: Vec::new(),
            paths: Vec::new(),
            domains: Vec::new(),
        },
        scope: Scope {
            allowed_paths: vec!["{cwd}".to_string()],
            denied_paths: vec![
                "/etc".to_string(),
                "/root".to_string(),
                "/sys".to_string(),
                "/proc".to_string(),
            ],
            allow_outside_cwd: false,
        },
        budget: BudgetConfig {
            enabled: false,
            max_actions_per_session: 0,
            session_limit_usd: None,
            cost_file: None,
            action_on_breach: "warn".to_string(),
        },
        audit: AuditConfig {
            enabled: true,
            path: ".guardian/audit.jsonl".to_string(),
            integrity: "sha256-chain".to_string(),
            include_tool_input: true,
            rotation: "daily".to_string(),
            max_file_size_mb: 50,
        },
        kill_switch: KillSwitchConfig {
            enabled: true,
            on_blocklist_critical: true,
            on_budget_breach: false,
            exit_code: 2,
        },
    }
}
