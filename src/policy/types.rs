//! Declarative policy schema (spec.md §3).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Enforce,
    Audit,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileOperation {
    Read,
    Write,
    Delete,
    GitAdd,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandPattern {
    pub pattern: String,
    #[serde(default)]
    pub flags: Option<String>,
    pub severity: Severity,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretPattern {
    pub pattern: String,
    #[serde(default)]
    pub flags: Option<String>,
    pub severity: Severity,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkPattern {
    pub pattern: String,
    #[serde(default)]
    pub flags: Option<String>,
    pub severity: Severity,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilePattern {
    pub pattern: String,
    #[serde(default)]
    pub flags: Option<String>,
    pub operations: Vec<FileOperation>,
    pub severity: Severity,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Blocklist {
    #[serde(default)]
    pub commands: Vec<CommandPattern>,
    #[serde(default)]
    pub file_patterns: Vec<FilePattern>,
    #[serde(default)]
    pub secret_patterns: Vec<SecretPattern>,
    #[serde(default)]
    pub network: Vec<NetworkPattern>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Allowlist {
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub domains: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scope {
    #[serde(default)]
    pub allowed_paths: Vec<String>,
    #[serde(default)]
    pub denied_paths: Vec<String>,
    #[serde(default)]
    pub allow_outside_cwd: bool,
}

fn default_action_on_breach() -> String {
    "warn".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub max_actions_per_session: u64,
    #[serde(default)]
    pub session_limit_usd: Option<f64>,
    #[serde(default)]
    pub cost_file: Option<String>,
    #[serde(default = "default_action_on_breach")]
    pub action_on_breach: String,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_actions_per_session: 0,
            session_limit_usd: None,
            cost_file: None,
            action_on_breach: default_action_on_breach(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_audit_path() -> String {
    ".guardian/audit.jsonl".to_string()
}

fn default_integrity() -> String {
    "sha256-chain".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

fn default_max_file_size_mb() -> u64 {
    50
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_audit_path")]
    pub path: String,
    #[serde(default = "default_integrity")]
    pub integrity: String,
    #[serde(default = "default_true")]
    pub include_tool_input: bool,
    #[serde(default = "default_rotation")]
    pub rotation: String,
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,
}

fn default_exit_code() -> i32 {
    2
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KillSwitchConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub on_blocklist_critical: bool,
    #[serde(default)]
    pub on_budget_breach: bool,
    #[serde(default = "default_exit_code")]
    pub exit_code: i32,
}

/// Root configuration document, loaded from `<cwd>/.guardian/policy.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub version: u32,
    pub mode: Mode,
    #[serde(default)]
    pub blocklist: Blocklist,
    #[serde(default)]
    pub allowlist: Allowlist,
    pub scope: Scope,
    #[serde(default)]
    pub budget: BudgetConfig,
    pub audit: AuditConfig,
    pub kill_switch: KillSwitchConfig,
}

pub const CURRENT_POLICY_VERSION: u32 = 1;
