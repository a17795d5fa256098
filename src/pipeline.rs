//! The decision pipeline (spec.md §4.4): allowlist, then scope, then
//! blocklist, then budget, in that fixed order, with audit-mode coercion
//! and first-match semantics applied uniformly at the end.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::budget::{self, BudgetState};
use crate::context::{resolve_path, GuardianContext};
use crate::patterns::CompiledPatterns;
use crate::policy::types::{FileOperation, Mode, Policy, Severity};
use crate::shell;

/// One prospective tool invocation, as received from the agent runtime.
#[derive(Debug, Clone, Deserialize)]
pub struct HookInput {
    pub tool_name: String,
    #[serde(default)]
    pub tool_input: serde_json::Map<String, Value>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Allowlist,
    Scope,
    Blocklist,
    Budget,
}

/// The outcome of running `HookInput` through the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub allowed: bool,
    pub reason: Option<String>,
    pub severity: Option<Severity>,
    pub pattern: Option<String>,
    pub source: Option<Source>,
}

impl ValidationResult {
    fn allow(source: Source) -> Self {
        Self {
            allowed: true,
            reason: None,
            severity: None,
            pattern: None,
            source: Some(source),
        }
    }

    fn deny(source: Source, severity: Severity, reason: impl Into<String>, pattern: Option<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
            severity: Some(severity),
            pattern,
            source: Some(source),
        }
    }

    fn allow_everything() -> Self {
        Self {
            allowed: true,
            reason: None,
            severity: None,
            pattern: None,
            source: None,
        }
    }
}

fn str_param<'a>(input: &'a HookInput, key: &str) -> Option<&'a str> {
    input.tool_input.get(key).and_then(Value::as_str)
}

/// Runs the full pipeline, including the budget step, against one request.
/// Returns the decision plus the budget state produced along the way (the
/// caller needs both to write an audit entry and consult the kill switch).
pub fn evaluate(
    ctx: &mut GuardianContext,
    compiled: &crate::context::CompiledPolicy,
    input: &HookInput,
) -> (ValidationResult, BudgetState) {
    let policy = &compiled.policy;
    let patterns = &compiled.patterns;

    if matches!(policy.mode, Mode::Off) {
        // mode = off skips every gate, including the action counter: no
        // evaluation happens at all (spec.md §4.4).
        return (ValidationResult::allow_everything(), BudgetState::default());
    }

    let result = allowlist_check(policy, input)
        .or_else(|| scope_check(&ctx.cwd, policy, input))
        .or_else(|| blocklist_check(patterns, input));

    let cwd = ctx.cwd.clone();
    let budget_state = budget::check(ctx, &policy.budget, &cwd);

    let result = result.unwrap_or_else(|| {
        if budget_state.exceeded {
            ValidationResult::deny(
                Source::Budget,
                Severity::High,
                budget_state
                    .breach_reason
                    .clone()
                    .unwrap_or_else(|| "budget exceeded".to_string()),
                None,
            )
        } else {
            ValidationResult {
                allowed: true,
                reason: None,
                severity: None,
                pattern: None,
                source: None,
            }
        }
    });

    let result = coerce_for_audit_mode(policy.mode, result);
    (result, budget_state)
}

fn coerce_for_audit_mode(mode: Mode, result: ValidationResult) -> ValidationResult {
    if mode == Mode::Audit && !result.allowed {
        ValidationResult {
            allowed: true,
            ..result
        }
    } else {
        result
    }
}

/// Step 1: allowlist. A match always returns `allow`; anything else falls
/// through to the next gate.
fn allowlist_check(policy: &Policy, input: &HookInput) -> Option<ValidationResult> {
    let allowlist = &policy.allowlist;

    if input.tool_name == "Bash" {
        if let Some(command) = str_param(input, "command")
            && allowlist.commands.iter().any(|c| c == command)
        {
            return Some(ValidationResult::allow(Source::Allowlist));
        }
    }

    if let Some(file_path) = str_param(input, "file_path")
        && allowlist
            .paths
            .iter()
            .any(|prefix| file_path.starts_with(prefix.as_str()))
    {
        return Some(ValidationResult::allow(Source::Allowlist));
    }

    if input.tool_name == "WebFetch"
        && let Some(url) = str_param(input, "url")
        && let Ok(parsed) = url::Url::parse(url)
        && let Some(host) = parsed.host_str()
        && allowlist.domains.iter().any(|d| d == host)
    {
        return Some(ValidationResult::allow(Source::Allowlist));
    }

    None
}

/// Step 2: scope. Skipped entirely when the request carries no
/// `file_path`.
fn scope_check(cwd: &std::path::Path, policy: &Policy, input: &HookInput) -> Option<ValidationResult> {
    let file_path = str_param(input, "file_path")?;
    let resolved = resolve_path(cwd, file_path);
    let resolved_str = resolved.to_string_lossy();

    for denied in &policy.scope.denied_paths {
        if resolved_str.starts_with(denied.as_str()) {
            return Some(ValidationResult::deny(
                Source::Scope,
                Severity::High,
                format!("path is under a denied prefix: {denied}"),
                None,
            ));
        }
    }

    if !policy.scope.allow_outside_cwd {
        let cwd_str = cwd.to_string_lossy().to_string();
        let in_scope = policy.scope.allowed_paths.iter().any(|template| {
            let expanded = template.replace("{cwd}", &cwd_str);
            resolved_str.starts_with(expanded.as_str())
        });
        if !in_scope {
            return Some(ValidationResult::deny(
                Source::Scope,
                Severity::High,
                "path falls outside the allowed scope",
                None,
            ));
        }
    }

    None
}

/// Step 3: blocklist, dispatched by tool name.
fn blocklist_check(patterns: &CompiledPatterns, input: &HookInput) -> Option<ValidationResult> {
    match input.tool_name.as_str() {
        "Bash" => bash_blocklist(patterns, input),
        "Write" => file_blocklist(patterns, input, FileOperation::Write, "content"),
        "Edit" => file_blocklist(patterns, input, FileOperation::Write, "new_string"),
        "Read" => file_blocklist(patterns, input, FileOperation::Read, ""),
        "WebFetch" => webfetch_blocklist(patterns, input),
        name if name.starts_with("mcp__") => mcp_blocklist(patterns, input),
        _ => None,
    }
}

fn match_command(patterns: &CompiledPatterns, text: &str) -> Option<ValidationResult> {
    patterns.commands.iter().find(|p| p.regex.is_match(text)).map(|p| {
        ValidationResult::deny(Source::Blocklist, p.severity, p.reason.clone(), Some(p.text.clone()))
    })
}

fn match_network(patterns: &CompiledPatterns, text: &str) -> Option<ValidationResult> {
    patterns.network.iter().find(|p| p.regex.is_match(text)).map(|p| {
        ValidationResult::deny(Source::Blocklist, p.severity, p.reason.clone(), Some(p.text.clone()))
    })
}

fn match_secret(patterns: &CompiledPatterns, text: &str) -> Option<ValidationResult> {
    patterns
        .secret_patterns
        .iter()
        .find(|p| p.regex.is_match(text))
        .map(|p| ValidationResult::deny(Source::Blocklist, p.severity, p.reason.clone(), Some(p.text.clone())))
}

fn bash_blocklist(patterns: &CompiledPatterns, input: &HookInput) -> Option<ValidationResult> {
    let command = str_param(input, "command")?;

    let stripped_full = shell::strip_quotes(command);
    if let Some(hit) = match_command(patterns, &stripped_full) {
        return Some(hit);
    }

    for segment in shell::top_level_segments(command) {
        let stripped_segment = shell::strip_quotes(&segment);
        if let Some(hit) = match_command(patterns, &stripped_segment) {
            return Some(hit);
        }
    }

    for body in shell::substitutions(command) {
        if let Some(hit) = match_command(patterns, &body) {
            return Some(hit);
        }
    }

    match_network(patterns, command)
}

fn file_blocklist(
    patterns: &CompiledPatterns,
    input: &HookInput,
    operation: FileOperation,
    content_key: &str,
) -> Option<ValidationResult> {
    if let Some(file_path) = str_param(input, "file_path") {
        for p in &patterns.file_patterns {
            if p.regex.is_match(file_path) && p.operations.contains(&operation) {
                return Some(ValidationResult::deny(
                    Source::Blocklist,
                    p.severity,
                    p.reason.clone(),
                    Some(p.text.clone()),
                ));
            }
        }
    }

    if !content_key.is_empty()
        && let Some(content) = str_param(input, content_key)
        && let Some(hit) = match_secret(patterns, content)
    {
        return Some(hit);
    }

    None
}

fn webfetch_blocklist(patterns: &CompiledPatterns, input: &HookInput) -> Option<ValidationResult> {
    let url = str_param(input, "url")?;
    match_network(patterns, url)
}

fn mcp_blocklist(patterns: &CompiledPatterns, input: &HookInput) -> Option<ValidationResult> {
    for value in input.tool_input.values() {
        let Some(text) = value.as_str() else {
            continue;
        };
        if let Some(hit) = match_command(patterns, text) {
            return Some(hit);
        }
        if let Some(hit) = match_network(patterns, text) {
            return Some(hit);
        }
        if let Some(hit) = match_secret(patterns, text) {
            return Some(hit);
        }
    }
    None
}
