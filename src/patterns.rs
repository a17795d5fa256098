//! Pattern compiler (spec.md §4.2): regex text is compiled once per policy
//! load and cached alongside the policy itself. Compilation errors are
//! never swallowed — an uncompilable pattern fails the policy load.

use regex::{Regex, RegexBuilder};

use crate::error::{GuardianError, Result};
use crate::policy::types::{CommandPattern, FileOperation, FilePattern, NetworkPattern, Policy, SecretPattern, Severity};

fn build(pattern: &str, flags: Option<&str>) -> Result<Regex> {
    let case_insensitive = flags.map(|f| f.contains('i')).unwrap_or(false);
    RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| GuardianError::PatternInvalid {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
}

pub struct CompiledCommandPattern {
    pub regex: Regex,
    pub severity: Severity,
    pub reason: String,
    pub text: String,
}

pub struct CompiledFilePattern {
    pub regex: Regex,
    pub operations: Vec<FileOperation>,
    pub severity: Severity,
    pub reason: String,
    pub text: String,
}

pub struct CompiledNetworkPattern {
    pub regex: Regex,
    pub severity: Severity,
    pub reason: String,
    pub text: String,
}

/// The four blocklist categories, compiled once and held for the lifetime
/// of the cached policy.
#[derive(Default)]
pub struct CompiledPatterns {
    pub commands: Vec<CompiledCommandPattern>,
    pub file_patterns: Vec<CompiledFilePattern>,
    pub secret_patterns: Vec<CompiledCommandPattern>,
    pub network: Vec<CompiledNetworkPattern>,
}

impl CompiledPatterns {
    pub fn compile(policy: &Policy) -> Result<Self> {
        let commands = policy
            .blocklist
            .commands
            .iter()
            .map(compile_command)
            .collect::<Result<Vec<_>>>()?;

        let secret_patterns = policy
            .blocklist
            .secret_patterns
            .iter()
            .map(compile_secret)
            .collect::<Result<Vec<_>>>()?;

        let network = policy
            .blocklist
            .network
            .iter()
            .map(compile_network)
            .collect::<Result<Vec<_>>>()?;

        let file_patterns = policy
            .blocklist
            .file_patterns
            .iter()
            .map(compile_file)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            commands,
            file_patterns,
            secret_patterns,
            network,
        })
    }
}

fn compile_command(p: &CommandPattern) -> Result<CompiledCommandPattern> {
    Ok(CompiledCommandPattern {
        regex: build(&p.pattern, p.flags.as_deref())?,
        severity: p.severity,
        reason: p.reason.clone(),
        text: p.pattern.clone(),
    })
}

fn compile_secret(p: &SecretPattern) -> Result<CompiledCommandPattern> {
    Ok(CompiledCommandPattern {
        regex: build(&p.pattern, p.flags.as_deref())?,
        severity: p.severity,
        reason: p.reason.clone(),
        text: p.pattern.clone(),
    })
}

fn compile_network(p: &NetworkPattern) -> Result<CompiledNetworkPattern> {
    Ok(CompiledNetworkPattern {
        regex: build(&p.pattern, p.flags.as_deref())?,
        severity: p.severity,
        reason: p.reason.clone(),
        text: p.pattern.clone(),
    })
}

fn compile_file(p: &FilePattern) -> Result<CompiledFilePattern> {
    Ok(CompiledFilePattern {
        regex: build(&p.pattern, p.flags.as_deref())?,
        operations: p.operations.clone(),
        severity: p.severity,
        reason: p.reason.clone(),
        text: p.pattern.clone(),
    })
}
