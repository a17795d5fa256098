//! `guardian test <command>`: dry-runs the pipeline against a fabricated
//! `Bash` request, printing the resulting decision without writing to the
//! audit log or exercising the kill switch.

use std::path::Path;

use anyhow::Result;
use serde_json::json;

use crate::context::GuardianContext;
use crate::pipeline::{self, HookInput};

pub fn run(cwd: &Path, command: &str) -> Result<()> {
    let mut tool_input = serde_json::Map::new();
    tool_input.insert("command".to_string(), json!(command));

    let input = HookInput {
        tool_name: "Bash".to_string(),
        tool_input,
        session_id: None,
        cwd: Some(cwd.to_string_lossy().to_string()),
    };

    let mut ctx = GuardianContext::new(cwd.to_path_buf());
    let compiled = ctx.policy()?;
    let (result, _budget) = pipeline::evaluate(&mut ctx, &compiled, &input);

    if result.allowed {
        println!("ALLOW  {command}");
    } else {
        println!("DENY   {command}");
        if let Some(reason) = &result.reason {
            println!("  reason: {reason}");
        }
        if let Some(severity) = result.severity {
            println!("  severity: {severity}");
        }
        if let Some(pattern) = &result.pattern {
            println!("  pattern: {pattern}");
        }
    }

    Ok(())
}
