//! CLI surface (spec.md §4.8, §6): thin wrappers around the core pipeline,
//! audit writer, and policy loader. This is the "external collaborator"
//! the distilled spec treats as out of scope for the hard core, but a
//! complete repository still needs it wired up concretely.

mod audit_cmd;
mod budget_cmd;
mod check;
mod init;
mod test_cmd;
mod validate;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "guardian", version, about = "Policy gatekeeper for autonomous coding-agent tool calls")]
pub struct Cli {
    /// Workspace root to operate in (default: current directory).
    #[arg(long, global = true, value_name = "PATH")]
    pub cwd: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scaffold .guardian/policy.json and amend .gitignore.
    Init {
        /// Overwrite an existing policy file.
        #[arg(long)]
        force: bool,
    },
    /// Run the hook adapter once against stdin (the production entry point).
    Validate,
    /// Load the policy and print a summary.
    Check,
    /// Inspect or verify the audit log.
    Audit {
        #[command(subcommand)]
        command: AuditCommands,
    },
    /// Dry-run the pipeline against a fabricated Bash command.
    Test {
        /// The shell command to evaluate.
        command: String,
    },
    /// Print configured budget limits and the current cost-file reading.
    Budget,
}

#[derive(Subcommand, Debug)]
pub enum AuditCommands {
    /// Verify the hash chain of the audit log.
    Verify {
        #[arg(long, value_name = "PATH")]
        path: Option<PathBuf>,
    },
    /// Tally allowed/denied, per-tool, and per-severity counts.
    Summary {
        #[arg(long, value_name = "PATH")]
        path: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> Result<()> {
    let cwd = match cli.cwd {
        Some(path) => path,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Commands::Init { force } => init::run(&cwd, force),
        Commands::Validate => validate::run(&cwd),
        Commands::Check => check::run(&cwd),
        Commands::Audit { command } => audit_cmd::run(&cwd, command),
        Commands::Test { command } => test_cmd::run(&cwd, &command),
        Commands::Budget => budget_cmd::run(&cwd),
    }
}
