//! Guardian: a policy-driven gatekeeper that vets autonomous coding-agent
//! tool calls before they run. See `cli` for the binary's subcommands and
//! `hook` for the stdin/stdout protocol used as a pre-tool-use hook.

pub mod audit;
pub mod budget;
pub mod cli;
pub mod context;
pub mod error;
pub mod hook;
pub mod kill;
pub mod logging;
pub mod patterns;
pub mod pipeline;
pub mod policy;
pub mod shell;
