//! `guardian validate`: runs the hook adapter once against stdin, exactly
//! as the agent runtime invokes Guardian as a pre-tool-use hook.

use std::path::Path;

use anyhow::Result;

pub fn run(cwd: &Path) -> Result<()> {
    let exit_code = crate::hook::run(std::io::stdin(), std::io::stdout(), cwd.to_path_buf());
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}
