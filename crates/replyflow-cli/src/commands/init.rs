use anyhow::{Context, Result};
use replyflow_infrastructure::write_example_config;
use std::path::Path;

pub fn execute(output: &Path, force: bool) -> Result<()> {
    let example = write_example_config(output, force)
        .with_context(|| format!("Failed to write example configuration to {}", output.display()))?;

    println!("Example configuration written to {}", output.display());
    println!(
        "{} account(s) configured. Edit monitor_targets and rules, then run `replyflow validate-config`.",
        example.accounts.len()
    );
    Ok(())
}
