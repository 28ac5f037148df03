use anyhow::{Result, bail};
use replyflow_core::config::AppConfig;
use std::path::Path;

/// Prints one line per account. Fails if any account is invalid.
pub fn execute(config: &AppConfig, path: &Path) -> Result<()> {
    println!("Configuration: {}", path.display());
    println!("Version: {}", config.version);
    if let Some(description) = &config.description {
        println!("Description: {description}");
    }
    if let Some(default) = &config.default_account {
        println!("Default account: {default}");
    }

    let mut invalid = 0;
    for (name, result) in config.all_account_settings() {
        match result {
            Ok(settings) => {
                let active = settings.rules.iter().filter(|r| r.is_enabled()).count();
                println!(
                    "  [ok] {name}: {} target(s), {} rule(s) ({active} enabled), check every {:.1}s",
                    settings.monitor_targets.len(),
                    settings.rules.len(),
                    settings.session.check_interval.as_secs_f64(),
                );
            }
            Err(e) => {
                invalid += 1;
                println!("  [invalid] {name}: {e}");
            }
        }
    }

    if invalid > 0 {
        bail!("{invalid} account(s) failed validation");
    }
    println!("Configuration is valid.");
    Ok(())
}
