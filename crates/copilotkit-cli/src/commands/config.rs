//! Configuration management commands.

use std::path::Path;

use copilotkit_core::config::IssueSeverity;
use copilotkit_core::Config;

use crate::{AppContext, ConfigAction};

pub fn handle(action: ConfigAction, ctx: &AppContext) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            print!("{}", ctx.config.to_toml()?);

            let result = ctx.config.validate();
            for issue in &result.issues {
                let label = match issue.severity {
                    IssueSeverity::Error => "error",
                    IssueSeverity::Warning => "warning",
                };
                eprintln!("{}: {}: {}", label, issue.field, issue.message);
            }
            if !result.is_ok() {
                anyhow::bail!("configuration is invalid");
            }
        }
        ConfigAction::Path => {
            let user = Config::config_dir().join("config.toml");
            for path in [
                user.as_path(),
                Path::new(".copilotkit/config.toml"),
                Path::new(".copilotkit/config.local.toml"),
            ] {
                let marker = if path.exists() { "✓" } else { "✗" };
                println!("{} {}", marker, path.display());
            }
            println!("  plus COPILOTKIT_* environment variables (nested keys split on `__`)");
        }
    }
    Ok(())
}
