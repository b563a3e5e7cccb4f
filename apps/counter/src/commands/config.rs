//! `config show` and `config init`.

use std::path::PathBuf;

use crate::cli::ConfigCommand;
use crate::error::{CliError, CliResult, ErrorCode};
use crate::notify::Notice;
use crate::state::AppConfig;

use super::Counter;

pub fn run(counter: &Counter, action: Option<ConfigCommand>) -> CliResult<String> {
    let path = target_path(counter)?;

    match action.unwrap_or(ConfigCommand::Show) {
        ConfigCommand::Show => {
            let body = toml::to_string_pretty(&counter.config)
                .map_err(|e| CliError::new(ErrorCode::Internal, e.to_string()))?;
            let state = if path.exists() { "" } else { " (not created yet)" };
            Ok(format!("# {}{}\n{}", path.display(), state, body.trim_end()))
        }

        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                return Err(CliError::validation(format!(
                    "{} already exists; use --force to overwrite",
                    path.display()
                )));
            }
            counter.config.save(Some(path.clone()))?;
            Ok(Notice::success(format!("Config written to {}", path.display())).to_string())
        }
    }
}

fn target_path(counter: &Counter) -> CliResult<PathBuf> {
    counter
        .config_path
        .clone()
        .or_else(AppConfig::default_config_path)
        .ok_or_else(|| CliError::config("Could not determine the config directory"))
}
