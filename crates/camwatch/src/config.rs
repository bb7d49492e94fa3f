//! Config resolution for the CLI: file + environment via `camwatch_config`,
//! then command-line overrides on top.

use std::path::PathBuf;

use camwatch_config::Config;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Load the config file named by `--config` and apply flag overrides.
pub fn resolve(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut config = camwatch_config::load_config(&global.config)?;
    apply_overrides(&mut config, global);
    Ok(config)
}

fn apply_overrides(config: &mut Config, global: &GlobalOpts) {
    if let Some(ref path) = global.teleop_ini {
        config.teleop_ini.clone_from(path);
    }
    if let Some(ref path) = global.cache_file {
        config.cache_file.clone_from(path);
    }
    if let Some(ref path) = global.log_file {
        config.log_file.clone_from(path);
    }
    if global.no_log_file {
        config.log_file = PathBuf::new();
    }
}
