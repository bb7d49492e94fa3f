//! `camwatch config`: show the configuration the daemon would run with.

use camwatch_config::Config;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

pub fn handle(config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let rendered = config.to_toml()?;
    let header = format!(
        "# effective configuration (file: {}, env: {}*)",
        global.config.display(),
        camwatch_config::ENV_PREFIX
    );
    output::print_output(&format!("{header}\n{rendered}"));
    Ok(())
}
