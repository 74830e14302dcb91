//! Configuration display.

use hypothesis_client::ClientConfig;

/// Print the effective configuration (file, environment and flags merged).
pub fn cmd_config_show(config: &ClientConfig) -> anyhow::Result<()> {
    print!("{}", config.to_toml_string()?);
    Ok(())
}
