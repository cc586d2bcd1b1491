//! Config subcommands handler

use anyhow::Result;

use chatlens::Config;

/// Show the effective configuration as TOML.
#[cfg(not(tarpaulin_include))]
pub fn handle_show() -> Result<()> {
    let config = Config::load()?;
    print!("{}", render_config(&config)?);
    Ok(())
}

/// Print the config file location.
#[cfg(not(tarpaulin_include))]
pub fn handle_path() -> Result<()> {
    let path = Config::config_path()?;
    if path.exists() {
        println!("{}", path.display());
    } else {
        println!("{} (not created yet, defaults in use)", path.display());
    }
    Ok(())
}

fn render_config(config: &Config) -> Result<String> {
    Ok(toml::to_string_pretty(config)?)
}
