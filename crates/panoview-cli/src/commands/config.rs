use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use panoview_core::config::ViewerConfig;

#[derive(Args)]
pub struct ConfigArgs {
    /// Write config to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Print or save the viewer config as TOML: the defaults, or the file
/// passed with `--config` after validation.
pub fn run(args: &ConfigArgs, config: &ViewerConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;

    if let Some(ref path) = args.output {
        std::fs::write(path, &toml_str)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        println!("Config saved to {}", path.display());
    } else {
        print!("{}", toml_str);
    }

    Ok(())
}
