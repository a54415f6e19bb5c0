use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, ValueEnum};
use panoview_core::config::ViewerConfig;
use panoview_core::texture::DevicePreference;

use super::{graphics_context, load_with_progress};
use crate::summary::print_load_summary;

#[derive(Clone, Copy, ValueEnum)]
pub enum DeviceArg {
    Auto,
    Cpu,
    Gpu,
}

impl From<DeviceArg> for DevicePreference {
    fn from(arg: DeviceArg) -> Self {
        match arg {
            DeviceArg::Auto => DevicePreference::Auto,
            DeviceArg::Cpu => DevicePreference::Cpu,
            DeviceArg::Gpu => DevicePreference::Gpu,
        }
    }
}

#[derive(Args)]
pub struct LoadArgs {
    /// Input image file
    pub file: PathBuf,

    /// Texture device (defaults to the configured one)
    #[arg(long, value_enum)]
    pub device: Option<DeviceArg>,
}

pub fn run(args: &LoadArgs, config: &ViewerConfig) -> Result<()> {
    let context = graphics_context(config, args.device.map(Into::into));
    let (loaded, elapsed) = load_with_progress(&context, config, &args.file)?;
    print_load_summary(&loaded, context.backend().name(), elapsed);
    Ok(())
}
