use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tasklight_core::HotkeySpec;
use tracing::info;

mod app;
mod config;
mod glue;
mod logs;
mod window;

use config::Config;
use logs::LogLevel;

#[derive(Parser, Debug)]
#[command(name = "tasklight")]
#[command(about = "Menu-bar task launcher with a global hotkey", long_about = None)]
struct Args {
    /// Path to the RON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured hotkey, e.g. "cmd+shift+space"
    #[arg(long)]
    hotkey: Option<HotkeySpec>,

    /// Open the settings window on startup
    #[arg(long)]
    settings: bool,

    /// Set the log level
    #[arg(short, long, value_enum, default_value = "info")]
    log_level: LogLevel,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logs::init_tracing(args.log_level)?;

    let config_path = args.config.unwrap_or_else(Config::default_path);
    let mut config = Config::load(&config_path).context("Failed to load configuration")?;
    if let Some(hotkey) = args.hotkey {
        config.hotkey = hotkey;
    }

    info!(
        "Starting tasklight with hotkey {} (config: {})",
        config.hotkey,
        config_path.display()
    );
    app::run(
        config,
        app::Options {
            config_path,
            open_settings: args.settings,
        },
    )
}
