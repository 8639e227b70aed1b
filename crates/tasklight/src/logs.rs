use anyhow::Result;
use clap::ValueEnum;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Log to stderr without timestamps. `RUST_LOG` is honoured; `level` applies
/// to our own crates on top of it.
pub fn init_tracing(level: LogLevel) -> Result<()> {
    let level = level.as_str();
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .without_time()
                .with_target(false)
                .with_thread_names(true),
        )
        .with(
            EnvFilter::from_default_env()
                .add_directive(format!("tasklight={level}").parse()?)
                .add_directive(format!("tasklight_core={level}").parse()?),
        )
        .init();
    Ok(())
}
