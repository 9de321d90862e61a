use log::LevelFilter;
use simplelog::{ColorChoice, CombinedLogger, ConfigBuilder, SharedLogger, TermLogger, TerminalMode, WriteLogger};
use std::fs::File;
use std::path::Path;

fn config() -> simplelog::Config {
    ConfigBuilder::new()
        .set_time_level(LevelFilter::Debug)
        .set_thread_level(LevelFilter::Trace)
        .set_target_level(LevelFilter::Trace)
        .build()
}

/// Installs the global logger: the terminal at `level`, plus a full debug log in
/// `log_file` when one is given. A second call is a no-op.
pub fn init_logging(level: LevelFilter, log_file: Option<&Path>) -> std::io::Result<()> {
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        config(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if let Some(path) = log_file {
        loggers.push(WriteLogger::new(LevelFilter::Debug, config(), File::create(path)?));
    }
    if CombinedLogger::init(loggers).is_err() {
        log::debug!("logger already installed");
    }
    Ok(())
}

/// `RUST_LOG`-style level names, `info` when unset or unknown.
pub fn level_from_env(var: &str) -> LevelFilter {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info)
}
