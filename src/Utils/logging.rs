//! Logger setup: terminal output, optionally duplicated into a log file.
use log::{LevelFilter, SetLoggerError, info};
use simplelog::{
    ColorChoice, CombinedLogger, Config, SharedLogger, TermLogger, TerminalMode, WriteLogger,
};
use std::fs::File;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("Failed to create log file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Logger already initialized: {0}")]
    SetLogger(#[from] SetLoggerError),
}

/// Initializes the global logger. Fails if a logger was already set.
pub fn init_logger(level: LevelFilter, log_file: Option<&Path>) -> Result<(), LoggerError> {
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if let Some(path) = log_file {
        loggers.push(WriteLogger::new(level, Config::default(), File::create(path)?));
    }
    CombinedLogger::init(loggers)?;
    if let Some(path) = log_file {
        info!("logging into {}", path.display());
    }
    Ok(())
}
