use simplelog::*;
use std::fs::{self, OpenOptions};
use std::io::{Error, ErrorKind};
use std::path::PathBuf;
use std::sync::OnceLock;

static INIT: OnceLock<bool> = OnceLock::new();

/// Directory the log file lives in: `$HOME/.local/share/pulsesync/logs`.
pub fn log_dir() -> Result<PathBuf, Error> {
    let home = std::env::var("HOME")
        .map_err(|_| Error::new(ErrorKind::NotFound, "HOME environment variable not set"))?;

    Ok(PathBuf::from(home)
        .join(".local")
        .join("share")
        .join("pulsesync")
        .join("logs"))
}

/// Logs to file at `level`, and also to stderr when `to_terminal` is set.
/// Only the first call installs a logger.
pub fn init_logger(level: LevelFilter, to_terminal: bool) -> Result<(), Error> {
    let log_dir = log_dir()?;
    fs::create_dir_all(&log_dir)?;

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("pulsesync.log"))?;

    let initialized = *INIT.get_or_init(|| {
        let mut loggers: Vec<Box<dyn SharedLogger>> =
            vec![WriteLogger::new(level, Config::default(), log_file)];
        if to_terminal {
            loggers.push(TermLogger::new(
                level,
                Config::default(),
                TerminalMode::Stderr,
                ColorChoice::Auto,
            ));
        }
        CombinedLogger::init(loggers).is_ok()
    });

    if initialized {
        Ok(())
    } else {
        Err(Error::new(ErrorKind::Other, "Logger initialization failed"))
    }
}
