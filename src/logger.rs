//! Session logger: writes all `log` records to a single file in the OS data
//! directory.
//!
//! The file is **truncated (overwritten) at each launch**, so it only ever
//! contains output from the most-recent run.
//!
//! Log location:
//!   Windows:  `%APPDATA%\htmap\htmap.log`
//!   Linux:    `~/.local/share/htmap/htmap.log`
//!   macOS:    `~/Library/Application Support/htmap/htmap.log`
//!
//! Library code only uses the `log` macros. The binary calls [`init`] once;
//! with `verbose` set, records are mirrored to stderr as well.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{Level, LevelFilter, Log, Metadata, Record};

static LOGGER: OnceLock<SessionLogger> = OnceLock::new();

struct SessionLogger {
    file: Option<Mutex<File>>,
    path: Option<PathBuf>,
    /// Mirror records at or above this level to stderr.
    stderr_level: LevelFilter,
}

impl Log for SessionLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= LevelFilter::Debug
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(record.level(), &record.args().to_string());
        self.write_line(&line);
        if record.level() <= self.stderr_level {
            eprintln!("{}", line);
        }
    }

    fn flush(&self) {
        if let Some(mutex) = &self.file
            && let Ok(mut file) = mutex.lock()
        {
            let _ = file.flush();
        }
    }
}

impl SessionLogger {
    /// Silently ignores I/O errors so logging never takes the process down.
    fn write_line(&self, line: &str) {
        if let Some(mutex) = &self.file
            && let Ok(mut file) = mutex.lock()
        {
            let _ = writeln!(file, "{}", line);
        }
    }
}

/// Returns the path to the current session log file, if one could be opened.
pub fn log_path() -> Option<&'static PathBuf> {
    LOGGER.get().and_then(|l| l.path.as_ref())
}

/// Initialise the session logger. Safe to call more than once; only the first
/// call has any effect.
///
/// * Creates (or truncates) the log file. Failure to open it is not fatal;
///   stderr mirroring still works.
/// * Installs a panic hook that writes the panic message to the log before
///   running the default handler.
pub fn init(verbose: bool) {
    if LOGGER.get().is_some() {
        return;
    }

    let path = log_file_path();
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let file = match OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&path)
    {
        Ok(f) => Some(f),
        Err(e) => {
            eprintln!("[logger] Failed to open log file {:?}: {}", path, e);
            None
        }
    };

    let logger = SessionLogger {
        path: file.as_ref().map(|_| path.clone()),
        file: file.map(Mutex::new),
        stderr_level: if verbose {
            LevelFilter::Info
        } else {
            LevelFilter::Warn
        },
    };
    let logger = LOGGER.get_or_init(|| logger);
    if log::set_logger(logger).is_err() {
        return;
    }
    log::set_max_level(LevelFilter::Debug);

    logger.write_line(&format!(
        "=== htmap session started {} ===",
        human_timestamp()
    ));
    if let Some(path) = &logger.path {
        logger.write_line(&format!("Log file: {}", path.display()));
    }
    logger.write_line("");

    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if let Some(l) = LOGGER.get() {
            l.write_line(&format!("[{}] [PANIC] {}", timestamp(), info));
            l.flush();
        }
        prev(info);
    }));
}

fn format_line(level: Level, msg: &str) -> String {
    format!("[{}] [{}] {}", timestamp(), level, msg)
}

fn log_file_path() -> PathBuf {
    data_dir().join("htmap").join("htmap.log")
}

/// Platform data directory (without the app sub-folder).
fn data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata);
        }
    }
    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support");
        }
    }
    // Linux / fallback
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    PathBuf::from(".")
}

/// `HH:MM:SS` within the current UTC day.
fn timestamp() -> String {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => {
            let secs = d.as_secs();
            let h = (secs % 86400) / 3600;
            let m = (secs % 3600) / 60;
            let s = secs % 60;
            format!("{:02}:{:02}:{:02}", h, m, s)
        }
        Err(_) => "??:??:??".to_string(),
    }
}

fn human_timestamp() -> String {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => format!("(unix {})", d.as_secs()),
        Err(_) => "(unknown time)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_format() {
        let line = format_line(Level::Warn, "low memory");
        assert!(line.ends_with("] [WARN] low memory"), "{line}");
        assert_eq!(line.as_bytes()[0], b'[');
        assert_eq!(&line[3..4], ":");
    }

    #[test]
    fn log_file_lives_under_app_folder() {
        let path = log_file_path();
        assert!(path.ends_with("htmap/htmap.log"));
    }
}
