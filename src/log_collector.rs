//! Decoupled logging pipeline for kernel runs.
//!
//! Every record goes to the terminal immediately and to a timestamped log
//! file through a background writer thread, so slow disks never stall the
//! build output stream.
//!
//! # Architecture
//!
//! ```text
//! log::info!() / make output
//!     |
//! [LogCollector] ---- terminal (coloured by level)
//!     | (crossbeam unbounded channel)
//!     v
//! [DiskPersister thread]
//!     |
//! ~/kernel-builds/logs/kstream-<ts>.log
//! ```

use chrono::Local;
use crossbeam_channel::{unbounded, Sender};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// Internal log line or special marker
enum LogMessage {
    Line(LogLine),
    /// Flush marker with channel sender to signal completion
    Flush(std::sync::mpsc::Sender<()>),
}

/// Default log directory: ~/kernel-builds/logs
pub fn get_global_logs_path() -> Result<PathBuf, String> {
    let home = dirs::home_dir().ok_or_else(|| "Cannot determine home directory".to_string())?;
    Ok(home.join("kernel-builds").join("logs"))
}

/// Ensure the log directory exists
pub fn ensure_logs_dir_exists(log_dir: &Path) -> Result<(), String> {
    std::fs::create_dir_all(log_dir)
        .map_err(|e| format!("Failed to create logs directory {}: {}", log_dir.display(), e))
}

/// File name for a run started now: kstream-YYYYmmdd-HHMMSS.log
pub fn session_file_name() -> String {
    format!("kstream-{}.log", Local::now().format("%Y%m%d-%H%M%S"))
}

/// A log line with metadata
#[derive(Clone, Debug)]
pub struct LogLine {
    pub message: String,
    pub level: Level,
    /// High-level milestone rather than raw tool output
    pub parsed: bool,
    pub timestamp: String,
}

impl LogLine {
    pub fn new(level: Level, message: String) -> Self {
        LogLine {
            message,
            level,
            parsed: false,
            timestamp: Local::now().format("%H:%M:%S%.3f").to_string(),
        }
    }

    pub fn parsed(level: Level, message: String) -> Self {
        LogLine {
            parsed: true,
            ..LogLine::new(level, message)
        }
    }

    /// `[HH:MM:SS.mmm] [LEVEL] message` as written to disk
    pub fn format_for_file(&self) -> String {
        format!("[{}] [{}] {}\n", self.timestamp, self.level, self.message)
    }
}

/// Unified logger that writes to the terminal and the run log file
#[derive(Clone)]
pub struct LogCollector {
    tx: Sender<LogMessage>,
    log_path: PathBuf,
    max_level: LevelFilter,
}

impl LogCollector {
    /// Create the log file `log_dir/file_name` and start the disk persister.
    pub fn new(log_dir: &Path, file_name: &str, max_level: LevelFilter) -> Result<Self, String> {
        ensure_logs_dir_exists(log_dir)?;
        let log_path = log_dir.join(file_name);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .map_err(|e| format!("Failed to create log file {}: {}", log_path.display(), e))?;

        let (tx, rx) = unbounded::<LogMessage>();

        std::thread::spawn(move || {
            while let Ok(msg) = rx.recv() {
                match msg {
                    LogMessage::Line(line) => {
                        let _ = file.write_all(line.format_for_file().as_bytes());
                    }
                    LogMessage::Flush(done) => {
                        let _ = file.flush();
                        let _ = file.sync_data();
                        let _ = done.send(());
                    }
                }
            }
        });

        Ok(LogCollector {
            tx,
            log_path,
            max_level,
        })
    }

    /// Path of this run's log file
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Send a log line (non-blocking)
    pub fn log_line(&self, line: LogLine) {
        if line.level > self.max_level {
            return;
        }
        print_to_terminal(&line);
        let _ = self.tx.send(LogMessage::Line(line));
    }

    /// Block until every line sent before this call is on disk.
    pub fn wait_for_empty(&self) -> Result<(), String> {
        let (done_tx, done_rx) = std::sync::mpsc::channel::<()>();
        self.tx
            .send(LogMessage::Flush(done_tx))
            .map_err(|e| format!("Failed to send flush marker: {}", e))?;
        done_rx
            .recv()
            .map_err(|e| format!("Flush signal interrupted: {}", e))
    }

    /// Register as the global `log` backend.
    pub fn install(&self) -> Result<(), String> {
        log::set_boxed_logger(Box::new(self.clone()))
            .map(|()| log::set_max_level(self.max_level))
            .map_err(|e| format!("Failed to set global logger: {}", e))
    }
}

fn print_to_terminal(line: &LogLine) {
    match line.level {
        Level::Error => eprintln!("{}ERROR{} {}", RED, RESET, line.message),
        Level::Warn => eprintln!("{}WARN{}  {}", YELLOW, RESET, line.message),
        Level::Info if line.parsed => println!("{}==>{} {}", GREEN, RESET, line.message),
        Level::Info => println!("{}", line.message),
        Level::Debug | Level::Trace => println!("{}{}{}", DIM, line.message, RESET),
    }
}

/// Wires log::info!(), log::warn!(), log::error!() into the collector
impl Log for LogCollector {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = record.args().to_string();
        // Target-aware routing: "parsed" marks high-level milestones
        if record.target() == "parsed" {
            self.log_line(LogLine::parsed(record.level(), message));
        } else {
            self.log_line(LogLine::new(record.level(), message));
        }
    }

    fn flush(&self) {
        let _ = self.wait_for_empty();
    }
}

/// Parse a level name from `KSTREAM_LOG_LEVEL`; unknown names fall back to info.
pub fn level_from_name(name: Option<&str>) -> LevelFilter {
    name.and_then(|n| n.trim().parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info)
}

/// Logging macro for high-level milestones
#[macro_export]
macro_rules! log_parsed {
    ($($arg:tt)*) => {{
        $crate::log::info!(target: "parsed", $($arg)*);
    }}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_collector_creates_log_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let logs = temp_dir.path().join("logs");
        let collector = LogCollector::new(&logs, "run.log", LevelFilter::Info)
            .unwrap();

        assert!(logs.join("run.log").exists());
        assert_eq!(collector.log_path(), logs.join("run.log"));
    }

    #[test]
    fn test_lines_reach_disk_after_flush() {
        let temp_dir = tempfile::tempdir().unwrap();
        let collector = LogCollector::new(temp_dir.path(), "run.log", LevelFilter::Info)
            .unwrap();

        for i in 0..500 {
            collector.log_line(LogLine::new(Level::Info, format!("  CC      file{}.o", i)));
        }
        collector.log_line(LogLine::parsed(Level::Info, "Build complete".into()));
        collector.wait_for_empty().unwrap();

        let content = fs::read_to_string(temp_dir.path().join("run.log")).unwrap();
        assert_eq!(content.lines().count(), 501);
        assert!(content.lines().last().unwrap().ends_with("[INFO] Build complete"));
    }

    #[test]
    fn test_level_filtering() {
        let temp_dir = tempfile::tempdir().unwrap();
        let collector = LogCollector::new(temp_dir.path(), "run.log", LevelFilter::Warn)
            .unwrap();

        collector.log_line(LogLine::new(Level::Debug, "hidden".into()));
        collector.log_line(LogLine::new(Level::Warn, "shown".into()));
        collector.wait_for_empty().unwrap();

        let content = fs::read_to_string(temp_dir.path().join("run.log")).unwrap();
        assert!(!content.contains("hidden"));
        assert!(content.contains("[WARN] shown"));
    }

    #[test]
    fn test_session_file_name_shape() {
        let name = session_file_name();
        assert!(name.starts_with("kstream-"));
        assert!(name.ends_with(".log"));
        // kstream-YYYYmmdd-HHMMSS.log
        assert_eq!(name.len(), "kstream-".len() + 15 + ".log".len());
    }

    #[test]
    fn test_level_from_name() {
        assert_eq!(level_from_name(Some("debug")), LevelFilter::Debug);
        assert_eq!(level_from_name(Some("bogus")), LevelFilter::Info);
        assert_eq!(level_from_name(None), LevelFilter::Info);
    }
}
