//! File logger behind the `log` facade. The terminal owns stdout/stderr, so records go to a file.

use anyhow::{Context, Result};
use log::{LevelFilter, Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

struct FileLogger {
    file: Mutex<File>,
    level: LevelFilter,
    started: Instant,
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(self.started.elapsed().as_millis(), record);
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{line}");
        }
    }

    fn flush(&self) {
        if let Ok(mut file) = self.file.lock() {
            let _ = file.flush();
        }
    }
}

fn format_line(elapsed_ms: u128, record: &Record) -> String {
    format!(
        "{:>8}ms {:<5} {}: {}",
        elapsed_ms,
        record.level(),
        record.target(),
        record.args()
    )
}

/// Truncate `path` and route every record at or above `level` into it.
pub fn init(path: &Path, level: LevelFilter) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;
    log::set_boxed_logger(Box::new(FileLogger {
        file: Mutex::new(file),
        level,
        started: Instant::now(),
    }))
    .context("installing logger")?;
    log::set_max_level(level);
    Ok(())
}
