use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::errors::Result;
use crate::models::{Fm26Installation, LogInfo};

/// Full BepInEx log contents, empty when the game has not written one yet.
pub fn read_log(install: &Fm26Installation) -> Result<String> {
    let log_path = Path::new(&install.log_path);
    if !log_path.exists() {
        return Ok(String::new());
    }
    Ok(fs::read_to_string(log_path)?)
}

/// Last `max_lines` lines of the log, for the tail view. The whole file is
/// still read; BepInEx logs stay small enough that seeking is not worth it.
pub fn tail_log(install: &Fm26Installation, max_lines: usize) -> Result<String> {
    let content = read_log(install)?;
    let lines: Vec<&str> = content.lines().collect();
    let start = lines.len().saturating_sub(max_lines);
    Ok(lines[start..].join("\n"))
}

pub fn log_info(install: &Fm26Installation) -> Result<LogInfo> {
    let log_path = Path::new(&install.log_path);

    if !log_path.exists() {
        return Ok(LogInfo {
            exists: false,
            size_bytes: 0,
            modified: None,
            path: install.log_path.clone(),
        });
    }

    let metadata = fs::metadata(log_path)?;
    let modified = metadata.modified().ok().map(|time| {
        let datetime: DateTime<Utc> = time.into();
        datetime.format("%Y-%m-%d %H:%M:%S").to_string()
    });

    Ok(LogInfo {
        exists: true,
        size_bytes: metadata.len(),
        modified,
        path: install.log_path.clone(),
    })
}

pub fn clear_log(install: &Fm26Installation) -> Result<()> {
    let log_path = Path::new(&install.log_path);
    if log_path.exists() {
        fs::write(log_path, "")?;
    }
    Ok(())
}
