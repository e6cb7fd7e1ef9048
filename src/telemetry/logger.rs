//! Rotating snapshot writer

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::LogFormat;
use crate::config::TelemetryConfig;
use crate::dictionary::ObjectDictionary;
use crate::error::Result;
use crate::link::LinkStats;

/// File name prefix for every telemetry file
const FILE_PREFIX: &str = "telemetry_";

#[derive(Serialize)]
struct Record<'a> {
    timestamp: String,
    role: &'a str,
    link: &'a LinkStats,
    dictionary: &'a ObjectDictionary,
}

/// Writes dictionary snapshots, rotating and pruning files as it goes
pub struct TelemetryLogger {
    dir: PathBuf,
    format: LogFormat,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    writer: Option<BufWriter<File>>,
    records_in_file: usize,
    file_index: u64,
}

impl std::fmt::Debug for TelemetryLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryLogger")
            .field("dir", &self.dir)
            .field("format", &self.format)
            .field("records_in_file", &self.records_in_file)
            .finish_non_exhaustive()
    }
}

impl TelemetryLogger {
    /// Create the log directory if needed; the first file opens on first write
    pub fn new(config: &TelemetryConfig) -> Result<Self> {
        let dir = PathBuf::from(&config.log_dir);
        fs::create_dir_all(&dir)?;
        info!("Telemetry logging to {} ({:?})", dir.display(), config.format);

        Ok(Self {
            dir,
            format: config.format,
            max_records_per_file: config.max_records_per_file.max(1),
            max_files_to_keep: config.max_files_to_keep.max(1),
            writer: None,
            records_in_file: 0,
            file_index: 0,
        })
    }

    /// Append one snapshot
    pub fn log(&mut self, role: &str, dict: &ObjectDictionary, stats: &LinkStats) -> Result<()> {
        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        let timestamp = Utc::now().to_rfc3339();
        let format = self.format;
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };

        match format {
            LogFormat::Jsonl => {
                let record = Record {
                    timestamp,
                    role,
                    link: stats,
                    dictionary: dict,
                };
                serde_json::to_writer(&mut *writer, &record)?;
                writer.write_all(b"\n")?;
            }
            LogFormat::Csv => {
                writeln!(
                    writer,
                    "{},{},{},{},{},{}",
                    timestamp,
                    role,
                    stats.frames_sent,
                    stats.frames_received,
                    stats.crc_errors,
                    dict.csv_row()
                )?;
            }
        }

        self.records_in_file += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    fn rotate(&mut self) -> Result<()> {
        self.flush()?;

        let name = format!(
            "{}{}_{:04}.{}",
            FILE_PREFIX,
            Utc::now().format("%Y%m%d_%H%M%S"),
            self.file_index,
            self.format.extension()
        );
        self.file_index += 1;

        let path = self.dir.join(name);
        let mut writer = BufWriter::new(File::create(&path)?);
        if self.format == LogFormat::Csv {
            writeln!(
                writer,
                "timestamp,role,frames_sent,frames_received,crc_errors,{}",
                ObjectDictionary::csv_header()
            )?;
        }
        debug!("Opened telemetry file {}", path.display());

        self.writer = Some(writer);
        self.records_in_file = 0;
        self.prune()
    }

    /// Delete the oldest telemetry files beyond the retention limit
    fn prune(&self) -> Result<()> {
        let mut files = telemetry_files(&self.dir, self.format)?;
        if files.len() <= self.max_files_to_keep {
            return Ok(());
        }

        files.sort();
        let excess = files.len() - self.max_files_to_keep;
        for old in &files[..excess] {
            if let Err(e) = fs::remove_file(old) {
                warn!("Failed to remove old telemetry file {}: {}", old.display(), e);
            }
        }
        Ok(())
    }
}

impl Drop for TelemetryLogger {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!("Failed to flush telemetry on shutdown: {}", e);
        }
    }
}

/// Telemetry files of the given format in `dir`
fn telemetry_files(dir: &Path, format: LogFormat) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with(FILE_PREFIX))
            .unwrap_or(false)
            && path.extension().and_then(|e| e.to_str()) == Some(format.extension());
        if matches {
            files.push(path);
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(dir: &TempDir, format: LogFormat, per_file: usize, keep: usize) -> TelemetryConfig {
        TelemetryConfig {
            enabled: true,
            log_dir: dir.path().to_string_lossy().into_owned(),
            max_records_per_file: per_file,
            max_files_to_keep: keep,
            log_interval_ms: 100,
            format,
        }
    }

    fn read_all(dir: &TempDir, format: LogFormat) -> Vec<String> {
        let mut files = telemetry_files(dir.path(), format).unwrap();
        files.sort();
        files
            .iter()
            .map(|p| fs::read_to_string(p).unwrap())
            .collect()
    }

    #[test]
    fn test_jsonl_record_shape() {
        let dir = TempDir::new().unwrap();
        let mut logger = TelemetryLogger::new(&config(&dir, LogFormat::Jsonl, 100, 10)).unwrap();

        let mut dict = ObjectDictionary::new();
        dict.chamber_pressure = 18.5;
        let stats = LinkStats {
            frames_received: 3,
            ..Default::default()
        };
        logger.log("avionics", &dict, &stats).unwrap();
        logger.flush().unwrap();

        let contents = read_all(&dir, LogFormat::Jsonl);
        assert_eq!(contents.len(), 1);
        let line = contents[0].lines().next().unwrap();
        let value: serde_json::Value = serde_json::from_str(line).unwrap();

        assert_eq!(value["role"], "avionics");
        assert_eq!(value["link"]["frames_received"], 3);
        assert_eq!(value["dictionary"]["chamber_pressure"], 18.5);
        assert!(value["dictionary"]["pressure_tank_eth"].is_null());
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_csv_has_header_and_rows() {
        let dir = TempDir::new().unwrap();
        let mut logger = TelemetryLogger::new(&config(&dir, LogFormat::Csv, 100, 10)).unwrap();

        let dict = ObjectDictionary::new();
        let stats = LinkStats::default();
        logger.log("propulsion", &dict, &stats).unwrap();
        logger.log("propulsion", &dict, &stats).unwrap();
        logger.flush().unwrap();

        let contents = read_all(&dir, LogFormat::Csv);
        let lines: Vec<&str> = contents[0].lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("timestamp,role,frames_sent,"));
        assert_eq!(lines[0].split(',').count(), lines[1].split(',').count());
        assert!(lines[1].contains(",propulsion,"));
    }

    #[test]
    fn test_rotation_after_record_limit() {
        let dir = TempDir::new().unwrap();
        let mut logger = TelemetryLogger::new(&config(&dir, LogFormat::Jsonl, 2, 10)).unwrap();

        let dict = ObjectDictionary::new();
        let stats = LinkStats::default();
        for _ in 0..5 {
            logger.log("avionics", &dict, &stats).unwrap();
        }
        logger.flush().unwrap();

        let contents = read_all(&dir, LogFormat::Jsonl);
        assert_eq!(contents.len(), 3);
        let counts: Vec<usize> = contents.iter().map(|c| c.lines().count()).collect();
        assert_eq!(counts, vec![2, 2, 1]);
    }

    #[test]
    fn test_old_files_are_pruned() {
        let dir = TempDir::new().unwrap();
        let mut logger = TelemetryLogger::new(&config(&dir, LogFormat::Jsonl, 1, 2)).unwrap();

        let dict = ObjectDictionary::new();
        let stats = LinkStats::default();
        for _ in 0..5 {
            logger.log("avionics", &dict, &stats).unwrap();
        }

        let files = telemetry_files(dir.path(), LogFormat::Jsonl).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_unrelated_files_are_left_alone() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("notes.txt"), "keep me").unwrap();

        let mut logger = TelemetryLogger::new(&config(&dir, LogFormat::Jsonl, 1, 1)).unwrap();
        let dict = ObjectDictionary::new();
        for _ in 0..3 {
            logger.log("avionics", &dict, &LinkStats::default()).unwrap();
        }

        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let config = TelemetryConfig {
            log_dir: nested.to_string_lossy().into_owned(),
            ..TelemetryConfig::default()
        };
        TelemetryLogger::new(&config).unwrap();
        assert!(nested.is_dir());
    }
}
