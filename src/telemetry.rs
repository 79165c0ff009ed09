//! # Telemetry buffer
//!
//! Samples received from the log configurations are accumulated in memory, per variable, for the whole
//! session and written once to a JSON file when the flight is over:
//!
//! ```json
//! {
//!     "stateEstimate.roll": {
//!         "time": [1200, 1210],
//!         "data": [0.25, 0.31]
//!     }
//! }
//! ```
//!
//! Files are never overwritten, see [TelemetryBuffer::persist_in()].

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use log::debug;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::link::TelemetrySample;
use crate::{Error, Result};

/// Time series of one variable
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Series {
    /// Crazyflie timestamps in milliseconds, strictly increasing
    pub time: Vec<u32>,
    /// Values, one per timestamp
    pub data: Vec<f64>,
}

impl Series {
    fn push(&mut self, timestamp: u32, value: f64) -> bool {
        if let Some(&last) = self.time.last() {
            if timestamp <= last {
                return false;
            }
        }
        self.time.push(timestamp);
        self.data.push(value);
        true
    }
}

/// In-memory telemetry storage
///
/// The set of variables is fixed when the buffer is created. Samples for other variables are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetryBuffer {
    series: Vec<(String, Series)>,
}

impl TelemetryBuffer {
    /// Create an empty buffer for the given variables
    ///
    /// Duplicated names are only registered once.
    pub fn new(variables: &[String]) -> Self {
        let mut series: Vec<(String, Series)> = Vec::with_capacity(variables.len());
        for name in variables {
            if !series.iter().any(|(n, _)| n == name) {
                series.push((name.clone(), Series::default()));
            }
        }
        Self { series }
    }

    /// Names of the registered variables, in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.series.iter().map(|(name, _)| name.as_str())
    }

    /// Series of a variable, `None` if the variable is not registered
    pub fn get(&self, name: &str) -> Option<&Series> {
        self.series
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, series)| series)
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut Series> {
        self.series
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, series)| series)
    }

    /// Append a telemetry sample
    ///
    /// Every value is appended to the series of its variable. Values whose timestamp is not newer than the last
    /// recorded one for the same variable are dropped. Returns the number of values recorded.
    pub fn record(&mut self, sample: &TelemetrySample) -> usize {
        let mut recorded = 0;
        for (name, value) in &sample.values {
            match self.get_mut(name) {
                Some(series) => {
                    if series.push(sample.timestamp, *value) {
                        recorded += 1;
                    } else {
                        debug!(
                            "Dropping out of order sample for {} at {} ms",
                            name, sample.timestamp
                        );
                    }
                }
                None => debug!("Ignoring sample for unregistered variable {}", name),
            }
        }
        recorded
    }

    /// Total number of values stored
    pub fn len(&self) -> usize {
        self.series.iter().map(|(_, s)| s.time.len()).sum()
    }

    /// True if no value has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the buffer as pretty printed JSON, indented with 4 spaces
    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(writer, formatter);
        self.serialize(&mut serializer)?;
        Ok(())
    }

    /// Write the buffer to a new file in `dir`
    ///
    /// A trailing `.json` is removed from `base`, the file is then named `<base><n>.json` with `n` the first
    /// integer, starting at 1, for which no file exists yet. For example if `run1.json` exists, `run` is
    /// written to `run2.json`. Returns the path of the written file.
    ///
    /// If the write fails the partially written file is removed.
    pub fn persist_in(&self, dir: &Path, base: &str) -> Result<PathBuf> {
        create_numbered(dir, base, |writer| self.write_json(writer))
    }
}

impl Serialize for TelemetryBuffer {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.series.len()))?;
        for (name, series) in &self.series {
            map.serialize_entry(name, series)?;
        }
        map.end()
    }
}

// Creates `<stem><n>.json` in `dir` and fills it with `write`
fn create_numbered<F>(dir: &Path, base: &str, write: F) -> Result<PathBuf>
where
    F: Fn(&mut BufWriter<File>) -> Result<()>,
{
    let stem = base.strip_suffix(".json").unwrap_or(base);

    let mut n: u32 = 1;
    loop {
        let path = dir.join(format!("{}{}.json", stem, n));
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => {
                let mut writer = BufWriter::new(file);
                let written = write(&mut writer).and_then(|_| writer.flush().map_err(Error::from));
                if let Err(e) = written {
                    drop(writer);
                    let _ = std::fs::remove_file(&path);
                    return Err(e);
                }
                return Ok(path);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => n += 1,
            Err(e) => return Err(e.into()),
        }
    }
}
