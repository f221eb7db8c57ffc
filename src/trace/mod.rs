//! Install and start traces
//!
//! Every side effect an install or start makes is appended as one JSON
//! line to a trace file under the component's trace directory. Uninstall
//! and stop replay those files, so they undo exactly what was done,
//! including work from a run that failed half way.
//!
//! ```text
//! {"kind":"dir_created","path":"/opt/stack/quantum/app"}
//! {"kind":"package_installed","source":"pip","package":{"name":"eventlet","version":"0.9.16"}}
//! ```

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{self, Result, StackError};
use crate::packaging::PackageInfo;

/// Trace file recording install side effects
pub const INSTALL_TRACE: &str = "install.trace";

/// Trace file recording started applications
pub const START_TRACE: &str = "start.trace";

/// Which packager installed a package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageSource {
    Os,
    Pip,
}

/// One recorded side effect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceEntry {
    DirCreated {
        path: PathBuf,
    },
    Downloaded {
        uri: String,
        branch: Option<String>,
        target: PathBuf,
    },
    ConfigWritten {
        name: String,
        path: PathBuf,
        hash: String,
    },
    PackageInstalled {
        source: PackageSource,
        package: PackageInfo,
    },
    PythonDeveloped {
        path: PathBuf,
    },
    AppStarted {
        name: String,
        pid: u32,
        stdout: PathBuf,
        stderr: PathBuf,
    },
}

/// Appends entries to one trace file
#[derive(Debug, Clone)]
pub struct TraceWriter {
    path: PathBuf,
    dry_run: bool,
}

impl TraceWriter {
    /// Writer for `file` in `trace_dir`; in dry-run nothing is written
    pub fn new(trace_dir: &Path, file: &str, dry_run: bool) -> Self {
        Self {
            path: trace_dir.join(file),
            dry_run,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, entry: &TraceEntry) -> Result<()> {
        if self.dry_run {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let line = serde_json::to_string(entry).map_err(|e| error::io_error(e.to_string()))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| error::file_write_failed(self.path.display().to_string(), e.to_string()))?;
        writeln!(file, "{line}")
            .map_err(|e| error::file_write_failed(self.path.display().to_string(), e.to_string()))?;
        tracing::trace!(path = %self.path.display(), %line, "trace recorded");
        Ok(())
    }
}

impl TraceWriter {
    /// Record `entry` unless an identical entry is already in the trace
    pub fn record_once(&self, entry: &TraceEntry) -> Result<()> {
        if self.dry_run || read_trace(&self.path)?.contains(entry) {
            return Ok(());
        }
        self.record(entry)
    }

    /// Replace the whole trace with `entries`
    pub fn rewrite(&self, entries: &[TraceEntry]) -> Result<()> {
        if self.dry_run {
            return Ok(());
        }
        remove_trace(&self.path)?;
        for entry in entries {
            self.record(entry)?;
        }
        Ok(())
    }
}

/// Read every entry of a trace file; a missing file reads as empty
pub fn read_trace(path: &Path) -> Result<Vec<TraceEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = File::open(path)
        .map_err(|e| error::file_read_failed(path.display().to_string(), e.to_string()))?;
    let mut entries = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entry = serde_json::from_str(&line).map_err(|e| StackError::TraceCorrupt {
            path: path.display().to_string(),
            line: idx + 1,
            reason: e.to_string(),
        })?;
        entries.push(entry);
    }
    Ok(entries)
}

/// Remove a trace file if present
pub fn remove_trace(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(error::file_write_failed(path.display().to_string(), e.to_string())),
    }
}
