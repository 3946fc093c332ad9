//! `metrics.csv` access: header checks, per-run upsert and full rewrite.

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, WriterBuilder};
use rdfizer_core::{methods_label, CompressionMethod, ErrorInfo, RdfizerError};
use tracing::{info, warn};

use crate::record::CompressionRecord;
use crate::schema::{column_index, format_seconds, header_is_canonical, METRICS_HEADER, NULL_FIELD};

fn ledger_error(code: &str, path: &Path, err: impl ToString) -> RdfizerError {
    RdfizerError::Ledger(
        ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()),
    )
}

fn ledger_io_error(code: &str, path: &Path, err: io::Error) -> RdfizerError {
    let denied = err.kind() == io::ErrorKind::PermissionDenied;
    let mut info =
        ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string());
    if denied {
        let dir = path.parent().unwrap_or(path);
        info = info.with_hint(format!(
            "fix ownership, then rerun: sudo chown -R $USER:$USER {}",
            rdfizer_core::shell_quote(&dir.display().to_string())
        ));
    }
    RdfizerError::Ledger(info)
}

/// How the ledger header looked when the file was opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderState {
    /// No file existed; one was created holding only the canonical header.
    Created,
    /// The existing header matched the canonical schema.
    Canonical,
    /// The existing header differed; the old file was copied to `backup` and
    /// its rows were dropped.
    Mismatch {
        /// Copy of the file as found.
        backup: PathBuf,
    },
}

/// One ledger row, stored in canonical column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRow {
    values: Vec<String>,
}

impl LedgerRow {
    fn empty() -> Self {
        Self {
            values: vec![String::new(); METRICS_HEADER.len()],
        }
    }

    fn from_record(record: &csv::StringRecord) -> Self {
        let mut row = Self::empty();
        for (slot, value) in row.values.iter_mut().zip(record.iter()) {
            *slot = value.to_string();
        }
        row
    }

    /// Value of `column`, `None` for unknown columns.
    pub fn get(&self, column: &str) -> Option<&str> {
        column_index(column).map(|idx| self.values[idx].as_str())
    }

    /// Sets `column`; unknown columns are ignored.
    pub fn set(&mut self, column: &str, value: impl Into<String>) {
        if let Some(idx) = column_index(column) {
            self.values[idx] = value.into();
        }
    }

    /// All values, in [`METRICS_HEADER`] order.
    pub fn values(&self) -> &[String] {
        &self.values
    }

    fn matches(&self, run_id: &str, output_name: &str) -> bool {
        self.get("run_id") == Some(run_id) && self.get("output_name") == Some(output_name)
    }
}

/// Identifying fields populated when a row is first appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowIdentity<'a> {
    /// Run key.
    pub run_id: &'a str,
    /// Run start, ISO-8601.
    pub timestamp: &'a str,
    /// Output key.
    pub output_name: &'a str,
    /// Directory of the output's artifacts.
    pub output_dir: &'a Path,
}

/// In-memory view of `metrics.csv` for a single run.
#[derive(Debug)]
pub struct MetricsLedger {
    path: PathBuf,
    state: HeaderState,
    rows: Vec<LedgerRow>,
}

impl MetricsLedger {
    /// Opens the ledger at `path`, creating it or backing up an incompatible
    /// file as `<name>.bak-<run_id>`.
    pub fn open(path: &Path, run_id: &str) -> Result<Self, RdfizerError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| ledger_io_error("ledger_dir", parent, err))?;
        }
        if !path.exists() {
            let ledger = Self {
                path: path.to_path_buf(),
                state: HeaderState::Created,
                rows: Vec::new(),
            };
            ledger.write()?;
            return Ok(ledger);
        }

        let file = File::open(path).map_err(|err| ledger_io_error("ledger_open", path, err))?;
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(file);
        let mut records = reader.records();
        let header = match records.next() {
            Some(record) => Some(record.map_err(|err| ledger_error("ledger_read", path, err))?),
            None => None,
        };

        // An empty file carries no schema to disagree with.
        let canonical = header
            .as_ref()
            .map(|record| header_is_canonical(&record.iter().collect::<Vec<_>>()))
            .unwrap_or(true);
        if !canonical {
            let backup = backup_path(path, run_id);
            fs::copy(path, &backup).map_err(|err| ledger_io_error("ledger_backup", &backup, err))?;
            warn!(
                ledger = %path.display(),
                backup = %backup.display(),
                "metrics header differs from the canonical schema; previous file backed up"
            );
            return Ok(Self {
                path: path.to_path_buf(),
                state: HeaderState::Mismatch { backup },
                rows: Vec::new(),
            });
        }

        let mut rows = Vec::new();
        for record in records {
            let record = record.map_err(|err| ledger_error("ledger_read", path, err))?;
            rows.push(LedgerRow::from_record(&record));
        }
        Ok(Self {
            path: path.to_path_buf(),
            state: HeaderState::Canonical,
            rows,
        })
    }

    /// Backing CSV file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Header state found on open.
    pub fn state(&self) -> &HeaderState {
        &self.state
    }

    /// Rows in file order.
    pub fn rows(&self) -> &[LedgerRow] {
        &self.rows
    }

    /// Row keyed by (run_id, output_name).
    pub fn find(&self, run_id: &str, output_name: &str) -> Option<&LedgerRow> {
        self.rows.iter().find(|row| row.matches(run_id, output_name))
    }

    /// Returns the row keyed by (run_id, output_name), appending a fresh one
    /// with identifying fields set when none exists. The flag is true on append.
    pub fn upsert(&mut self, identity: &RowIdentity<'_>) -> (&mut LedgerRow, bool) {
        let existing = self
            .rows
            .iter()
            .position(|row| row.matches(identity.run_id, identity.output_name));
        match existing {
            Some(idx) => (&mut self.rows[idx], false),
            None => {
                let mut row = LedgerRow::empty();
                row.set("run_id", identity.run_id);
                row.set("timestamp", identity.timestamp);
                row.set("output_name", identity.output_name);
                row.set("output_dir", identity.output_dir.display().to_string());
                self.rows.push(row);
                let last = self.rows.len() - 1;
                (&mut self.rows[last], true)
            }
        }
    }

    /// Rewrites the whole file: canonical header followed by every row.
    pub fn write(&self) -> Result<(), RdfizerError> {
        let file =
            File::create(&self.path).map_err(|err| ledger_io_error("ledger_write", &self.path, err))?;
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_writer(BufWriter::new(file));
        writer
            .write_record(METRICS_HEADER)
            .map_err(|err| ledger_error("ledger_write_header", &self.path, err))?;
        for row in &self.rows {
            writer
                .write_record(row.values())
                .map_err(|err| ledger_error("ledger_write_row", &self.path, err))?;
        }
        writer
            .flush()
            .map_err(|err| ledger_io_error("ledger_flush", &self.path, err))
    }
}

/// `<ledger-name>.bak-<run_id>` next to the ledger.
pub fn backup_path(path: &Path, run_id: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "metrics.csv".to_string());
    path.with_file_name(format!("{name}.bak-{run_id}"))
}

/// Writes the compression defaults and per-method results into `row`.
///
/// Methods absent from the record keep `0` sizes and exit codes and `null`
/// timings, which reads as "not attempted".
pub fn apply_compression(row: &mut LedgerRow, record: &CompressionRecord) {
    row.set("combined_nq_size_bytes", record.combined_size_bytes.to_string());
    row.set("compression_methods", methods_label(&record.methods, "|"));
    for method in CompressionMethod::ALL {
        row.set(&method.size_column(), "0");
        row.set(&method.exit_code_column(), "0");
        row.set(&method.wall_seconds_column(), NULL_FIELD);
        for column in method.reserved_timing_columns() {
            row.set(&column, NULL_FIELD);
        }
    }
    for result in &record.results {
        let method = result.method;
        row.set(&method.size_column(), result.output_size_bytes.to_string());
        row.set(&method.exit_code_column(), result.exit_code.to_string());
        row.set(&method.wall_seconds_column(), format_seconds(result.wall_seconds));
    }
}

/// What [`update_metrics_csv`] did to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerUpdate {
    /// Header state found on open.
    pub state: HeaderState,
    /// True when a new row was added instead of updating one.
    pub appended: bool,
}

/// Opens the ledger, upserts the record's row and rewrites the file.
pub fn update_metrics_csv(
    path: &Path,
    record: &CompressionRecord,
) -> Result<LedgerUpdate, RdfizerError> {
    let mut ledger = MetricsLedger::open(path, &record.run_id)?;
    let identity = RowIdentity {
        run_id: &record.run_id,
        timestamp: &record.timestamp,
        output_name: &record.output_name,
        output_dir: &record.output_dir,
    };
    let (row, appended) = ledger.upsert(&identity);
    apply_compression(row, record);
    ledger.write()?;
    info!(
        ledger = %path.display(),
        run_id = %record.run_id,
        output = %record.output_name,
        appended,
        "metrics ledger updated"
    );
    Ok(LedgerUpdate {
        state: ledger.state().clone(),
        appended,
    })
}
