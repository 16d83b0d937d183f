//! Append-only CSV reports.
//!
//! Every row is written with a single `write_all` of a complete line, so an
//! interrupted run loses at most the row in flight.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct CsvReport {
    path: PathBuf,
    header: Vec<String>,
}

impl CsvReport {
    pub fn new(path: impl Into<PathBuf>, header: &[&str]) -> Self {
        Self {
            path: path.into(),
            header: header.iter().map(|h| h.to_string()).collect(),
        }
    }

    /// `<dir>/<stem>-YYYY-MM-DD.csv` for today's local date.
    pub fn dated(dir: impl AsRef<Path>, stem: &str, header: &[&str]) -> Self {
        Self::new(
            dated_path(dir, stem, Local::now().date_naive()),
            header,
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append<S: AsRef<str>>(&self, fields: &[S]) -> Result<()> {
        self.ensure_parent()?;
        let is_new = !self.path.exists()
            || fs::metadata(&self.path)
                .map(|m| m.len() == 0)
                .unwrap_or(true);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open report {}", self.path.display()))?;

        let mut chunk = String::new();
        if is_new {
            chunk.push_str(&encode_row(&self.header));
        }
        chunk.push_str(&encode_row(fields));

        file.write_all(chunk.as_bytes())
            .with_context(|| format!("Failed to write report {}", self.path.display()))
    }

    /// Replaces the file with the header plus `rows`.
    pub fn overwrite<S: AsRef<str>>(&self, rows: &[Vec<S>]) -> Result<()> {
        self.ensure_parent()?;
        let mut content = encode_row(&self.header);
        for row in rows {
            content.push_str(&encode_row(row));
        }
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write report {}", self.path.display()))
    }

    fn ensure_parent(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create report directory {}", parent.display())
                })?;
            }
        }
        Ok(())
    }
}

pub fn dated_path(dir: impl AsRef<Path>, stem: &str, date: NaiveDate) -> PathBuf {
    dir.as_ref()
        .join(format!("{}-{}.csv", stem, date.format("%Y-%m-%d")))
}

fn encode_row<S: AsRef<str>>(fields: &[S]) -> String {
    let mut line = fields
        .iter()
        .map(|f| escape_field(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    line.push('\n');
    line
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
