//! Staged line writer.

use std::fmt::Display;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::config::{FIELD_DELIMITER, METADATA_SEPARATOR};
use crate::error_handling::{ExportError, Result};

/// Writes lines to a temporary file next to `destination` and moves it over
/// `destination` on [`StagedWriter::finish`]. Dropping the writer unfinished
/// removes the temporary file.
pub(crate) struct StagedWriter {
    destination: PathBuf,
    file: BufWriter<NamedTempFile>,
    lines: usize,
}

impl StagedWriter {
    /// Creates the destination's parent directories and the temporary file.
    pub(crate) fn create(destination: &Path) -> Result<Self> {
        let parent = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(|e| ExportError::io(parent, e))?;
        let temp = NamedTempFile::new_in(parent).map_err(|e| ExportError::io(destination, e))?;

        Ok(Self {
            destination: destination.to_path_buf(),
            file: BufWriter::new(temp),
            lines: 0,
        })
    }

    /// Writes one tab-delimited line. Fields are written as-is.
    pub(crate) fn write_record<I>(&mut self, fields: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Display,
    {
        for (index, field) in fields.into_iter().enumerate() {
            if index > 0 {
                self.write(format_args!("{FIELD_DELIMITER}"))?;
            }
            self.write(format_args!("{field}"))?;
        }
        self.end_line()
    }

    /// Writes one `key: value` line.
    pub(crate) fn write_entry(&mut self, key: &str, value: &str) -> Result<()> {
        self.write(format_args!("{key}{METADATA_SEPARATOR}{value}"))?;
        self.end_line()
    }

    /// Flushes and moves the temporary file over the destination.
    /// Returns the number of lines written.
    pub(crate) fn finish(self) -> Result<usize> {
        let StagedWriter {
            destination,
            file,
            lines,
        } = self;

        let temp = file
            .into_inner()
            .map_err(|e| ExportError::io(&destination, e.into_error()))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| ExportError::io(&destination, e))?;
        temp.persist(&destination)
            .map_err(|e| ExportError::io(&destination, e.error))?;
        Ok(lines)
    }

    fn write(&mut self, args: std::fmt::Arguments<'_>) -> Result<()> {
        self.file
            .write_fmt(args)
            .map_err(|e| ExportError::io(&self.destination, e))
    }

    fn end_line(&mut self) -> Result<()> {
        self.file
            .write_all(b"\n")
            .map_err(|e| ExportError::io(&self.destination, e))?;
        self.lines += 1;
        Ok(())
    }
}
