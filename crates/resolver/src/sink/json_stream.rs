//! NDJSON (newline-delimited JSON) stream sink.
//!
//! ```ignore
//! let mut sink = JsonStreamSink::stdout();
//! sink.write_resolutions(&resolved)?;
//! sink.write_failures(&failed)?;
//! sink.finish()?;
//! ```

use super::{FailureRow, ResolutionRow};
use crate::rules::Rule;
use serde::Serialize;
use std::io::{self, BufWriter, Write};

const BUFFER_CAPACITY: usize = 64 * 1024;

/// Buffered NDJSON writer. Rows are serialized straight into the buffer.
pub struct JsonStreamSink<W: Write> {
    writer: BufWriter<W>,
    rows_written: usize,
}

impl JsonStreamSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> JsonStreamSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(BUFFER_CAPACITY, writer),
            rows_written: 0,
        }
    }

    pub fn write_resolutions(&mut self, rows: &[ResolutionRow]) -> io::Result<()> {
        rows.iter().try_for_each(|row| self.write_row(row))
    }

    pub fn write_failures(&mut self, rows: &[FailureRow]) -> io::Result<()> {
        rows.iter().try_for_each(|row| self.write_row(row))
    }

    /// One row per rule, tagged with its `kind`.
    pub fn write_rules(&mut self, rules: &[Rule]) -> io::Result<()> {
        rules.iter().try_for_each(|rule| self.write_row(rule))
    }

    fn write_row<T: Serialize>(&mut self, row: &T) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, row).map_err(io::Error::other)?;
        self.writer.write_all(b"\n")?;
        self.rows_written += 1;
        Ok(())
    }

    /// Flush and return how many rows were written.
    pub fn finish(mut self) -> io::Result<usize> {
        self.writer.flush()?;
        Ok(self.rows_written)
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }
}
