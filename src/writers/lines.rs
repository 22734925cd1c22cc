//! Defines the `LineWriter` struct used for normalized records and BED-like interval output.
//!
use crate::utils::{open_output, FinishOutput, OutputWriter, Result};
use std::fmt::Display;

/// Structure for writing one formatted record per line.
pub struct LineWriter<W: FinishOutput> {
    /// Destination of the formatted records.
    writer: W,
    /// Number of records written so far.
    written: usize,
}

impl LineWriter<OutputWriter> {
    /// Constructs a new `LineWriter` for a file path.
    ///
    /// # Arguments
    /// * `output_path` - Path of the output file; a `.gz` suffix enables gzip compression.
    ///
    /// # Returns
    /// Returns a `Result` with either a new `LineWriter` instance or an I/O error.
    pub fn create(output_path: &str) -> Result<Self> {
        Ok(Self::from_writer(open_output(output_path)?))
    }
}

impl<W: FinishOutput> LineWriter<W> {
    /// Wraps an existing writer.
    pub fn from_writer(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Writes `record` followed by a newline.
    ///
    /// # Arguments
    /// * `record` - Any value whose `Display` form is one output line.
    pub fn write<T: Display>(&mut self, record: &T) -> Result<()> {
        writeln!(self.writer, "{}", record)?;
        self.written += 1;
        Ok(())
    }

    /// Completes the output and returns the number of records written.
    pub fn finish(mut self) -> Result<usize> {
        self.writer.finish_output()?;
        Ok(self.written)
    }
}
