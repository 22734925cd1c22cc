//! Defines the `MatrixWriter` struct for writing occurrence matrices as delimited tables.
//!
use crate::scan::SparseCountMatrix;
use crate::utils::{open_output, FinishOutput, OutputWriter, Result};

/// Structure for writing a `SparseCountMatrix` as a dense table.
///
/// Rows are sequence ids, columns are element types, and pairs without an entry
/// are written as 0. The header row starts with an empty cell. Sequence ids
/// typically contain commas, so fields are quoted as needed.
pub struct MatrixWriter<W: FinishOutput> {
    /// The CSV writer used to emit the table.
    writer: Option<csv::Writer<W>>,
}

impl MatrixWriter<OutputWriter> {
    /// Constructs a new `MatrixWriter` instance.
    ///
    /// # Arguments
    /// * `output_path` - Path of the output table; a `.gz` suffix enables gzip compression.
    /// * `delimiter` - Field delimiter, `b','` for CSV.
    ///
    /// # Returns
    /// Returns a `Result` with either a new `MatrixWriter` instance or an I/O error.
    pub fn new(output_path: &str, delimiter: u8) -> Result<Self> {
        Ok(Self::from_writer(open_output(output_path)?, delimiter))
    }
}

impl<W: FinishOutput> MatrixWriter<W> {
    pub fn from_writer(writer: W, delimiter: u8) -> Self {
        let writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(writer);
        Self {
            writer: Some(writer),
        }
    }

    /// Writes the whole matrix and completes the output.
    ///
    /// # Arguments
    /// * `matrix` - The finalized occurrence matrix.
    ///
    /// # Returns
    /// Returns the number of data rows written.
    pub fn write(&mut self, matrix: &SparseCountMatrix) -> Result<usize> {
        let mut writer = self.writer.take().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::Other,
                "write after the output was finished",
            )
        })?;
        let element_types = matrix.element_types();
        let sequence_ids = matrix.sequence_ids();

        let mut header = Vec::with_capacity(element_types.len() + 1);
        header.push("");
        header.extend(element_types.iter().copied());
        writer.write_record(&header)?;

        let mut row = Vec::with_capacity(element_types.len() + 1);
        for sequence_id in &sequence_ids {
            row.clear();
            row.push(sequence_id.to_string());
            row.extend(
                element_types
                    .iter()
                    .map(|element_type_id| matrix.get(element_type_id, sequence_id).to_string()),
            );
            writer.write_record(&row)?;
        }
        writer.flush()?;
        writer
            .into_inner()
            .map_err(|e| e.into_error())?
            .finish_output()?;
        Ok(sequence_ids.len())
    }
}
