use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Could not parse {field} from '{value}'")]
    NumericParseError { field: &'static str, value: String },

    #[error("Sequence id '{0}' not found in reference table")]
    UnknownSequenceId(String),

    #[error("Invalid strand '{strand}' in sequence id '{sequence_id}'")]
    InvalidStrand { strand: String, sequence_id: String },

    #[error("Interval {start}-{end} for '{sequence_id}' falls outside reference {ref_start}-{ref_end}")]
    IntervalOutOfBounds {
        sequence_id: String,
        start: i128,
        end: i128,
        ref_start: u64,
        ref_end: u64,
    },

    #[error("Duplicate reference entry for '{sequence_id}' with conflicting coordinates at line {line_number}")]
    DuplicateKey {
        sequence_id: String,
        line_number: usize,
    },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Error at line {line_number}: {source}\n  record: {line}")]
    Record {
        line_number: usize,
        line: String,
        source: Box<Error>,
    },
}

impl Error {
    pub fn at_line(self, line_number: usize, line: &str) -> Self {
        Error::Record {
            line_number,
            line: line.to_string(),
            source: Box::new(self),
        }
    }

    pub fn numeric(field: &'static str, value: &str) -> Self {
        Error::NumericParseError {
            field,
            value: value.to_string(),
        }
    }

    /// Errors confined to a single malformed line.
    pub fn is_parse_error(&self) -> bool {
        match self {
            Error::MalformedRecord(_) | Error::NumericParseError { .. } => true,
            Error::Record { source, .. } => source.is_parse_error(),
            _ => false,
        }
    }

    /// Disagreements between the scan output and the reference table.
    pub fn is_mismatch(&self) -> bool {
        match self {
            Error::UnknownSequenceId(_)
            | Error::InvalidStrand { .. }
            | Error::IntervalOutOfBounds { .. } => true,
            Error::Record { source, .. } => source.is_mismatch(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
