use crate::utils::{Error, Result};
use std::fmt;

/// One row of the reference table: the genomic span of a transcript isoform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceInterval {
    pub chromosome: String,
    pub start: u64,
    pub end: u64,
    pub sequence_id: String,
}

impl ReferenceInterval {
    pub fn new(
        chromosome: impl Into<String>,
        start: u64,
        end: u64,
        sequence_id: impl Into<String>,
    ) -> Result<Self> {
        if start >= end {
            return Err(Error::MalformedRecord(format!(
                "Invalid region: start {} >= end {}",
                start, end
            )));
        }

        Ok(Self {
            chromosome: chromosome.into(),
            start,
            end,
            sequence_id: sequence_id.into(),
        })
    }

    /// Parses `chrom<TAB>start<TAB>end<TAB>sequence_id[<TAB>...]`.
    pub fn from_bed_line(line: &str) -> Result<Self> {
        const MIN_FIELD_COUNT: usize = 4;
        let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('\t').collect();
        if fields.len() < MIN_FIELD_COUNT {
            return Err(Error::MalformedRecord(format!(
                "Expected at least {} tab-separated fields 'chrom start end sequence_id', found {}",
                MIN_FIELD_COUNT,
                fields.len()
            )));
        }

        let start: u64 = fields[1]
            .trim()
            .parse()
            .map_err(|_| Error::numeric("start", fields[1]))?;
        let end: u64 = fields[2]
            .trim()
            .parse()
            .map_err(|_| Error::numeric("end", fields[2]))?;

        Self::new(fields[0], start, end, fields[3])
    }

    pub fn same_span(&self, other: &ReferenceInterval) -> bool {
        self.chromosome == other.chromosome && self.start == other.start && self.end == other.end
    }

    pub fn span_len(&self) -> u64 {
        self.end - self.start
    }
}

/// Zero-based, half-open location of one element occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenomicInterval {
    pub chromosome: String,
    pub start: u64,
    pub end: u64,
    pub record: String,
}

impl fmt::Display for GenomicInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.chromosome, self.start, self.end, self.record
        )
    }
}
