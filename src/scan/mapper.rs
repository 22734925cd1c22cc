use super::ScanRecord;
use crate::utils::{decoded_lines, Error, GenomicInterval, ReferenceInterval, Result};
use std::{collections::HashMap, io::BufRead, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strand {
    Forward,
    Reverse,
}

impl FromStr for Strand {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "+" => Ok(Strand::Forward),
            "-" => Ok(Strand::Reverse),
            _ => Err(()),
        }
    }
}

/// Reference intervals keyed by sequence id.
#[derive(Debug, Default)]
pub struct ReferenceIndex {
    intervals: HashMap<String, ReferenceInterval>,
    identical_duplicates: usize,
}

impl ReferenceIndex {
    pub fn build<I>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = ReferenceInterval>,
    {
        let mut index = Self::default();
        for (i, row) in rows.into_iter().enumerate() {
            index.insert(row, i + 1)?;
        }
        Ok(index)
    }

    /// Reads a tab-delimited `chrom start end sequence_id` table without header.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut index = Self::default();
        for (i, line) in decoded_lines(reader).enumerate() {
            let line_number = i + 1;
            let line = line?;
            if line.is_blank() {
                continue;
            }
            line.decoded()
                .and_then(ReferenceInterval::from_bed_line)
                .and_then(|row| index.insert(row, line_number))
                .map_err(|e| e.at_line(line_number, line.lossy()))?;
        }
        log::debug!(
            "Loaded {} reference intervals ({} identical duplicates)",
            index.len(),
            index.identical_duplicates
        );
        Ok(index)
    }

    fn insert(&mut self, row: ReferenceInterval, line_number: usize) -> Result<()> {
        if let Some(existing) = self.intervals.get(&row.sequence_id) {
            if !existing.same_span(&row) {
                return Err(Error::DuplicateKey {
                    sequence_id: row.sequence_id,
                    line_number,
                });
            }
            self.identical_duplicates += 1;
        }
        self.intervals.insert(row.sequence_id.clone(), row);
        Ok(())
    }

    pub fn get(&self, sequence_id: &str) -> Option<&ReferenceInterval> {
        self.intervals.get(sequence_id)
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn identical_duplicates(&self) -> usize {
        self.identical_duplicates
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReferenceInterval> {
        self.intervals.values()
    }
}

/// Places scan hits on the genome using the reference interval of their sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateMapper {
    /// Index of the strand token among the `_`-separated parts of the last
    /// comma field of the sequence id.
    pub strand_token_index: usize,
}

impl Default for CoordinateMapper {
    fn default() -> Self {
        Self {
            strand_token_index: 6,
        }
    }
}

impl CoordinateMapper {
    pub fn new(strand_token_index: usize) -> Self {
        Self { strand_token_index }
    }

    pub fn strand_of(&self, sequence_id: &str) -> Result<Strand> {
        let token = sequence_id
            .rsplit(',')
            .next()
            .and_then(|field| field.split('_').nth(self.strand_token_index))
            .unwrap_or_default();
        token.parse().map_err(|_| Error::InvalidStrand {
            strand: token.to_string(),
            sequence_id: sequence_id.to_string(),
        })
    }

    pub fn map(&self, record: &ScanRecord, index: &ReferenceIndex) -> Result<GenomicInterval> {
        let reference = index
            .get(record.sequence_id)
            .ok_or_else(|| Error::UnknownSequenceId(record.sequence_id.to_string()))?;
        let strand = self.strand_of(record.sequence_id)?;
        let offset = record.element_offset()? as i128;
        let width = record.element_width()? as i128;

        let (start, end) = match strand {
            Strand::Forward => {
                let start = reference.start as i128 + offset;
                (start, start + width)
            }
            Strand::Reverse => {
                let end = reference.end as i128 - offset;
                (end - width, end)
            }
        };

        if start < reference.start as i128 || end > reference.end as i128 || start > end {
            return Err(Error::IntervalOutOfBounds {
                sequence_id: record.sequence_id.to_string(),
                start,
                end,
                ref_start: reference.start,
                ref_end: reference.end,
            });
        }

        Ok(GenomicInterval {
            chromosome: reference.chromosome.clone(),
            start: start as u64,
            end: end as u64,
            record: record.raw(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::ScanLayout;
    use std::io::Cursor;

    fn index() -> ReferenceIndex {
        ReferenceIndex::build(vec![
            ReferenceInterval::new("chr1", 100, 200, "tx1_+").unwrap(),
            ReferenceInterval::new("chr1", 100, 200, "tx1_-").unwrap(),
        ])
        .unwrap()
    }

    fn map_line(line: &str) -> Result<GenomicInterval> {
        let record = ScanLayout::scored().parse(line)?;
        CoordinateMapper::new(1).map(&record, &index())
    }

    #[test]
    fn forward_strand_offsets_from_start() {
        let interval = map_line("tx1_+,M1.pfm,10,+,7.1,ACGTA|0.9").unwrap();
        assert_eq!(interval.chromosome, "chr1");
        assert_eq!((interval.start, interval.end), (110, 115));
        assert_eq!(interval.start - 100, 10);
        assert_eq!(interval.record, "tx1_+,M1.pfm,10,+,7.1,ACGTA|0.9");
    }

    #[test]
    fn reverse_strand_offsets_from_end() {
        let interval = map_line("tx1_-,M1.pfm,10,+,7.1,ACGTA|0.9").unwrap();
        assert_eq!((interval.start, interval.end), (185, 190));
        assert_eq!(200 - interval.end, 10);
    }

    #[test]
    fn zero_width_element_is_empty_interval() {
        let interval = map_line("tx1_+,M1.pfm,0,+,7.1,|0.9").unwrap();
        assert_eq!((interval.start, interval.end), (100, 100));
    }

    #[test]
    fn unknown_sequence_id_fails() {
        let err = map_line("tx_missing,M1.pfm,10,+,7.1,ACGTA|0.9").unwrap_err();
        assert!(matches!(err, Error::UnknownSequenceId(id) if id == "tx_missing"));
    }

    #[test]
    fn invalid_strand_fails() {
        let index = ReferenceIndex::build(vec![
            ReferenceInterval::new("chr2", 0, 50, "tx2_.").unwrap(),
        ])
        .unwrap();
        let record = ScanLayout::scored()
            .parse("tx2_.,M1.pfm,1,+,7.1,AC|0.9")
            .unwrap();
        let err = CoordinateMapper::new(1).map(&record, &index).unwrap_err();
        assert!(matches!(err, Error::InvalidStrand { strand, .. } if strand == "."));
    }

    #[test]
    fn hit_past_reference_end_is_out_of_bounds() {
        let err = map_line("tx1_+,M1.pfm,98,+,7.1,ACGTA|0.9").unwrap_err();
        assert!(matches!(err, Error::IntervalOutOfBounds { .. }));
        let err = map_line("tx1_-,M1.pfm,150,+,7.1,ACGTA|0.9").unwrap_err();
        assert!(matches!(err, Error::IntervalOutOfBounds { .. }));
    }

    #[test]
    fn default_strand_token_follows_utr_identifier_layout() {
        let mapper = CoordinateMapper::default();
        let strand = mapper
            .strand_of("ENSG01_ENST02_PUM2_3_chr1_100_-_200,utr3_ENSG_A_B_C_D_+_x")
            .unwrap();
        assert_eq!(strand, Strand::Forward);
    }

    #[test]
    fn conflicting_duplicates_rejected() {
        let data = "chr1\t100\t200\ttx1\nchr1\t100\t250\ttx1\n";
        let err = ReferenceIndex::from_reader(Cursor::new(data)).unwrap_err();
        match &err {
            Error::Record { source, .. } => {
                assert!(matches!(**source, Error::DuplicateKey { line_number: 2, .. }))
            }
            other => panic!("unexpected error: {}", other),
        }
        assert!(err.to_string().contains("chr1\t100\t250\ttx1"));
    }

    #[test]
    fn undecodable_reference_row_reports_line() {
        let data: &[u8] = b"chr1\t100\t200\ttx1\nchr1\t5\t9\ttx\xff\n";
        let err = ReferenceIndex::from_reader(Cursor::new(data)).unwrap_err();
        assert!(err.is_parse_error());
        let message = err.to_string();
        assert!(message.contains("line 2"));
        assert!(message.contains("chr1\t5\t9\ttx\u{fffd}"));
    }

    #[test]
    fn identical_duplicates_accepted() {
        let data = "chr1\t100\t200\ttx1\n\nchr1\t100\t200\ttx1\nchr2\t5\t9\ttx2\n";
        let index = ReferenceIndex::from_reader(Cursor::new(data)).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.identical_duplicates(), 1);
        assert_eq!(index.get("tx2").unwrap().chromosome, "chr2");
    }

    #[test]
    fn malformed_reference_row_reports_line() {
        let data = "chr1\t100\t200\ttx1\nchr1\tx\t200\ttx2\n";
        let err = ReferenceIndex::from_reader(Cursor::new(data)).unwrap_err();
        assert!(err.is_parse_error());
        assert!(err.to_string().contains("line 2"));
    }
}
