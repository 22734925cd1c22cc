use crate::utils::{Error, Result};
use std::str::FromStr;

/// Column schema of a motif-scan line.
///
/// Scan lines are comma separated. The last `split_point` fields describe the hit
/// (matrix file, position, strand, score, matched sequence, ...); everything before
/// them is the sequence identifier, which may itself contain commas.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanLayout {
    pub split_point: usize,
    pub matrix_suffix: String,
}

impl ScanLayout {
    /// Raw scanner output ends every line with a trailing comma, hence one extra field.
    pub const RAW_SPLIT_POINT: usize = 6;
    pub const SCORED_SPLIT_POINT: usize = 5;

    pub fn new(split_point: usize, matrix_suffix: impl Into<String>) -> Result<Self> {
        if split_point < 2 {
            return Err(Error::Config(format!(
                "Split point must be at least 2, got {}",
                split_point
            )));
        }
        Ok(Self {
            split_point,
            matrix_suffix: matrix_suffix.into(),
        })
    }

    pub fn raw() -> Self {
        Self {
            split_point: Self::RAW_SPLIT_POINT,
            matrix_suffix: ".pfm".to_string(),
        }
    }

    pub fn scored() -> Self {
        Self {
            split_point: Self::SCORED_SPLIT_POINT,
            matrix_suffix: ".pfm".to_string(),
        }
    }

    pub fn parse<'a>(&self, line: &'a str) -> Result<ScanRecord<'a>> {
        let line = line.trim_end_matches(['\r', '\n']);
        let boundary = line
            .rmatch_indices(',')
            .nth(self.split_point.saturating_sub(1))
            .map(|(idx, _)| idx)
            .ok_or_else(|| {
                Error::MalformedRecord(format!(
                    "Expected more than {} comma-separated fields, found {}",
                    self.split_point,
                    line.matches(',').count() + 1
                ))
            })?;

        let sequence_id = &line[..boundary];
        let payload = &line[boundary + 1..];
        if sequence_id.is_empty() {
            return Err(Error::MalformedRecord("Empty sequence id".to_string()));
        }

        let matrix_token = payload.split(',').next().unwrap_or_default();
        let element_type_id = self.element_type_from_token(matrix_token);
        if element_type_id.is_empty() {
            return Err(Error::MalformedRecord(format!(
                "Could not derive element type from '{}'",
                matrix_token
            )));
        }

        Ok(ScanRecord {
            sequence_id,
            element_type_id,
            payload,
        })
    }

    fn element_type_from_token<'a>(&self, token: &'a str) -> &'a str {
        let file_name = token.trim().rsplit('/').next().unwrap_or_default();
        if self.matrix_suffix.is_empty() {
            return file_name;
        }
        match file_name.find(self.matrix_suffix.as_str()) {
            Some(idx) => &file_name[..idx],
            None => file_name,
        }
    }
}

impl Default for ScanLayout {
    fn default() -> Self {
        Self::scored()
    }
}

/// One motif occurrence, borrowed from its source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanRecord<'a> {
    pub sequence_id: &'a str,
    pub element_type_id: &'a str,
    pub payload: &'a str,
}

impl<'a> ScanRecord<'a> {
    const POSITION_FIELD: usize = 1;
    const SEQUENCE_FIELD: usize = 4;

    fn payload_field(&self, index: usize, name: &str) -> Result<&'a str> {
        self.payload.split(',').nth(index).ok_or_else(|| {
            Error::MalformedRecord(format!(
                "Missing {} field (index {}) in '{}'",
                name, index, self.payload
            ))
        })
    }

    /// Offset of the element from the 5' end of the sequence as stored.
    pub fn element_offset(&self) -> Result<u64> {
        let value = self.payload_field(Self::POSITION_FIELD, "position")?;
        value
            .trim()
            .parse()
            .map_err(|_| Error::numeric("element offset", value))
    }

    /// Length of the matched sequence; a trailing `|score` annotation is not counted.
    pub fn element_width(&self) -> Result<u64> {
        let value = self.payload_field(Self::SEQUENCE_FIELD, "matched sequence")?;
        let matched = value.split('|').next().unwrap_or_default().trim();
        Ok(matched.chars().count() as u64)
    }

    /// Conservation score appended after the last `|`.
    pub fn conservation_score(&self) -> Result<f64> {
        let (_, score) = self.payload.rsplit_once('|').ok_or_else(|| {
            Error::MalformedRecord("No '|' separated conservation score".to_string())
        })?;
        score
            .trim()
            .parse()
            .map_err(|_| Error::numeric("conservation score", score))
    }

    pub fn raw(&self) -> String {
        format!("{},{}", self.sequence_id, self.payload)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupBy {
    #[default]
    Isoform,
    Gene,
}

impl FromStr for GroupBy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "isoform" => Ok(GroupBy::Isoform),
            "gene" => Ok(GroupBy::Gene),
            _ => Err(format!("Invalid grouping '{}': must be 'isoform' or 'gene'", s)),
        }
    }
}

/// Key under which a hit is counted.
///
/// `Isoform` uses the full sequence id. `Gene` keeps one `_`-separated token of
/// the first comma field, so that all UTR isoforms of a gene share a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequenceKey {
    #[default]
    Isoform,
    Gene { token_index: usize },
}

impl SequenceKey {
    pub const DEFAULT_GENE_TOKEN: usize = 1;

    pub fn new(group_by: GroupBy, gene_token_index: usize) -> Self {
        match group_by {
            GroupBy::Isoform => SequenceKey::Isoform,
            GroupBy::Gene => SequenceKey::Gene {
                token_index: gene_token_index,
            },
        }
    }

    pub fn project<'a>(&self, sequence_id: &'a str) -> Result<&'a str> {
        match *self {
            SequenceKey::Isoform => Ok(sequence_id),
            SequenceKey::Gene { token_index } => sequence_id
                .split(',')
                .next()
                .and_then(|field| field.split('_').nth(token_index))
                .filter(|token| !token.is_empty())
                .ok_or_else(|| {
                    Error::MalformedRecord(format!(
                        "No gene token at index {} in sequence id '{}'",
                        token_index, sequence_id
                    ))
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &str = "ENSG01_ENST02_1_chr1_100_200_+,utr3,PUM2_ENSG00000055917_M001.pfm,10,+,7.25,TGTAA,";
    const SCORED: &str = "tx1_+,motifs/M001.pfm,10,+,7.25,TGTAA|0.95";

    #[test]
    fn splits_sequence_id_from_payload_raw() {
        let record = ScanLayout::raw().parse(RAW).unwrap();
        assert_eq!(record.sequence_id, "ENSG01_ENST02_1_chr1_100_200_+,utr3");
        assert_eq!(record.element_type_id, "PUM2_ENSG00000055917_M001");
        assert_eq!(record.element_offset().unwrap(), 10);
        assert_eq!(record.element_width().unwrap(), 5);
        assert_eq!(record.raw(), RAW);
    }

    #[test]
    fn scored_layout_reads_conservation() {
        let record = ScanLayout::scored().parse(SCORED).unwrap();
        assert_eq!(record.sequence_id, "tx1_+");
        assert_eq!(record.element_type_id, "M001");
        assert_eq!(record.element_width().unwrap(), 5);
        assert_eq!(record.conservation_score().unwrap(), 0.95);
    }

    #[test]
    fn split_point_is_configurable() {
        let layout = ScanLayout::new(4, ".pfm").unwrap();
        let record = layout.parse("a,b,M1.pfm,3,-,TT|0.1").unwrap();
        assert_eq!(record.sequence_id, "a,b");
        assert_eq!(record.element_type_id, "M1");
    }

    #[test]
    fn too_few_fields_is_malformed() {
        let err = ScanLayout::scored().parse("tx1,M1.pfm,1|0.5").unwrap_err();
        assert!(matches!(err, Error::MalformedRecord(_)));
    }

    #[test]
    fn missing_score_is_malformed() {
        let record = ScanLayout::scored()
            .parse("tx1,M1.pfm,10,+,7.2,ACGT")
            .unwrap();
        assert!(matches!(
            record.conservation_score(),
            Err(Error::MalformedRecord(_))
        ));
    }

    #[test]
    fn bad_numbers_are_numeric_errors() {
        let record = ScanLayout::scored()
            .parse("tx1,M1.pfm,ten,+,7.2,ACGT|high")
            .unwrap();
        assert!(matches!(
            record.element_offset(),
            Err(Error::NumericParseError { .. })
        ));
        assert!(matches!(
            record.conservation_score(),
            Err(Error::NumericParseError { .. })
        ));
    }

    #[test]
    fn split_point_below_two_rejected() {
        assert!(ScanLayout::new(1, ".pfm").is_err());
    }

    #[test]
    fn gene_key_projects_first_field_token() {
        let key = SequenceKey::new(GroupBy::Gene, 1);
        assert_eq!(
            key.project("ENSG01_ENST02_1_chr1_100_200_+,utr3").unwrap(),
            "ENST02"
        );
        assert_eq!(SequenceKey::Isoform.project("tx1_+,utr3").unwrap(), "tx1_+,utr3");
        assert!(matches!(
            SequenceKey::Gene { token_index: 4 }.project("a_b,c_d_e_f_g"),
            Err(Error::MalformedRecord(_))
        ));
        assert_eq!("gene".parse::<GroupBy>(), Ok(GroupBy::Gene));
        assert!("transcript".parse::<GroupBy>().is_err());
    }
}
