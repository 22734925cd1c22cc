use crate::utils::{Error, Result};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedElement {
    pub element_label: String,
    pub conservation_score: f64,
    /// The score as written in the input; output reproduces it unchanged.
    pub score_text: String,
}

impl fmt::Display for AnnotatedElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.element_label, self.score_text)
    }
}

/// Rewrites conservation-annotated scan lines into `label|score` form.
///
/// The payload column holds `<label>|<score>`. The scanner leaves a stray
/// trailing character on the label, so `trim_label_chars` characters are
/// removed from its end.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreAnnotationNormalizer {
    pub payload_column: usize,
    pub trim_label_chars: usize,
}

impl Default for ScoreAnnotationNormalizer {
    fn default() -> Self {
        Self {
            payload_column: 3,
            trim_label_chars: 1,
        }
    }
}

impl ScoreAnnotationNormalizer {
    pub fn new(payload_column: usize, trim_label_chars: usize) -> Self {
        Self {
            payload_column,
            trim_label_chars,
        }
    }

    pub fn normalize(&self, line: &str) -> Result<AnnotatedElement> {
        let columns = split_columns(line.trim_end_matches(['\r', '\n']));
        let payload = columns.get(self.payload_column).ok_or_else(|| {
            Error::MalformedRecord(format!(
                "Expected payload in column {}, found {} columns",
                self.payload_column + 1,
                columns.len()
            ))
        })?;

        let mut parts = payload.split('|');
        let (label, score) = match (parts.next(), parts.next(), parts.next()) {
            (Some(label), Some(score), None) => (label, score),
            _ => {
                return Err(Error::MalformedRecord(format!(
                    "Payload must contain exactly one '|': '{}'",
                    payload
                )))
            }
        };

        let score_text = score.trim();
        let conservation_score = score_text
            .parse::<f64>()
            .map_err(|_| Error::numeric("conservation score", score))?;

        Ok(AnnotatedElement {
            element_label: trim_trailing_chars(label, self.trim_label_chars).to_string(),
            conservation_score,
            score_text: score_text.to_string(),
        })
    }
}

/// Splits on tabs, treating every run of spaces as a single tab.
fn split_columns(line: &str) -> Vec<&str> {
    let bytes = line.as_bytes();
    let mut columns = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\t' => {
                columns.push(&line[start..i]);
                i += 1;
                start = i;
            }
            b' ' => {
                columns.push(&line[start..i]);
                while i < bytes.len() && bytes[i] == b' ' {
                    i += 1;
                }
                start = i;
            }
            _ => i += 1,
        }
    }
    columns.push(&line[start..]);
    columns
}

fn trim_trailing_chars(s: &str, n: usize) -> &str {
    if n == 0 {
        return s;
    }
    match s.char_indices().rev().nth(n - 1) {
        Some((idx, _)) => &s[..idx],
        None => "",
    }
}
