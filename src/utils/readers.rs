use super::{Error, Result};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read as ioRead};
use std::path::Path;

pub(crate) fn is_gzipped(path: &Path) -> bool {
    let path_str = path.to_string_lossy().to_lowercase();
    path_str.ends_with(".gz") || path_str.ends_with(".gzip")
}

pub fn open_text_reader(path: &Path) -> Result<BufReader<Box<dyn ioRead + Send>>> {
    let file = File::open(path).map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {}", path.display(), e),
        ))
    })?;
    if is_gzipped(path) {
        let gz_decoder = MultiGzDecoder::new(file);
        if gz_decoder.header().is_some() {
            Ok(BufReader::new(Box::new(gz_decoder)))
        } else {
            Err(Error::Config(format!(
                "Invalid gzip header: {}",
                path.to_string_lossy()
            )))
        }
    } else {
        Ok(BufReader::new(Box::new(file)))
    }
}

/// One input line with its terminator removed.
///
/// Lines that are not valid UTF-8 are kept as a lossy copy so that the caller can
/// report them and decide whether to skip them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputLine {
    Text(String),
    Undecodable(String),
}

impl InputLine {
    fn from_bytes(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(text) => InputLine::Text(text),
            Err(e) => InputLine::Undecodable(String::from_utf8_lossy(e.as_bytes()).into_owned()),
        }
    }

    pub fn decoded(&self) -> Result<&str> {
        match self {
            InputLine::Text(text) => Ok(text.as_str()),
            InputLine::Undecodable(_) => Err(Error::MalformedRecord(
                "Line is not valid UTF-8".to_string(),
            )),
        }
    }

    /// The line as text; invalid bytes are replaced in undecodable lines.
    pub fn lossy(&self) -> &str {
        match self {
            InputLine::Text(text) | InputLine::Undecodable(text) => text.as_str(),
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, InputLine::Text(text) if text.trim().is_empty())
    }
}

/// Iterator over the lines of a reader that does not stop at invalid UTF-8.
pub struct DecodedLines<R> {
    reader: R,
    buffer: Vec<u8>,
}

pub fn decoded_lines<R: BufRead>(reader: R) -> DecodedLines<R> {
    DecodedLines {
        reader,
        buffer: Vec::new(),
    }
}

impl<R: BufRead> Iterator for DecodedLines<R> {
    type Item = std::io::Result<InputLine>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buffer.clear();
        match self.reader.read_until(b'\n', &mut self.buffer) {
            Ok(0) => None,
            Ok(_) => {
                if self.buffer.last() == Some(&b'\n') {
                    self.buffer.pop();
                    if self.buffer.last() == Some(&b'\r') {
                        self.buffer.pop();
                    }
                }
                Some(Ok(InputLine::from_bytes(std::mem::take(&mut self.buffer))))
            }
            Err(e) => Some(Err(e)),
        }
    }
}
