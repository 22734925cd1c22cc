use super::{readers::is_gzipped, Error, Result};
use flate2::{write::GzEncoder, Compression};
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

pub fn create_writer<T, F>(output_prefix: &str, output_suffix: &str, f: F) -> Result<T>
where
    F: FnOnce(&str) -> Result<T>,
{
    let output_path = format!("{}.{}", output_prefix, output_suffix);
    f(&output_path)
}

/// Writers that need an explicit last step before they are dropped.
pub trait FinishOutput: Write {
    /// Flushes everything and writes any trailing data, such as the gzip footer.
    fn finish_output(&mut self) -> io::Result<()> {
        self.flush()
    }
}

impl FinishOutput for Vec<u8> {}

impl<W: FinishOutput + ?Sized> FinishOutput for &mut W {
    fn finish_output(&mut self) -> io::Result<()> {
        (**self).finish_output()
    }
}

/// Buffered output file, gzip-compressed when the path ends in `.gz`.
pub enum OutputWriter {
    Plain(BufWriter<File>),
    Gzip(BufWriter<GzEncoder<File>>),
    Finished,
}

impl Write for OutputWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OutputWriter::Plain(writer) => writer.write(buf),
            OutputWriter::Gzip(writer) => writer.write(buf),
            OutputWriter::Finished => Err(io::Error::new(
                io::ErrorKind::Other,
                "write after the output was finished",
            )),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputWriter::Plain(writer) => writer.flush(),
            OutputWriter::Gzip(writer) => writer.flush(),
            OutputWriter::Finished => Ok(()),
        }
    }
}

impl FinishOutput for OutputWriter {
    fn finish_output(&mut self) -> io::Result<()> {
        match std::mem::replace(self, OutputWriter::Finished) {
            OutputWriter::Plain(mut writer) => writer.flush(),
            OutputWriter::Gzip(writer) => {
                let encoder = writer.into_inner().map_err(|e| e.into_error())?;
                encoder.finish()?.flush()
            }
            OutputWriter::Finished => Ok(()),
        }
    }
}

pub fn open_output(path: &str) -> Result<OutputWriter> {
    let file = File::create(path).map_err(|e| {
        Error::Io(io::Error::new(e.kind(), format!("{}: {}", path, e)))
    })?;
    if is_gzipped(Path::new(path)) {
        Ok(OutputWriter::Gzip(BufWriter::new(GzEncoder::new(
            file,
            Compression::default(),
        ))))
    } else {
        Ok(OutputWriter::Plain(BufWriter::new(file)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::MultiGzDecoder;
    use std::io::Read;

    #[test]
    fn gzip_output_is_complete_after_finish() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bed.gz");
        let path_str = path.to_str().unwrap();

        let mut output = open_output(path_str).unwrap();
        assert!(matches!(output, OutputWriter::Gzip(_)));
        output.write_all(b"chr1\t110\t115\n").unwrap();
        output.finish_output().unwrap();
        output.finish_output().unwrap();
        assert!(output.write_all(b"late").is_err());
        drop(output);

        let mut text = String::new();
        MultiGzDecoder::new(File::open(&path).unwrap())
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "chr1\t110\t115\n");
    }

    #[test]
    fn plain_output_for_other_suffixes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bed");
        let mut output = open_output(path.to_str().unwrap()).unwrap();
        assert!(matches!(output, OutputWriter::Plain(_)));
        output.write_all(b"x\n").unwrap();
        output.finish_output().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "x\n");
    }
}
