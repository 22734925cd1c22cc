mod error;
mod io_utils;
mod readers;
mod region;
mod util;

pub use error::{Error, Result};
pub use io_utils::{create_writer, open_output, FinishOutput, OutputWriter};
pub use readers::{decoded_lines, open_text_reader, DecodedLines, InputLine};
pub use region::{GenomicInterval, ReferenceInterval};
pub use util::{format_number_with_commas, handle_error_and_exit};
