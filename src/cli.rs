use crate::scan::{stream::RecordPolicy, GroupBy, ScanLayout, SequenceKey, ZeroPolicy};
use clap::{ArgAction, ArgGroup, Parser, Subcommand};
use env_logger::fmt::Color;
use log::{Level, LevelFilter};
use once_cell::sync::Lazy;
use std::{
    io::Write,
    path::{Path, PathBuf},
};

pub static FULL_VERSION: Lazy<String> = Lazy::new(|| {
    format!(
        "{}-{}",
        env!("CARGO_PKG_VERSION"),
        option_env!("VERGEN_GIT_DESCRIBE").unwrap_or("unknown")
    )
});

type ArgResult<T> = std::result::Result<T, String>;

#[derive(Parser)]
#[command(name="bindmap",
          version=&**FULL_VERSION,
          about="Binding-element coordinates and conservation-filtered occurrence matrices from 3'UTR motif scans",
          long_about = None,
          disable_help_subcommand = true,
          help_template = "{name} {version}\n{about-section}\n{usage-heading}\n    {usage}\n\n{all-args}{after-help}",
          )]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = ArgAction::Count, help = "Specify multiple times to increase verbosity level (e.g., -vv for more verbosity)")]
    pub verbosity: u8,
}

#[derive(Subcommand)]
pub enum Command {
    #[clap(about = "Rewrite conservation-annotated records as label|score lines")]
    Normalize(NormalizeArgs),
    #[clap(about = "Place motif hits on the genome (BED-like output)")]
    Locate(LocateArgs),
    #[clap(about = "Count conserved motif hits per element type and UTR isoform")]
    Count(CountArgs),
    #[clap(about = "Check a reference interval table")]
    Validate(ValidateArgs),
}

#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("normalize")))]
#[command(arg_required_else_help(true))]
pub struct NormalizeArgs {
    #[clap(required = true)]
    #[clap(short = 'i')]
    #[clap(long = "input")]
    #[clap(help = "Conservation-annotated scan records (plain or gzipped)")]
    #[clap(value_name = "INPUT")]
    #[arg(value_parser = check_file_exists)]
    pub input_path: PathBuf,

    #[clap(required = true)]
    #[clap(short = 'o')]
    #[clap(long = "output")]
    #[clap(help = "Output path for normalized records (.gz to compress)")]
    #[clap(value_name = "OUTPUT")]
    #[arg(value_parser = check_prefix_path)]
    pub output_path: String,

    #[clap(short = 't')]
    #[clap(long = "threads")]
    #[clap(help = "Number of threads")]
    #[clap(value_name = "THREADS")]
    #[clap(default_value = "1")]
    #[arg(value_parser = positive_usize)]
    pub num_threads: usize,

    #[clap(long = "on-parse-error")]
    #[clap(value_name = "POLICY")]
    #[clap(help = "What to do with malformed records (abort or skip)")]
    #[clap(default_value = "abort")]
    pub on_parse_error: RecordPolicy,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "payload-column")]
    #[clap(value_name = "COLUMN")]
    #[clap(help = "1-based column holding the label|score payload")]
    #[clap(default_value = "4")]
    #[arg(value_parser = column_in_range)]
    pub payload_column: usize,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "trim-label-chars")]
    #[clap(value_name = "N")]
    #[clap(help = "Number of trailing characters removed from each label")]
    #[clap(default_value = "1")]
    pub trim_label_chars: usize,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "progress-every")]
    #[clap(value_name = "LINES")]
    #[clap(help = "Report progress every LINES input lines (0 disables)")]
    #[clap(default_value = "100000")]
    pub progress_every: usize,
}

#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("locate")))]
#[command(arg_required_else_help(true))]
pub struct LocateArgs {
    #[clap(required = true)]
    #[clap(short = 'i')]
    #[clap(long = "input")]
    #[clap(help = "Motif scan output (plain or gzipped)")]
    #[clap(value_name = "SCAN")]
    #[arg(value_parser = check_file_exists)]
    pub input_path: PathBuf,

    #[clap(required = true)]
    #[clap(short = 'r')]
    #[clap(long = "reference")]
    #[clap(help = "Tab-delimited UTR coordinates: chrom, start, end, sequence id")]
    #[clap(value_name = "REFERENCE")]
    #[arg(value_parser = check_file_exists)]
    pub reference_path: PathBuf,

    #[clap(required = true)]
    #[clap(short = 'o')]
    #[clap(long = "output")]
    #[clap(help = "Output BED path (.gz to compress)")]
    #[clap(value_name = "BED")]
    #[arg(value_parser = check_prefix_path)]
    pub output_path: String,

    #[clap(short = 't')]
    #[clap(long = "threads")]
    #[clap(help = "Number of threads")]
    #[clap(value_name = "THREADS")]
    #[clap(default_value = "1")]
    #[arg(value_parser = positive_usize)]
    pub num_threads: usize,

    #[clap(long = "on-parse-error")]
    #[clap(value_name = "POLICY")]
    #[clap(help = "What to do with malformed records (abort or skip)")]
    #[clap(default_value = "abort")]
    pub on_parse_error: RecordPolicy,

    #[clap(long = "on-mismatch")]
    #[clap(value_name = "POLICY")]
    #[clap(help = "What to do with records that disagree with the reference (abort or skip)")]
    #[clap(default_value = "abort")]
    pub on_mismatch: RecordPolicy,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "split-point")]
    #[clap(value_name = "FIELDS")]
    #[clap(help = "Number of trailing comma-separated fields that describe the hit")]
    #[clap(default_value_t = ScanLayout::RAW_SPLIT_POINT)]
    pub split_point: usize,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "strand-token")]
    #[clap(value_name = "INDEX")]
    #[clap(help = "0-based index of the strand among the '_'-separated tokens of the sequence id")]
    #[clap(default_value = "6")]
    pub strand_token_index: usize,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "progress-every")]
    #[clap(value_name = "LINES")]
    #[clap(help = "Report progress every LINES input lines (0 disables)")]
    #[clap(default_value = "100000")]
    pub progress_every: usize,
}

#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("count")))]
#[command(arg_required_else_help(true))]
pub struct CountArgs {
    #[clap(required = true)]
    #[clap(short = 'i')]
    #[clap(long = "input")]
    #[clap(help = "Scan records with conservation scores (plain or gzipped)")]
    #[clap(value_name = "INPUT")]
    #[arg(value_parser = check_file_exists)]
    pub input_path: PathBuf,

    #[clap(required = true)]
    #[clap(short = 'o')]
    #[clap(long = "output-prefix")]
    #[clap(help = "Prefix for output files")]
    #[clap(value_name = "OUTPUT_PREFIX")]
    #[arg(value_parser = check_prefix_path)]
    pub output_prefix: String,

    #[clap(short = 'c')]
    #[clap(long = "conservation-threshold")]
    #[clap(value_name = "SCORE")]
    #[clap(help = "Count hits whose conservation score is strictly above this value")]
    #[clap(default_value = "0.9")]
    #[arg(value_parser = ensure_finite_float)]
    pub conservation_threshold: f64,

    #[clap(short = 't')]
    #[clap(long = "threads")]
    #[clap(help = "Number of threads")]
    #[clap(value_name = "THREADS")]
    #[clap(default_value = "1")]
    #[arg(value_parser = positive_usize)]
    pub num_threads: usize,

    #[clap(long = "binary")]
    #[clap(help = "Also write the presence/absence matrix")]
    pub write_binary: bool,

    #[clap(long = "on-parse-error")]
    #[clap(value_name = "POLICY")]
    #[clap(help = "What to do with malformed records (abort or skip)")]
    #[clap(default_value = "abort")]
    pub on_parse_error: RecordPolicy,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "split-point")]
    #[clap(value_name = "FIELDS")]
    #[clap(help = "Number of trailing comma-separated fields that describe the hit")]
    #[clap(default_value_t = ScanLayout::SCORED_SPLIT_POINT)]
    pub split_point: usize,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "matrix-suffix")]
    #[clap(value_name = "SUFFIX")]
    #[clap(help = "Suffix stripped from matrix file names to form element type ids")]
    #[clap(default_value = ".pfm")]
    pub matrix_suffix: String,

    #[clap(long = "group-by")]
    #[clap(value_name = "KEY")]
    #[clap(help = "Count per UTR isoform or per gene (isoform or gene)")]
    #[clap(default_value = "isoform")]
    pub group_by: GroupBy,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "gene-token")]
    #[clap(value_name = "INDEX")]
    #[clap(help = "0-based index of the gene among the '_'-separated tokens of the sequence id")]
    #[clap(default_value_t = SequenceKey::DEFAULT_GENE_TOKEN)]
    pub gene_token_index: usize,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "zero-policy")]
    #[clap(value_name = "POLICY")]
    #[clap(help = "Keep explicit zeros for below-threshold hits (implicit or materialize)")]
    #[clap(default_value = "implicit")]
    pub zero_policy: ZeroPolicy,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "batch-size")]
    #[clap(value_name = "LINES")]
    #[clap(help = "Lines handed to a worker at a time")]
    #[clap(default_value = "10000")]
    #[arg(value_parser = positive_usize)]
    pub batch_size: usize,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "progress-every")]
    #[clap(value_name = "LINES")]
    #[clap(help = "Report progress every LINES input lines (0 disables)")]
    #[clap(default_value = "1000000")]
    pub progress_every: usize,
}

#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("validate")))]
#[command(arg_required_else_help(true))]
pub struct ValidateArgs {
    #[clap(required = true)]
    #[clap(short = 'r')]
    #[clap(long = "reference")]
    #[clap(help = "Tab-delimited UTR coordinates: chrom, start, end, sequence id")]
    #[clap(value_name = "REFERENCE")]
    #[arg(value_parser = check_file_exists)]
    pub reference_path: PathBuf,

    #[clap(long = "strand-token")]
    #[clap(value_name = "INDEX")]
    #[clap(help = "Also check that every sequence id carries a strand at this token index")]
    pub strand_token_index: Option<usize>,
}

pub fn init_verbose(args: &Cli) {
    let filter_level: LevelFilter = match args.verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };

    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            let level = record.level();
            let mut style = buf.style();
            match record.level() {
                Level::Error => style.set_color(Color::Red),
                Level::Warn => style.set_color(Color::Yellow),
                Level::Info => style.set_color(Color::Green),
                Level::Debug => style.set_color(Color::Blue),
                Level::Trace => style.set_color(Color::Cyan),
            };

            writeln!(
                buf,
                "{} [{}] - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                style.value(level),
                record.args()
            )
        })
        .filter_level(filter_level)
        .init();
}

fn check_prefix_path(s: &str) -> ArgResult<String> {
    let path = Path::new(s);
    if let Some(parent_dir) = path.parent() {
        if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
            return Err(format!("Path does not exist: {}", parent_dir.display()));
        }
    }
    Ok(s.to_string())
}

fn positive_usize(s: &str) -> ArgResult<usize> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("`{}` is not a valid positive number", s))?;
    if value >= 1 {
        Ok(value)
    } else {
        Err("Value must be at least 1".into())
    }
}

fn column_in_range(s: &str) -> ArgResult<usize> {
    let column = positive_usize(s).map_err(|_| format!("`{}` is not a valid column", s))?;
    Ok(column - 1)
}

fn check_file_exists(s: &str) -> ArgResult<PathBuf> {
    let path = Path::new(s);
    if !path.exists() {
        Err(format!("File does not exist: {}", path.display()))
    } else {
        Ok(path.to_path_buf())
    }
}

fn ensure_finite_float(s: &str) -> ArgResult<f64> {
    let value = s
        .parse::<f64>()
        .map_err(|e| format!("Could not parse float: {}", e))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("The value must be finite, got: {}", value))
    }
}
