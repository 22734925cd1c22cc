use super::{ScanLayout, SequenceKey, SparseCountMatrix, StreamingMatrixAggregator, ZeroPolicy};
use crate::utils::{
    decoded_lines, format_number_with_commas, DecodedLines, Error, FinishOutput, InputLine, Result,
};
use crate::writers::LineWriter;
use crossbeam_channel::{bounded, Sender};
use rayon::prelude::*;
use std::{
    fmt::Display,
    io::BufRead,
    str::FromStr,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    thread,
};

const CHANNEL_BUFFER_SIZE: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordPolicy {
    Abort,
    Skip,
}

impl FromStr for RecordPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "abort" => Ok(RecordPolicy::Abort),
            "skip" => Ok(RecordPolicy::Skip),
            _ => Err(format!("Invalid policy '{}': must be 'abort' or 'skip'", s)),
        }
    }
}

/// What to do with a failing record. Both classes abort by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorPolicy {
    pub on_parse_error: RecordPolicy,
    pub on_mismatch: RecordPolicy,
}

impl Default for ErrorPolicy {
    fn default() -> Self {
        Self {
            on_parse_error: RecordPolicy::Abort,
            on_mismatch: RecordPolicy::Abort,
        }
    }
}

impl ErrorPolicy {
    pub fn tolerates(&self, err: &Error) -> bool {
        (err.is_parse_error() && self.on_parse_error == RecordPolicy::Skip)
            || (err.is_mismatch() && self.on_mismatch == RecordPolicy::Skip)
    }
}

/// Cooperative cancellation flag, checked between records.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub records: usize,
    pub skipped: usize,
    pub stopped: bool,
}

impl RunStats {
    pub fn log_summary(&self, what: &str) {
        log::info!(
            "{}: {} records processed, {} skipped",
            what,
            format_number_with_commas(self.records),
            format_number_with_commas(self.skipped)
        );
        if self.stopped {
            log::warn!("{}: stopped before the end of the input", what);
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Progress {
    every: usize,
    label: &'static str,
}

impl Progress {
    pub fn new(every: usize, label: &'static str) -> Self {
        Self { every, label }
    }

    fn advance(&self, before: usize, after: usize) {
        if self.every > 0 && after / self.every > before / self.every {
            log::info!(
                "{}: {} lines read",
                self.label,
                format_number_with_commas(after - after % self.every)
            );
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineBatch {
    /// 1-based line number of `lines[0]`.
    pub first_line_number: usize,
    pub lines: Vec<InputLine>,
}

impl LineBatch {
    fn numbered(&self) -> impl Iterator<Item = (usize, &InputLine)> {
        self.lines
            .iter()
            .enumerate()
            .map(move |(i, line)| (self.first_line_number + i, line))
    }
}

pub struct LineBatches<R> {
    lines: DecodedLines<R>,
    batch_size: usize,
    next_line_number: usize,
}

impl<R: BufRead> LineBatches<R> {
    pub fn new(reader: R, batch_size: usize) -> Self {
        Self {
            lines: decoded_lines(reader),
            batch_size: batch_size.max(1),
            next_line_number: 1,
        }
    }
}

impl<R: BufRead> Iterator for LineBatches<R> {
    type Item = Result<LineBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        let first_line_number = self.next_line_number;
        let mut lines = Vec::with_capacity(self.batch_size);
        while lines.len() < self.batch_size {
            match self.lines.next() {
                Some(Ok(line)) => {
                    lines.push(line);
                    self.next_line_number += 1;
                }
                Some(Err(e)) => {
                    return Some(Err(Error::Io(std::io::Error::new(
                        e.kind(),
                        format!("line {}: {}", self.next_line_number, e),
                    ))))
                }
                None => break,
            }
        }
        if lines.is_empty() {
            None
        } else {
            Some(Ok(LineBatch {
                first_line_number,
                lines,
            }))
        }
    }
}

/// Applies the error policy to one record outcome; `Ok(None)` means skipped.
fn settle<T>(
    outcome: Result<T>,
    line_number: usize,
    line: &str,
    policy: &ErrorPolicy,
) -> Result<Option<T>> {
    match outcome {
        Ok(value) => Ok(Some(value)),
        Err(err) => {
            let err = err.at_line(line_number, line);
            if policy.tolerates(&err) {
                log::debug!("Skipping record: {}", err);
                Ok(None)
            } else {
                Err(err)
            }
        }
    }
}

/// Transforms every line and writes the results in input order.
///
/// Batches are read sequentially; lines of a batch are transformed in parallel
/// on the current rayon pool. Blank lines are ignored.
pub fn transform_in_order<R, W, T, F>(
    reader: R,
    writer: &mut LineWriter<W>,
    batch_size: usize,
    policy: &ErrorPolicy,
    progress: &Progress,
    stop: &StopSignal,
    transform: F,
) -> Result<RunStats>
where
    R: BufRead,
    W: FinishOutput,
    T: Display + Send,
    F: Fn(&str) -> Result<T> + Sync,
{
    let mut stats = RunStats::default();
    let mut lines_read = 0;

    'batches: for batch in LineBatches::new(reader, batch_size) {
        let batch = batch?;
        let outcomes: Vec<Option<Result<T>>> = batch
            .lines
            .par_iter()
            .map(|line| (!line.is_blank()).then(|| line.decoded().and_then(&transform)))
            .collect();

        for ((line_number, line), outcome) in batch.numbered().zip(outcomes) {
            if stop.is_stopped() {
                stats.stopped = true;
                break 'batches;
            }
            let Some(outcome) = outcome else {
                continue;
            };
            stats.records += 1;
            match settle(outcome, line_number, line.lossy(), policy)? {
                Some(value) => writer.write(&value)?,
                None => stats.skipped += 1,
            }
        }

        let before = lines_read;
        lines_read += batch.lines.len();
        progress.advance(before, lines_read);
    }

    Ok(stats)
}

#[derive(Debug, Clone)]
pub struct CountSettings {
    pub layout: ScanLayout,
    pub threshold: f64,
    pub zero_policy: ZeroPolicy,
    pub sequence_key: SequenceKey,
    pub policy: ErrorPolicy,
    pub batch_size: usize,
}

impl Default for CountSettings {
    fn default() -> Self {
        Self {
            layout: ScanLayout::scored(),
            threshold: 0.9,
            zero_policy: ZeroPolicy::Implicit,
            sequence_key: SequenceKey::Isoform,
            policy: ErrorPolicy::default(),
            batch_size: 10_000,
        }
    }
}

pub fn stream_batches_into_channel<R: BufRead>(
    reader: R,
    batch_size: usize,
    sender: Sender<LineBatch>,
    progress: &Progress,
    stop: &StopSignal,
) -> Result<usize> {
    let mut lines_read = 0;
    for batch in LineBatches::new(reader, batch_size) {
        if stop.is_stopped() {
            break;
        }
        let batch = batch?;
        let before = lines_read;
        lines_read += batch.lines.len();
        if sender.send(batch).is_err() {
            log::trace!("Batch receiver closed, stopping reader");
            break;
        }
        progress.advance(before, lines_read);
    }
    Ok(lines_read)
}

fn tally_line(
    aggregator: &mut StreamingMatrixAggregator,
    settings: &CountSettings,
    line: &InputLine,
) -> Result<()> {
    let record = settings.layout.parse(line.decoded()?)?;
    let score = record.conservation_score()?;
    let key = settings.sequence_key.project(record.sequence_id)?;
    aggregator.observe(record.element_type_id, key, score)
}

struct TallyCounters {
    records: AtomicUsize,
    skipped: AtomicUsize,
}

fn tally_batch(
    aggregator: &mut StreamingMatrixAggregator,
    batch: &LineBatch,
    settings: &CountSettings,
    counters: &TallyCounters,
    stop: &StopSignal,
) -> Result<()> {
    let mut records = 0;
    let mut skipped = 0;
    for (line_number, line) in batch.numbered() {
        if stop.is_stopped() {
            break;
        }
        if line.is_blank() {
            continue;
        }
        records += 1;
        let outcome = tally_line(aggregator, settings, line);
        if settle(outcome, line_number, line.lossy(), &settings.policy)?.is_none() {
            skipped += 1;
        }
    }
    counters.records.fetch_add(records, Ordering::Relaxed);
    counters.skipped.fetch_add(skipped, Ordering::Relaxed);
    Ok(())
}

/// Builds the occurrence matrix of a scored scan stream.
///
/// A reader thread feeds line batches through a bounded channel. Each pool
/// worker folds the batches it receives into its own aggregator, and the
/// partial matrices are summed at the end.
pub fn aggregate_stream<R>(
    reader: R,
    settings: &CountSettings,
    pool: &rayon::ThreadPool,
    progress: &Progress,
    stop: &StopSignal,
) -> Result<(SparseCountMatrix, RunStats)>
where
    R: BufRead + Send,
{
    let counters = TallyCounters {
        records: AtomicUsize::new(0),
        skipped: AtomicUsize::new(0),
    };
    let (sender, receiver) = bounded(CHANNEL_BUFFER_SIZE);

    let (matrix, lines_read) = thread::scope(|scope| {
        let reader_thread = scope.spawn(move || {
            stream_batches_into_channel(reader, settings.batch_size, sender, progress, stop)
        });

        let matrix = pool.install(|| {
            receiver
                .into_iter()
                .par_bridge()
                .try_fold(
                    || {
                        StreamingMatrixAggregator::new(settings.threshold)
                            .with_zero_policy(settings.zero_policy)
                    },
                    |mut aggregator, batch| {
                        tally_batch(&mut aggregator, &batch, settings, &counters, stop)?;
                        Ok::<_, Error>(aggregator)
                    },
                )
                .map(|aggregator| aggregator.and_then(|mut a| a.finalize()))
                .try_reduce(SparseCountMatrix::default, |mut acc, partial| {
                    acc.merge(partial);
                    Ok(acc)
                })
        });
        if matrix.is_err() {
            stop.stop();
        }

        let lines_read = reader_thread
            .join()
            .map_err(|_| Error::Config("Reader thread panicked".to_string()));
        (matrix, lines_read)
    });

    let matrix = matrix?;
    let lines_read = lines_read??;
    log::debug!("Read {} lines", format_number_with_commas(lines_read));

    let stats = RunStats {
        records: counters.records.load(Ordering::Relaxed),
        skipped: counters.skipped.load(Ordering::Relaxed),
        stopped: stop.is_stopped(),
    };
    Ok((matrix, stats))
}
