use super::initialize_thread_pool;
use crate::cli::CountArgs;
use crate::scan::{
    stream::{aggregate_stream, CountSettings, ErrorPolicy, Progress, StopSignal},
    ScanLayout, SequenceKey,
};
use crate::utils::{create_writer, format_number_with_commas, open_text_reader, Result};
use crate::writers::MatrixWriter;
use std::time;

pub fn count(args: CountArgs) -> Result<()> {
    let start_timer = time::Instant::now();
    let settings = CountSettings {
        layout: ScanLayout::new(args.split_point, args.matrix_suffix.as_str())?,
        threshold: args.conservation_threshold,
        zero_policy: args.zero_policy,
        sequence_key: SequenceKey::new(args.group_by, args.gene_token_index),
        policy: ErrorPolicy {
            on_parse_error: args.on_parse_error,
            ..ErrorPolicy::default()
        },
        batch_size: args.batch_size,
    };

    let mut counts_writer = create_writer(&args.output_prefix, "counts.csv", |path| {
        MatrixWriter::new(path, b',')
    })?;
    let binary_writer = if args.write_binary {
        Some(create_writer(&args.output_prefix, "binary.csv", |path| {
            MatrixWriter::new(path, b',')
        })?)
    } else {
        None
    };

    log::debug!(
        "Initializing thread pool with {} threads...",
        args.num_threads
    );
    let pool = initialize_thread_pool(args.num_threads)?;
    let reader = open_text_reader(&args.input_path)?;

    log::info!(
        "Counting hits with conservation score > {} per {:?} in {}",
        settings.threshold,
        args.group_by,
        args.input_path.display()
    );
    let (matrix, stats) = aggregate_stream(
        reader,
        &settings,
        &pool,
        &Progress::new(args.progress_every, "count"),
        &StopSignal::new(),
    )?;
    stats.log_summary("count");
    log::info!(
        "Matrix: {} element types x {} sequences, {} non-zero entries, {} hits",
        matrix.element_types().len(),
        format_number_with_commas(matrix.sequence_ids().len()),
        format_number_with_commas(matrix.nnz()),
        matrix.total()
    );

    counts_writer.write(&matrix)?;
    if let Some(mut binary_writer) = binary_writer {
        binary_writer.write(&matrix.to_presence())?;
    }

    log::info!("Total execution time: {:.2?}", start_timer.elapsed());
    Ok(())
}
