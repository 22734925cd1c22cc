use super::initialize_thread_pool;
use crate::cli::NormalizeArgs;
use crate::scan::{
    stream::{transform_in_order, ErrorPolicy, Progress, StopSignal},
    ScoreAnnotationNormalizer,
};
use crate::utils::{open_text_reader, Result};
use crate::writers::LineWriter;
use std::time;

const BATCH_SIZE: usize = 10_000;

pub fn normalize(args: NormalizeArgs) -> Result<()> {
    let start_timer = time::Instant::now();
    let normalizer = ScoreAnnotationNormalizer::new(args.payload_column, args.trim_label_chars);
    let policy = ErrorPolicy {
        on_parse_error: args.on_parse_error,
        ..ErrorPolicy::default()
    };

    let reader = open_text_reader(&args.input_path)?;
    let mut writer = LineWriter::create(&args.output_path)?;
    let pool = initialize_thread_pool(args.num_threads)?;

    let stats = pool.install(|| {
        transform_in_order(
            reader,
            &mut writer,
            BATCH_SIZE,
            &policy,
            &Progress::new(args.progress_every, "normalize"),
            &StopSignal::new(),
            |line| normalizer.normalize(line),
        )
    })?;
    let written = writer.finish()?;

    stats.log_summary("normalize");
    log::info!("Wrote {} records to {}", written, args.output_path);
    log::info!("Total execution time: {:.2?}", start_timer.elapsed());
    Ok(())
}
