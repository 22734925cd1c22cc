use super::initialize_thread_pool;
use crate::cli::LocateArgs;
use crate::scan::{
    stream::{transform_in_order, ErrorPolicy, Progress, StopSignal},
    CoordinateMapper, ReferenceIndex, ScanLayout,
};
use crate::utils::{open_text_reader, Error, Result};
use crate::writers::LineWriter;
use std::time;

const BATCH_SIZE: usize = 10_000;

pub fn locate(args: LocateArgs) -> Result<()> {
    let start_timer = time::Instant::now();
    // Element types are not needed for placement, so no matrix suffix is stripped.
    let layout = ScanLayout::new(args.split_point, "")?;
    let mapper = CoordinateMapper::new(args.strand_token_index);
    let policy = ErrorPolicy {
        on_parse_error: args.on_parse_error,
        on_mismatch: args.on_mismatch,
    };

    let index = ReferenceIndex::from_reader(open_text_reader(&args.reference_path)?)?;
    if index.is_empty() {
        return Err(Error::Config(format!(
            "Reference table {} has no intervals",
            args.reference_path.display()
        )));
    }
    log::info!("Indexed {} reference intervals", index.len());

    let reader = open_text_reader(&args.input_path)?;
    let mut writer = LineWriter::create(&args.output_path)?;
    let pool = initialize_thread_pool(args.num_threads)?;

    let stats = pool.install(|| {
        transform_in_order(
            reader,
            &mut writer,
            BATCH_SIZE,
            &policy,
            &Progress::new(args.progress_every, "locate"),
            &StopSignal::new(),
            |line| {
                let record = layout.parse(line)?;
                mapper.map(&record, &index)
            },
        )
    })?;
    let written = writer.finish()?;

    stats.log_summary("locate");
    log::info!("Wrote {} intervals to {}", written, args.output_path);
    log::info!("Total execution time: {:.2?}", start_timer.elapsed());
    Ok(())
}
