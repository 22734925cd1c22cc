use crate::cli::ValidateArgs;
use crate::scan::{CoordinateMapper, ReferenceIndex};
use crate::utils::{open_text_reader, Result};

pub fn validate(args: ValidateArgs) -> Result<()> {
    let index = ReferenceIndex::from_reader(open_text_reader(&args.reference_path)?)?;

    let lengths: Vec<u64> = index.iter().map(|interval| interval.span_len()).collect();
    let stats = calculate_stats(&lengths);
    log::info!(
        "UTR Lengths - Range: [{},{}], Median: {:.2}, Mean: {:.2}, StdDev: {:.2}",
        stats.min,
        stats.max,
        stats.median,
        stats.mean,
        stats.std_dev
    );
    if index.identical_duplicates() > 0 {
        log::warn!(
            "{} identical duplicate rows were collapsed",
            index.identical_duplicates()
        );
    }

    let mut error_count = 0;
    if let Some(strand_token_index) = args.strand_token_index {
        let mapper = CoordinateMapper::new(strand_token_index);
        for interval in index.iter() {
            if let Err(e) = mapper.strand_of(&interval.sequence_id) {
                log::error!("{}", e);
                error_count += 1;
            }
        }
    }

    match error_count {
        0 => log::info!("Validation successful. Intervals={}", index.len()),
        _ => log::info!(
            "Validation failed. Intervals={}, without strand={}",
            index.len(),
            error_count
        ),
    }

    Ok(())
}

fn calculate_stats(data: &[u64]) -> Stats {
    if data.is_empty() {
        return Stats::default();
    }
    let mut sorted = data.to_vec();
    sorted.sort_unstable();
    let len = sorted.len();
    let median = if len % 2 == 0 {
        (sorted[len / 2 - 1] + sorted[len / 2]) as f64 / 2.0
    } else {
        sorted[len / 2] as f64
    };
    let sum: u64 = sorted.iter().sum();
    let mean = sum as f64 / len as f64;
    let std_dev = (sorted
        .iter()
        .map(|&x| (x as f64 - mean).powi(2))
        .sum::<f64>()
        / len as f64)
        .sqrt();
    Stats {
        min: sorted[0],
        max: sorted[len - 1],
        mean,
        median,
        std_dev,
    }
}

#[derive(Debug, Default, PartialEq)]
struct Stats {
    min: u64,
    max: u64,
    mean: f64,
    median: f64,
    std_dev: f64,
}
