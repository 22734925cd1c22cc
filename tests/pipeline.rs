use bindmap::scan::{
    stream::{
        aggregate_stream, transform_in_order, CountSettings, ErrorPolicy, Progress, RecordPolicy,
        StopSignal,
    },
    CoordinateMapper, ReferenceIndex, ScanLayout, ScoreAnnotationNormalizer,
};
use bindmap::utils::{open_text_reader, Error};
use bindmap::writers::{LineWriter, MatrixWriter};
use std::io::Cursor;

const REFERENCE: &str = "\
chr1\t100\t200\tENSG01_ENST01_PUM2_1_chr1_100_+\n\
chr2\t1000\t1500\tENSG02_ENST02_QKI_1_chr2_1000_-\n";

const RAW_SCAN: &str = "\
ENSG01_ENST01_PUM2_1_chr1_100_+,PUM2_ENSG00000055917_M001.pfm,10,+,7.25,TGTAA,
ENSG02_ENST02_QKI_1_chr2_1000_-,QKI_ENSG00000112531_M050.pfm,40,+,6.10,ACTAAC,
ENSG01_ENST01_PUM2_1_chr1_100_+,QKI_ENSG00000112531_M050.pfm,50,-,5.00,ACTAA,
";

fn pool() -> rayon::ThreadPool {
    rayon::ThreadPoolBuilder::new()
        .num_threads(2)
        .build()
        .unwrap()
}

fn locate(scan: &str, policy: ErrorPolicy) -> bindmap::utils::Result<String> {
    let index = ReferenceIndex::from_reader(Cursor::new(REFERENCE))?;
    let layout = ScanLayout::raw();
    let mapper = CoordinateMapper::default();
    let mut buffer = Vec::new();
    let mut writer = LineWriter::from_writer(&mut buffer);
    pool().install(|| {
        transform_in_order(
            Cursor::new(scan),
            &mut writer,
            2,
            &policy,
            &Progress::new(0, "locate"),
            &StopSignal::new(),
            |line| mapper.map(&layout.parse(line)?, &index),
        )
    })?;
    writer.finish()?;
    Ok(String::from_utf8(buffer).unwrap())
}

#[test]
fn raw_scan_to_bed_intervals() {
    let bed = locate(RAW_SCAN, ErrorPolicy::default()).unwrap();
    let lines: Vec<&str> = bed.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0],
        "chr1\t110\t115\tENSG01_ENST01_PUM2_1_chr1_100_+,PUM2_ENSG00000055917_M001.pfm,10,+,7.25,TGTAA,"
    );
    assert!(lines[1].starts_with("chr2\t1454\t1460\t"));
    assert!(lines[2].starts_with("chr1\t150\t155\t"));
}

#[test]
fn unknown_sequence_aborts_by_default_and_skips_on_request() {
    let scan = format!("{}tx_missing_a_b_c_d_e_+,M1.pfm,1,+,1.0,AC,\n", RAW_SCAN);

    let err = locate(&scan, ErrorPolicy::default()).unwrap_err();
    assert!(err.is_mismatch());
    let message = err.to_string();
    assert!(message.contains("line 4"));
    assert!(message.contains("tx_missing"));

    let lenient = ErrorPolicy {
        on_mismatch: RecordPolicy::Skip,
        ..ErrorPolicy::default()
    };
    let bed = locate(&scan, lenient).unwrap();
    assert_eq!(bed.lines().count(), 3);
}

#[test]
fn conservation_annotated_bed_to_matrix() {
    // BED-like intervals with the scan line and a conservation score in column 4.
    let annotated = "\
chr1 110 115 ENSG01_ENST01_PUM2_1_chr1_100_+,PUM2_M001.pfm,10,+,7.25,TGTAA,|0.97
chr1\t120\t125\tENSG01_ENST01_PUM2_1_chr1_100_+,PUM2_M001.pfm,20,+,7.00,TGTAA,|0.95
chr2\t1454\t1460\tENSG02_ENST02_QKI_1_chr2_1000_-,QKI_M050.pfm,40,+,6.10,ACTAAC,|0.90
chr1\t150\t155\tENSG01_ENST01_PUM2_1_chr1_100_+,QKI_M050.pfm,50,-,5.00,ACTAA,|0.99
";
    let normalizer = ScoreAnnotationNormalizer::default();
    let mut normalized = Vec::new();
    let mut writer = LineWriter::from_writer(&mut normalized);
    let stats = transform_in_order(
        Cursor::new(annotated),
        &mut writer,
        3,
        &ErrorPolicy::default(),
        &Progress::new(0, "normalize"),
        &StopSignal::new(),
        |line| normalizer.normalize(line),
    )
    .unwrap();
    writer.finish().unwrap();
    assert_eq!(stats.records, 4);

    let normalized = String::from_utf8(normalized).unwrap();
    assert!(normalized
        .lines()
        .all(|line| !line.contains(",|") && line.contains('|')));

    let (matrix, stats) = aggregate_stream(
        Cursor::new(normalized),
        &CountSettings::default(),
        &pool(),
        &Progress::new(0, "count"),
        &StopSignal::new(),
    )
    .unwrap();
    assert_eq!(stats.records, 4);
    assert_eq!(matrix.get("PUM2_M001", "ENSG01_ENST01_PUM2_1_chr1_100_+"), 2);
    assert_eq!(matrix.get("QKI_M050", "ENSG01_ENST01_PUM2_1_chr1_100_+"), 1);
    assert_eq!(matrix.get("QKI_M050", "ENSG02_ENST02_QKI_1_chr2_1000_-"), 0);

    let mut table = Vec::new();
    MatrixWriter::from_writer(&mut table, b',')
        .write(&matrix)
        .unwrap();
    assert_eq!(
        String::from_utf8(table).unwrap(),
        ",PUM2_M001,QKI_M050\nENSG01_ENST01_PUM2_1_chr1_100_+,2,1\n"
    );
}

#[test]
fn gzipped_input_is_read_transparently() {
    use flate2::{write::GzEncoder, Compression};
    use std::io::Write;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scored.tab.gz");
    let mut encoder = GzEncoder::new(
        std::fs::File::create(&path).unwrap(),
        Compression::default(),
    );
    encoder
        .write_all(b"tx1_+,M1.pfm,10,+,7.1,ACGTA|0.95\ntx1_+,M1.pfm,12,+,7.1,ACGTA|0.5\n")
        .unwrap();
    encoder.finish().unwrap();

    let (matrix, _) = aggregate_stream(
        open_text_reader(&path).unwrap(),
        &CountSettings::default(),
        &pool(),
        &Progress::new(0, "count"),
        &StopSignal::new(),
    )
    .unwrap();
    assert_eq!(matrix.get("M1", "tx1_+"), 1);
}

#[test]
fn duplicate_reference_rows_abort() {
    let reference = format!("{}chr1\t100\t300\tENSG01_ENST01_PUM2_1_chr1_100_+\n", REFERENCE);
    let err = ReferenceIndex::from_reader(Cursor::new(reference)).unwrap_err();
    match &err {
        Error::Record { source, line_number, .. } => {
            assert_eq!(*line_number, 3);
            assert!(matches!(**source, Error::DuplicateKey { .. }));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(err
        .to_string()
        .contains("chr1\t100\t300\tENSG01_ENST01_PUM2_1_chr1_100_+"));
}

#[test]
fn gzipped_matrix_output_is_complete() {
    use flate2::read::MultiGzDecoder;
    use std::io::Read;

    let (matrix, _) = aggregate_stream(
        Cursor::new("tx1_+,M1.pfm,10,+,7.1,ACGTA|0.95\n"),
        &CountSettings::default(),
        &pool(),
        &Progress::new(0, "count"),
        &StopSignal::new(),
    )
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.counts.csv.gz");
    let rows = MatrixWriter::new(path.to_str().unwrap(), b',')
        .unwrap()
        .write(&matrix)
        .unwrap();
    assert_eq!(rows, 1);

    let mut text = String::new();
    MultiGzDecoder::new(std::fs::File::open(&path).unwrap())
        .read_to_string(&mut text)
        .unwrap();
    assert_eq!(text, ",M1\ntx1_+,1\n");
}
