mod aggregate;
mod mapper;
mod normalize;
mod record;
pub mod stream;

pub use aggregate::{AggregatorState, SparseCountMatrix, StreamingMatrixAggregator, ZeroPolicy};
pub use mapper::{CoordinateMapper, ReferenceIndex, Strand};
pub use normalize::{AnnotatedElement, ScoreAnnotationNormalizer};
pub use record::{GroupBy, ScanLayout, ScanRecord, SequenceKey};
