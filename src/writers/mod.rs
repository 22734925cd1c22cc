mod lines;
mod matrix;

pub use lines::LineWriter;
pub use matrix::MatrixWriter;
