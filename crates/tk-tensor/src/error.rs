use thiserror::Error;

#[derive(Error, Debug)]
pub enum TensorError {
    #[error("data length {len} does not match shape {shape:?} (numel={numel})")]
    LengthMismatch {
        len: usize,
        shape: Vec<usize>,
        numel: usize,
    },
    #[error("region rows {row_start}..{row_end}, cols {col_start}..{col_end} out of bounds for [{rows}x{cols}] view")]
    RegionOutOfBounds {
        row_start: usize,
        row_end: usize,
        col_start: usize,
        col_end: usize,
        rows: usize,
        cols: usize,
    },
    #[error("tensor of rank 0 has no matrix view")]
    ScalarView,
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, TensorError>;
