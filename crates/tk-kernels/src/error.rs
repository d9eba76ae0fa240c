use thiserror::Error;

use crate::memory::MemorySpace;

/// Matrix axis named in block-alignment errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    M,
    N,
    K,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::M => write!(f, "M"),
            Axis::N => write!(f, "N"),
            Axis::K => write!(f, "K"),
        }
    }
}

#[derive(Error, Debug)]
pub enum KernelError {
    #[error("contraction dimension mismatch: lhsT has K={lhs_k}, rhs has K={rhs_k}")]
    ContractionMismatch { lhs_k: usize, rhs_k: usize },
    #[error("{name} must have rank {expected}, got shape {got:?}")]
    RankMismatch {
        name: String,
        expected: usize,
        got: Vec<usize>,
    },
    #[error("dtype mismatch: lhsT is {lhs}, rhs is {rhs}")]
    DTypeMismatch { lhs: String, rhs: String },
    #[error("{axis}={dim} is not a multiple of its block size {block}")]
    NotBlockAligned { axis: Axis, dim: usize, block: usize },
    #[error("feature dimension {dim} does not fit a single on-chip tile (max {max})")]
    FeatureDimTooLarge { dim: usize, max: usize },
    #[error("{space} exhausted: requested {requested} bytes per partition, {available} available")]
    ScratchExhausted {
        space: MemorySpace,
        requested: usize,
        available: usize,
    },
    #[error("plan needs {required} bytes per partition of {space}, only {available} fit")]
    PlanExceedsCapacity {
        space: MemorySpace,
        required: usize,
        available: usize,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("transfer out of bounds: {0}")]
    OutOfBounds(String),
    #[error("tile shape error: {0}")]
    TileShape(String),
    #[error("tensor error: {0}")]
    Tensor(#[from] tk_tensor::TensorError),
}

impl KernelError {
    /// True for errors detected while validating shapes and configuration,
    /// before any transfer was issued. Everything else was reported by the
    /// substrate mid-execution.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            KernelError::ContractionMismatch { .. }
                | KernelError::RankMismatch { .. }
                | KernelError::DTypeMismatch { .. }
                | KernelError::NotBlockAligned { .. }
                | KernelError::FeatureDimTooLarge { .. }
                | KernelError::PlanExceedsCapacity { .. }
                | KernelError::InvalidConfig(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, KernelError>;
