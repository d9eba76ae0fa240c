//! `tk-tensor` - External-memory tensors for tilekern.
//!
//! This crate provides:
//! - A named `Tensor` type backed by host storage
//! - Shape utilities, including the matrix view transfers address
//! - Element types (F32, F16, BF16) with widening reads and narrowing writes

pub mod dtype;
pub mod error;
pub mod shape;
pub mod storage;
pub mod tensor;

// Re-export primary types at the crate root for convenience.
pub use dtype::DType;
pub use error::{Result, TensorError};
pub use shape::Shape;
pub use storage::CpuStorage;
pub use tensor::Tensor;
