//! `tk-kernels` - Tiled GEMM and RMS normalization for an accelerator with a
//! scratch/accumulator memory hierarchy.
//!
//! This crate provides:
//! - `matmul`: blocked `LhsT^T · Rhs` with a persistent per-N-block
//!   accumulation region and coalesced stores
//! - `rmsnorm`: row-group RMS normalization with clamped trailing groups
//! - A `Substrate` trait for the execution substrate the kernels run on
//! - A reference `SimulatedDevice` substrate with capacity-checked arenas
//! - `HardwareConfig` describing native tile sizes and on-chip capacities
//! - f64 reference implementations for validation

pub mod arena;
pub mod error;
pub mod gemm;
pub mod hardware;
pub mod memory;
pub mod reference;
pub mod rmsnorm;
pub mod sim;
pub mod substrate;

// Re-export primary types at the crate root for convenience.
pub use arena::Arena;
pub use error::{Axis, KernelError, Result};
pub use gemm::{matmul, BlockAccumulator, MatmulConfig, MatmulPlan};
pub use hardware::HardwareConfig;
pub use memory::{MemorySpace, Region, Tile};
pub use rmsnorm::{rmsnorm, RmsNormConfig};
pub use sim::SimulatedDevice;
pub use substrate::{Substrate, TransferStats};
