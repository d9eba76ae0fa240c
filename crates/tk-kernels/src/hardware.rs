use crate::error::{KernelError, Result};

/// Native tile sizes and on-chip capacities of an accelerator target.
///
/// The defaults describe the 128-partition generation: 128 partitions,
/// a 128-wide stationary operand, a 512-wide moving operand, 192 KiB of
/// scratch and 16 KiB of accumulator memory per partition. A different target
/// overrides individual fields with the `with_*` setters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareConfig {
    /// Number of partitions (lanes) in on-chip memory, `pmax`. This is also
    /// the contraction size of one multiply-accumulate.
    pub partition_count: usize,
    /// Free size of the stationary operand of one multiply-accumulate.
    pub gemm_stationary_fmax: usize,
    /// Free size of the moving operand of one multiply-accumulate.
    pub gemm_moving_fmax: usize,
    /// Largest free size of a single accumulator tile.
    pub psum_fmax: usize,
    /// Scratch capacity of one partition, in bytes.
    pub scratch_bytes_per_partition: usize,
    /// Accumulator capacity of one partition, in bytes.
    pub accumulator_bytes_per_partition: usize,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        HardwareConfig {
            partition_count: 128,
            gemm_stationary_fmax: 128,
            gemm_moving_fmax: 512,
            psum_fmax: 512,
            scratch_bytes_per_partition: 192 * 1024,
            accumulator_bytes_per_partition: 16 * 1024,
        }
    }
}

impl HardwareConfig {
    #[must_use]
    pub fn with_partition_count(mut self, n: usize) -> Self {
        self.partition_count = n;
        self
    }

    #[must_use]
    pub fn with_gemm_stationary_fmax(mut self, n: usize) -> Self {
        self.gemm_stationary_fmax = n;
        self
    }

    #[must_use]
    pub fn with_gemm_moving_fmax(mut self, n: usize) -> Self {
        self.gemm_moving_fmax = n;
        self
    }

    #[must_use]
    pub fn with_psum_fmax(mut self, n: usize) -> Self {
        self.psum_fmax = n;
        self
    }

    #[must_use]
    pub fn with_scratch_bytes_per_partition(mut self, bytes: usize) -> Self {
        self.scratch_bytes_per_partition = bytes;
        self
    }

    #[must_use]
    pub fn with_accumulator_bytes_per_partition(mut self, bytes: usize) -> Self {
        self.accumulator_bytes_per_partition = bytes;
        self
    }

    /// Checks internal consistency.
    ///
    /// The output tile of a multiply-accumulate has `gemm_stationary_fmax`
    /// partitions and `gemm_moving_fmax` free elements, so both must fit the
    /// accumulator geometry.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("partition_count", self.partition_count),
            ("gemm_stationary_fmax", self.gemm_stationary_fmax),
            ("gemm_moving_fmax", self.gemm_moving_fmax),
            ("psum_fmax", self.psum_fmax),
            ("scratch_bytes_per_partition", self.scratch_bytes_per_partition),
            ("accumulator_bytes_per_partition", self.accumulator_bytes_per_partition),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, v)| *v == 0) {
            return Err(KernelError::InvalidConfig(format!("{} must be > 0", name)));
        }
        if self.gemm_stationary_fmax > self.partition_count {
            return Err(KernelError::InvalidConfig(format!(
                "gemm_stationary_fmax={} exceeds partition_count={}",
                self.gemm_stationary_fmax, self.partition_count
            )));
        }
        if self.gemm_moving_fmax > self.psum_fmax {
            return Err(KernelError::InvalidConfig(format!(
                "gemm_moving_fmax={} exceeds psum_fmax={}",
                self.gemm_moving_fmax, self.psum_fmax
            )));
        }
        Ok(())
    }
}
