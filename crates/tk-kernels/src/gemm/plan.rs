use crate::error::{Axis, KernelError, Result};
use crate::hardware::HardwareConfig;
use crate::memory::{MemorySpace, TILE_ELEM_BYTES};

use super::MatmulConfig;

/// Tile and block geometry of one matmul invocation.
///
/// Building a plan is the only place matmul preconditions are checked, and
/// it touches no memory, so a rejected problem never stages anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatmulPlan {
    pub m: usize,
    pub n: usize,
    pub k: usize,
    /// Free size of the stationary (LhsT) tile; partitions of the output tile.
    pub tile_m: usize,
    /// Free size of the moving (Rhs) tile.
    pub tile_n: usize,
    /// Contraction size of one multiply-accumulate (the partition count).
    pub tile_k: usize,
    pub tiles_per_block_m: usize,
    pub tiles_per_block_n: usize,
    pub tiles_per_block_k: usize,
    pub block_m: usize,
    pub block_n: usize,
    pub block_k: usize,
    pub num_block_m: usize,
    pub num_block_n: usize,
    pub num_block_k: usize,
}

impl MatmulPlan {
    pub fn new(hw: &HardwareConfig, config: &MatmulConfig, k: usize, m: usize, n: usize) -> Result<Self> {
        hw.validate()?;
        config.validate()?;

        let tile_m = hw.gemm_stationary_fmax;
        let tile_n = hw.gemm_moving_fmax;
        let tile_k = hw.partition_count;

        let block_m = tile_m * config.tiles_per_block_m;
        let block_n = tile_n * config.tiles_per_block_n;
        let block_k = tile_k * config.tiles_per_block_k;

        for (axis, dim, block) in [(Axis::M, m, block_m), (Axis::N, n, block_n), (Axis::K, k, block_k)] {
            if dim == 0 || dim % block != 0 {
                return Err(KernelError::NotBlockAligned { axis, dim, block });
            }
        }

        let plan = MatmulPlan {
            m,
            n,
            k,
            tile_m,
            tile_n,
            tile_k,
            tiles_per_block_m: config.tiles_per_block_m,
            tiles_per_block_n: config.tiles_per_block_n,
            tiles_per_block_k: config.tiles_per_block_k,
            block_m,
            block_n,
            block_k,
            num_block_m: m / block_m,
            num_block_n: n / block_n,
            num_block_k: k / block_k,
        };

        for (space, required, available) in [
            (MemorySpace::Scratch, plan.scratch_bytes_per_partition(), hw.scratch_bytes_per_partition),
            (
                MemorySpace::Accumulator,
                plan.accumulator_bytes_per_partition(),
                hw.accumulator_bytes_per_partition,
            ),
        ] {
            if required > available {
                return Err(KernelError::PlanExceedsCapacity {
                    space,
                    required,
                    available,
                });
            }
        }
        Ok(plan)
    }

    /// Per-partition bytes of the persistent per-N-block result region
    /// `[num_block_m, tiles_per_block_m, tiles_per_block_n, tile_m, tile_n]`.
    pub fn result_region_bytes(&self) -> usize {
        self.num_block_m * self.tiles_per_block_m * self.tiles_per_block_n * self.tile_n * TILE_ELEM_BYTES
    }

    /// Peak scratch use per partition: the result region, one K-block of Rhs
    /// tiles, one K-block of LhsT tiles and the store staging buffer are live
    /// at the same time.
    pub fn scratch_bytes_per_partition(&self) -> usize {
        let rhs = self.tiles_per_block_k * self.block_n * TILE_ELEM_BYTES;
        let lhs = self.tiles_per_block_k * self.block_m * TILE_ELEM_BYTES;
        let staging = self.block_n * TILE_ELEM_BYTES;
        self.result_region_bytes() + rhs + lhs + staging
    }

    /// One accumulator tile is live at a time.
    pub fn accumulator_bytes_per_partition(&self) -> usize {
        self.tile_n * TILE_ELEM_BYTES
    }

    /// Multiply-accumulates the schedule issues.
    pub fn matmul_count(&self) -> usize {
        (self.m / self.tile_m) * (self.n / self.tile_n) * (self.k / self.tile_k)
    }

    /// Coalesced stores the schedule issues: one per (N-block, M-tile).
    pub fn store_count(&self) -> usize {
        self.num_block_n * (self.m / self.tile_m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_plan_for_reference_problem() {
        let plan = MatmulPlan::new(&HardwareConfig::default(), &MatmulConfig::default(), 1024, 2048, 4096).unwrap();
        assert_eq!((plan.block_m, plan.block_n, plan.block_k), (2048, 1024, 1024));
        assert_eq!((plan.num_block_m, plan.num_block_n, plan.num_block_k), (1, 4, 1));
        // 64 KiB region + 32 KiB rhs + 64 KiB lhsT + 4 KiB staging
        assert_eq!(plan.scratch_bytes_per_partition(), 164 * 1024);
        assert_eq!(plan.accumulator_bytes_per_partition(), 2048);
        assert_eq!(plan.store_count(), 4 * 16);
    }

    #[test]
    fn test_rejects_unaligned_dims() {
        let hw = HardwareConfig::default();
        let cfg = MatmulConfig::default();
        match MatmulPlan::new(&hw, &cfg, 1024, 2048, 4000) {
            Err(KernelError::NotBlockAligned { axis, dim, block }) => {
                assert_eq!(axis, Axis::N);
                assert_eq!(dim, 4000);
                assert_eq!(block, 1024);
            }
            other => panic!("expected NotBlockAligned, got {:?}", other),
        }
        assert!(matches!(
            MatmulPlan::new(&hw, &cfg, 1000, 2048, 4096),
            Err(KernelError::NotBlockAligned { axis: Axis::K, .. })
        ));
        assert!(matches!(
            MatmulPlan::new(&hw, &cfg, 1024, 1024, 4096),
            Err(KernelError::NotBlockAligned { axis: Axis::M, .. })
        ));
        assert!(matches!(
            MatmulPlan::new(&hw, &cfg, 0, 2048, 4096),
            Err(KernelError::NotBlockAligned { axis: Axis::K, .. })
        ));
    }

    #[test]
    fn test_rejects_oversized_result_region() {
        // M=4096 doubles the persistent region to 128 KiB per partition.
        let r = MatmulPlan::new(&HardwareConfig::default(), &MatmulConfig::default(), 1024, 4096, 1024);
        match r {
            Err(e @ KernelError::PlanExceedsCapacity { space: MemorySpace::Scratch, .. }) => {
                assert!(e.is_configuration_error());
            }
            other => panic!("expected PlanExceedsCapacity, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_zero_tiles_per_block() {
        let cfg = MatmulConfig::default().with_tiles_per_block_k(0);
        assert!(matches!(
            MatmulPlan::new(&HardwareConfig::default(), &cfg, 1024, 2048, 1024),
            Err(KernelError::InvalidConfig(_))
        ));
    }
}
