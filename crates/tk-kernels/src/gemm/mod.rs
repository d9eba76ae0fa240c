//! Blocked and tiled matrix multiplication, `Result[M,N] = LhsT[K,M]^T · Rhs[K,N]`.
//!
//! Loop nest, outer to inner: N-block, K-block, M-block, then the
//! (N-tile, M-tile) pairs of the block and the K-tiles of the K-block. Each
//! N-block owns a persistent [`BlockAccumulator`] in scratch; each K-block
//! adds its partial products into it; once every K-block has been consumed
//! the N-tiles of each M-tile row are coalesced and stored with a single
//! transfer.

mod accumulator;
mod plan;

pub use accumulator::BlockAccumulator;
pub use plan::MatmulPlan;

use tk_tensor::{Shape, Tensor};

use crate::error::{KernelError, Result};
use crate::memory::{MemorySpace, Region, Tile};
use crate::substrate::{alloc_tiles, release_after, Substrate};

/// Blocking meta-parameters: how many native tiles make up one block along
/// each axis.
///
/// The defaults (16, 2, 8) are tuned for the 128-partition generation and
/// mid-sized LLM projections; other targets and regimes should tune them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatmulConfig {
    pub tiles_per_block_m: usize,
    pub tiles_per_block_n: usize,
    pub tiles_per_block_k: usize,
}

impl Default for MatmulConfig {
    fn default() -> Self {
        MatmulConfig {
            tiles_per_block_m: 16,
            tiles_per_block_n: 2,
            tiles_per_block_k: 8,
        }
    }
}

impl MatmulConfig {
    pub fn new(tiles_per_block_m: usize, tiles_per_block_n: usize, tiles_per_block_k: usize) -> Self {
        MatmulConfig {
            tiles_per_block_m,
            tiles_per_block_n,
            tiles_per_block_k,
        }
    }

    #[must_use]
    pub fn with_tiles_per_block_m(mut self, n: usize) -> Self {
        self.tiles_per_block_m = n;
        self
    }

    #[must_use]
    pub fn with_tiles_per_block_n(mut self, n: usize) -> Self {
        self.tiles_per_block_n = n;
        self
    }

    #[must_use]
    pub fn with_tiles_per_block_k(mut self, n: usize) -> Self {
        self.tiles_per_block_k = n;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.tiles_per_block_m == 0 || self.tiles_per_block_n == 0 || self.tiles_per_block_k == 0 {
            return Err(KernelError::InvalidConfig(format!(
                "tiles per block must be > 0, got M={} N={} K={}",
                self.tiles_per_block_m, self.tiles_per_block_n, self.tiles_per_block_k
            )));
        }
        Ok(())
    }
}

/// Computes `lhs_t^T · rhs` for `lhs_t` of shape `[K, M]` and `rhs` of shape
/// `[K, N]`, returning a `[M, N]` tensor of `lhs_t`'s dtype.
///
/// Every precondition (ranks, dtypes, matching K, block alignment of M, N
/// and K, scratch footprint) is checked before the output is allocated or
/// any tile is staged.
pub fn matmul(substrate: &mut dyn Substrate, lhs_t: &Tensor, rhs: &Tensor, config: &MatmulConfig) -> Result<Tensor> {
    let (k, m, n) = check_operands(lhs_t, rhs)?;
    let plan = MatmulPlan::new(substrate.hardware(), config, k, m, n)?;

    log::debug!(
        "matmul on {}: [{}x{}]^T @ [{}x{}], blocks {}x{}x{} (M/N/K), {} B scratch per partition",
        substrate.name(),
        k,
        m,
        k,
        n,
        plan.num_block_m,
        plan.num_block_n,
        plan.num_block_k,
        plan.scratch_bytes_per_partition(),
    );

    let mut result = substrate.alloc_output("result", Shape::new(vec![m, n]), lhs_t.dtype())?;

    for n_blk in 0..plan.num_block_n {
        let mut partials = BlockAccumulator::alloc(substrate, &plan)?;
        let outcome = reduce_n_block(substrate, &plan, lhs_t, rhs, n_blk, &mut partials, &mut result);
        partials.release_after(substrate, outcome)?;
    }

    Ok(result)
}

fn check_operands(lhs_t: &Tensor, rhs: &Tensor) -> Result<(usize, usize, usize)> {
    for t in [lhs_t, rhs] {
        if t.shape().ndim() != 2 {
            return Err(KernelError::RankMismatch {
                name: t.name().to_string(),
                expected: 2,
                got: t.shape().dims().to_vec(),
            });
        }
    }
    if lhs_t.dtype() != rhs.dtype() {
        return Err(KernelError::DTypeMismatch {
            lhs: lhs_t.dtype().to_string(),
            rhs: rhs.dtype().to_string(),
        });
    }

    let (k, m) = (lhs_t.shape().dim(0), lhs_t.shape().dim(1));
    let (k2, n) = (rhs.shape().dim(0), rhs.shape().dim(1));
    if k != k2 {
        return Err(KernelError::ContractionMismatch { lhs_k: k, rhs_k: k2 });
    }
    Ok((k, m, n))
}

/// Accumulates every K-block of N-block `n_blk` into `partials`, then
/// stores the finished block.
fn reduce_n_block(
    substrate: &mut dyn Substrate,
    plan: &MatmulPlan,
    lhs_t: &Tensor,
    rhs: &Tensor,
    n_blk: usize,
    partials: &mut BlockAccumulator,
    result: &mut Tensor,
) -> Result<()> {
    // Sequential: every K-block read-modify-writes the same partials.
    for k_blk in 0..plan.num_block_k {
        log::trace!("matmul: N-block {} K-block {}", n_blk, k_blk);
        accumulate_k_block(substrate, plan, lhs_t, rhs, n_blk, k_blk, partials)?;
    }
    store_n_block(substrate, plan, partials, n_blk, result)
}

/// Stages the K-tiles of K-block `k_blk` of `src`, columns `col..col+width`,
/// as `tiles_per_block_k` tiles of `[tile_k, width]`. One transfer per tile.
fn load_k_block(
    substrate: &mut dyn Substrate,
    plan: &MatmulPlan,
    src: &Tensor,
    k_blk: usize,
    col: usize,
    width: usize,
) -> Result<Vec<Tile>> {
    let mut tiles = alloc_tiles(substrate, MemorySpace::Scratch, plan.tile_k, vec![width; plan.tiles_per_block_k])?;
    let loaded = tiles.iter_mut().enumerate().try_for_each(|(bk, tile)| {
        let row = (plan.tiles_per_block_k * k_blk + bk) * plan.tile_k;
        substrate.load(src, Region::new(row, plan.tile_k, col, width), tile, 0)
    });
    match loaded {
        Ok(()) => Ok(tiles),
        Err(e) => release_after(substrate, tiles, Err(e)),
    }
}

fn accumulate_k_block(
    substrate: &mut dyn Substrate,
    plan: &MatmulPlan,
    lhs_t: &Tensor,
    rhs: &Tensor,
    n_blk: usize,
    k_blk: usize,
    partials: &mut BlockAccumulator,
) -> Result<()> {
    let rhs_tiles = load_k_block(substrate, plan, rhs, k_blk, plan.block_n * n_blk, plan.block_n)?;
    let outcome = (0..plan.num_block_m)
        .try_for_each(|m_blk| multiply_m_block(substrate, plan, lhs_t, &rhs_tiles, k_blk, m_blk, partials));
    release_after(substrate, rhs_tiles, outcome)
}

fn multiply_m_block(
    substrate: &mut dyn Substrate,
    plan: &MatmulPlan,
    lhs_t: &Tensor,
    rhs_tiles: &[Tile],
    k_blk: usize,
    m_blk: usize,
    partials: &mut BlockAccumulator,
) -> Result<()> {
    let lhs_tiles = load_k_block(substrate, plan, lhs_t, k_blk, plan.block_m * m_blk, plan.block_m)?;
    let outcome = multiply_tile_pairs(substrate, plan, &lhs_tiles, rhs_tiles, m_blk, partials);
    release_after(substrate, lhs_tiles, outcome)
}

/// One accumulator tile per (N-tile, M-tile) pair, contracted over the
/// staged K-tiles and added into the matching slot of `partials`.
fn multiply_tile_pairs(
    substrate: &mut dyn Substrate,
    plan: &MatmulPlan,
    lhs_tiles: &[Tile],
    rhs_tiles: &[Tile],
    m_blk: usize,
    partials: &mut BlockAccumulator,
) -> Result<()> {
    for bn in 0..plan.tiles_per_block_n {
        for bm in 0..plan.tiles_per_block_m {
            let mut acc = substrate.alloc_tile(MemorySpace::Accumulator, plan.tile_m, plan.tile_n)?;
            let outcome = lhs_tiles
                .iter()
                .zip(rhs_tiles)
                .try_for_each(|(stationary, moving)| {
                    substrate.matmul_acc(&mut acc, stationary, bm * plan.tile_m, moving, bn * plan.tile_n)
                })
                .and_then(|()| partials.accumulate(m_blk, bm, bn, &acc));
            release_after(substrate, [acc], outcome)?;
        }
    }
    Ok(())
}

/// Coalesces the N-tiles of every M-tile row of the N-block into one staging
/// tile and writes it with a single store.
fn store_n_block(
    substrate: &mut dyn Substrate,
    plan: &MatmulPlan,
    partials: &BlockAccumulator,
    n_blk: usize,
    result: &mut Tensor,
) -> Result<()> {
    for m_blk in 0..plan.num_block_m {
        for bm in 0..plan.tiles_per_block_m {
            let mut staging = substrate.alloc_tile(MemorySpace::Scratch, plan.tile_m, plan.block_n)?;
            let row = (plan.tiles_per_block_m * m_blk + bm) * plan.tile_m;
            let region = Region::new(row, plan.tile_m, plan.block_n * n_blk, plan.block_n);
            let outcome = (0..plan.tiles_per_block_n)
                .try_for_each(|bn| {
                    staging.copy_columns_from(bn * plan.tile_n, partials.slot(m_blk, bm, bn), 0, plan.tile_n)
                })
                .and_then(|()| substrate.store(&staging, 0, result, region));
            release_after(substrate, [staging], outcome)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Axis;
    use crate::hardware::HardwareConfig;
    use crate::reference::matmul_reference;
    use crate::sim::SimulatedDevice;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use tk_tensor::DType;

    /// pmax=4, stationary tile 4, moving tile 8: the full schedule in
    /// miniature.
    fn small_hw() -> HardwareConfig {
        HardwareConfig::default()
            .with_partition_count(4)
            .with_gemm_stationary_fmax(4)
            .with_gemm_moving_fmax(8)
            .with_psum_fmax(8)
            .with_scratch_bytes_per_partition(16 * 1024)
            .with_accumulator_bytes_per_partition(64)
    }

    fn device() -> SimulatedDevice {
        SimulatedDevice::new(small_hw()).unwrap()
    }

    fn random_matrix(rng: &mut StdRng, rows: usize, cols: usize) -> Vec<f32> {
        (0..rows * cols).map(|_| rng.gen_range(-1.0f32..1.0)).collect()
    }

    /// Small integers keep every partial sum exact in f32.
    fn integer_matrix(rng: &mut StdRng, rows: usize, cols: usize) -> Vec<f32> {
        (0..rows * cols).map(|_| rng.gen_range(-3i32..=3) as f32).collect()
    }

    fn operands(lhs: Vec<f32>, rhs: Vec<f32>, k: usize, m: usize, n: usize) -> (Tensor, Tensor) {
        (
            Tensor::new(lhs, Shape::new(vec![k, m])).with_name("lhsT"),
            Tensor::new(rhs, Shape::new(vec![k, n])).with_name("rhs"),
        )
    }

    #[test]
    fn test_all_ones() {
        let mut dev = device();
        let (k, m, n) = (16, 16, 32);
        let lhs_t = Tensor::ones(Shape::new(vec![k, m]));
        let rhs = Tensor::ones(Shape::new(vec![k, n]));
        let out = matmul(&mut dev, &lhs_t, &rhs, &MatmulConfig::new(2, 2, 2)).unwrap();
        assert_eq!(out.shape().dims(), &[m, n]);
        assert!(out.to_f32_vec().iter().all(|&v| v == k as f32));
    }

    #[test]
    fn test_matches_reference() {
        let mut rng = StdRng::seed_from_u64(7);
        let (k, m, n) = (32, 16, 32);
        let lhs = random_matrix(&mut rng, k, m);
        let rhs = random_matrix(&mut rng, k, n);
        let expected = matmul_reference(&lhs, &rhs, k, m, n).unwrap();
        let (lhs_t, rhs) = operands(lhs, rhs, k, m, n);

        let mut dev = device();
        let out = matmul(&mut dev, &lhs_t, &rhs, &MatmulConfig::new(2, 2, 4)).unwrap();
        for (got, want) in out.to_f32_vec().iter().zip(&expected) {
            assert_abs_diff_eq!(*got, *want, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_non_square_asymmetric() {
        // Distinguishes lhsT^T·rhs from lhsT·rhs and from transposed output.
        let mut rng = StdRng::seed_from_u64(11);
        let (k, m, n) = (8, 24, 16);
        let lhs = integer_matrix(&mut rng, k, m);
        let rhs = integer_matrix(&mut rng, k, n);
        let expected = matmul_reference(&lhs, &rhs, k, m, n).unwrap();
        let (lhs_t, rhs) = operands(lhs, rhs, k, m, n);

        let mut dev = device();
        let out = matmul(&mut dev, &lhs_t, &rhs, &MatmulConfig::new(3, 1, 1)).unwrap();
        assert_eq!(out.to_f32_vec(), expected);
    }

    #[test]
    fn test_tiles_per_block_k_is_bit_identical() {
        let mut rng = StdRng::seed_from_u64(3);
        let (k, m, n) = (64, 8, 16);
        let lhs = integer_matrix(&mut rng, k, m);
        let rhs = integer_matrix(&mut rng, k, n);
        let (lhs_t, rhs) = operands(lhs, rhs, k, m, n);

        let mut dev = device();
        let four = matmul(&mut dev, &lhs_t, &rhs, &MatmulConfig::new(2, 2, 4)).unwrap();
        let eight = matmul(&mut dev, &lhs_t, &rhs, &MatmulConfig::new(2, 2, 8)).unwrap();
        assert_eq!(four.to_f32_vec(), eight.to_f32_vec());
    }

    #[test]
    fn test_block_sizes_do_not_change_result() {
        let mut rng = StdRng::seed_from_u64(5);
        let (k, m, n) = (16, 16, 32);
        let lhs = random_matrix(&mut rng, k, m);
        let rhs = random_matrix(&mut rng, k, n);
        let (lhs_t, rhs) = operands(lhs, rhs, k, m, n);

        let mut dev = device();
        let baseline = matmul(&mut dev, &lhs_t, &rhs, &MatmulConfig::new(1, 1, 1)).unwrap().to_f32_vec();
        for cfg in [
            MatmulConfig::new(2, 2, 2),
            MatmulConfig::new(4, 4, 4),
            MatmulConfig::new(4, 1, 2),
            MatmulConfig::new(1, 2, 4),
        ] {
            let out = matmul(&mut dev, &lhs_t, &rhs, &cfg).unwrap().to_f32_vec();
            for (a, b) in out.iter().zip(&baseline) {
                assert_abs_diff_eq!(*a, *b, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_coalesced_store_and_transfer_counts() {
        let (k, m, n) = (16, 16, 64);
        let cfg = MatmulConfig::new(2, 2, 2);
        let plan = MatmulPlan::new(&small_hw(), &cfg, k, m, n).unwrap();
        let mut dev = device();
        let lhs_t = Tensor::ones(Shape::new(vec![k, m]));
        let rhs = Tensor::ones(Shape::new(vec![k, n]));
        matmul(&mut dev, &lhs_t, &rhs, &cfg).unwrap();

        let stats = dev.stats();
        // One store per (N-block, M-tile), not per N-tile.
        assert_eq!(stats.stores, plan.store_count());
        assert_eq!(stats.stores, 4 * 4);
        assert_eq!(stats.matmuls, plan.matmul_count());
        let k_tiles = plan.num_block_n * plan.num_block_k * plan.tiles_per_block_k;
        assert_eq!(stats.loads, k_tiles + k_tiles * plan.num_block_m);
        assert_eq!(stats.bytes_stored, m * n * 4);
    }

    #[test]
    fn test_releases_all_on_chip_memory() {
        let (k, m, n) = (16, 16, 32);
        let cfg = MatmulConfig::new(2, 2, 2);
        let plan = MatmulPlan::new(&small_hw(), &cfg, k, m, n).unwrap();
        let mut dev = device();
        let lhs_t = Tensor::ones(Shape::new(vec![k, m]));
        let rhs = Tensor::ones(Shape::new(vec![k, n]));
        matmul(&mut dev, &lhs_t, &rhs, &cfg).unwrap();

        assert_eq!(dev.scratch().in_use(), 0);
        assert_eq!(dev.scratch().live(), 0);
        assert_eq!(dev.accumulator().in_use(), 0);
        assert!(dev.scratch().high_water() <= plan.scratch_bytes_per_partition());
        assert_eq!(dev.accumulator().high_water(), plan.accumulator_bytes_per_partition());
    }

    #[test]
    fn test_unaligned_fails_before_staging() {
        let mut dev = device();
        let cfg = MatmulConfig::new(2, 2, 2);
        // block sizes M=8, N=16, K=8
        for (k, m, n, axis) in [(8, 12, 16, Axis::M), (8, 8, 24, Axis::N), (12, 8, 16, Axis::K)] {
            let lhs_t = Tensor::ones(Shape::new(vec![k, m]));
            let rhs = Tensor::ones(Shape::new(vec![k, n]));
            match matmul(&mut dev, &lhs_t, &rhs, &cfg) {
                Err(KernelError::NotBlockAligned { axis: got, .. }) => assert_eq!(got, axis),
                other => panic!("expected NotBlockAligned, got {:?}", other),
            }
        }
        assert_eq!(dev.stats(), Default::default());
        assert_eq!(dev.scratch().high_water(), 0);
    }

    #[test]
    fn test_operand_validation() {
        let mut dev = device();
        let cfg = MatmulConfig::new(1, 1, 1);

        let lhs_t = Tensor::ones(Shape::new(vec![8, 4]));
        let rhs = Tensor::ones(Shape::new(vec![4, 8]));
        assert!(matches!(
            matmul(&mut dev, &lhs_t, &rhs, &cfg),
            Err(KernelError::ContractionMismatch { lhs_k: 8, rhs_k: 4 })
        ));

        let cube = Tensor::ones(Shape::new(vec![4, 4, 8])).with_name("cube");
        match matmul(&mut dev, &lhs_t, &cube, &cfg) {
            Err(KernelError::RankMismatch { name, expected, .. }) => {
                assert_eq!(name, "cube");
                assert_eq!(expected, 2);
            }
            other => panic!("expected RankMismatch, got {:?}", other),
        }

        let narrow = Tensor::full(Shape::new(vec![8, 8]), DType::F16, 1.0);
        let err = matmul(&mut dev, &lhs_t, &narrow, &cfg).unwrap_err();
        assert!(matches!(err, KernelError::DTypeMismatch { .. }));
        assert!(err.is_configuration_error());
        assert_eq!(dev.stats().loads, 0);
    }

    #[test]
    fn test_plan_exceeding_scratch_is_rejected() {
        let hw = small_hw().with_scratch_bytes_per_partition(256);
        let mut dev = SimulatedDevice::new(hw).unwrap();
        let lhs_t = Tensor::ones(Shape::new(vec![16, 16]));
        let rhs = Tensor::ones(Shape::new(vec![16, 32]));
        let r = matmul(&mut dev, &lhs_t, &rhs, &MatmulConfig::new(4, 4, 4));
        assert!(matches!(r, Err(KernelError::PlanExceedsCapacity { .. })));
        assert_eq!(dev.stats().loads, 0);
    }

    #[test]
    fn test_f16_operands() {
        let mut rng = StdRng::seed_from_u64(13);
        let (k, m, n) = (16, 8, 16);
        let lhs = random_matrix(&mut rng, k, m);
        let rhs = random_matrix(&mut rng, k, n);
        let lhs_t = Tensor::from_f32(&lhs, Shape::new(vec![k, m]), DType::F16).unwrap();
        let rhs_t = Tensor::from_f32(&rhs, Shape::new(vec![k, n]), DType::F16).unwrap();
        // Reference on the rounded operands, so only accumulation and the
        // final narrowing differ.
        let expected = matmul_reference(&lhs_t.to_f32_vec(), &rhs_t.to_f32_vec(), k, m, n).unwrap();

        let mut dev = device();
        let out = matmul(&mut dev, &lhs_t, &rhs_t, &MatmulConfig::new(2, 1, 2)).unwrap();
        assert_eq!(out.dtype(), DType::F16);
        // Sums reach |16|, where one f16 ulp is 16 * epsilon.
        let tol = 16.0 * DType::F16.epsilon();
        for (got, want) in out.to_f32_vec().iter().zip(&expected) {
            assert_abs_diff_eq!(*got, *want, epsilon = tol);
        }
    }

    #[test]
    fn test_reference_problem_all_ones() {
        let mut dev = SimulatedDevice::new(HardwareConfig::default()).unwrap();
        let lhs_t = Tensor::ones(Shape::new(vec![1024, 2048]));
        let rhs = Tensor::ones(Shape::new(vec![1024, 4096]));
        let out = matmul(&mut dev, &lhs_t, &rhs, &MatmulConfig::default()).unwrap();
        assert_eq!(out.shape().dims(), &[2048, 4096]);
        assert!(out.to_f32_vec().iter().all(|&v| v == 1024.0));
    }

    #[test]
    fn test_failure_mid_kernel_releases_tiles() {
        let (k, m, n) = (4, 4, 8);
        let cfg = MatmulConfig::new(1, 1, 1);
        let lhs_t = Tensor::ones(Shape::new(vec![k, m]));
        let rhs = Tensor::ones(Shape::new(vec![k, n]));
        let mut dev = device();
        // 72 bytes per partition left: the [4, 8] partials and the Rhs K-tile
        // fit, the [4, 4] LhsT K-tile does not.
        let blocker = dev.alloc_tile(MemorySpace::Scratch, 4, (16 * 1024 - 72) / 4).unwrap();

        let err = matmul(&mut dev, &lhs_t, &rhs, &cfg).unwrap_err();
        match err {
            KernelError::ScratchExhausted {
                space,
                requested,
                available,
            } => {
                assert_eq!(space, MemorySpace::Scratch);
                assert_eq!(requested, 16);
                assert_eq!(available, 8);
            }
            ref other => panic!("expected ScratchExhausted, got {:?}", other),
        }
        assert!(!err.is_configuration_error());
        // The Rhs K-tile was loaded once and nothing was retried.
        let stats = dev.stats();
        assert_eq!(stats.loads, 1);
        assert_eq!(stats.stores, 0);
        assert_eq!(stats.matmuls, 0);
        assert_eq!(dev.scratch().live(), 1);
        assert_eq!(dev.accumulator().live(), 0);

        dev.release(blocker).unwrap();
        assert_eq!(dev.scratch().in_use(), 0);
        assert_eq!(dev.scratch().live(), 0);
        let out = matmul(&mut dev, &lhs_t, &rhs, &cfg).unwrap();
        assert!(out.to_f32_vec().iter().all(|&v| v == k as f32));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_matches_reference_for_any_blocking(
            tpb_m in 1usize..=3,
            tpb_n in 1usize..=2,
            tpb_k in 1usize..=3,
            blocks_m in 1usize..=2,
            blocks_n in 1usize..=2,
            blocks_k in 1usize..=2,
            seed in any::<u64>(),
        ) {
            let hw = small_hw();
            let (m, n, k) = (
                blocks_m * tpb_m * hw.gemm_stationary_fmax,
                blocks_n * tpb_n * hw.gemm_moving_fmax,
                blocks_k * tpb_k * hw.partition_count,
            );
            let mut rng = StdRng::seed_from_u64(seed);
            let lhs = random_matrix(&mut rng, k, m);
            let rhs = random_matrix(&mut rng, k, n);
            let expected = matmul_reference(&lhs, &rhs, k, m, n).unwrap();
            let (lhs_t, rhs) = operands(lhs, rhs, k, m, n);

            let mut dev = SimulatedDevice::new(hw).unwrap();
            let out = matmul(&mut dev, &lhs_t, &rhs, &MatmulConfig::new(tpb_m, tpb_n, tpb_k)).unwrap();
            for (got, want) in out.to_f32_vec().iter().zip(&expected) {
                prop_assert!((got - want).abs() < 1e-4, "got {} want {}", got, want);
            }
            prop_assert_eq!(dev.scratch().live(), 0);
        }
    }
}
