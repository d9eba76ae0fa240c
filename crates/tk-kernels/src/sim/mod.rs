use tk_tensor::{DType, Shape, Tensor};

use crate::arena::Arena;
use crate::error::{KernelError, Result};
use crate::hardware::HardwareConfig;
use crate::memory::{MemorySpace, Region, Tile};
use crate::substrate::{Substrate, TransferStats};

/// In-process substrate backed by host memory.
///
/// Enforces the constraints a real device would: tiles are bounded by the
/// partition count, both on-chip spaces have a fixed per-partition capacity,
/// transfers must stay inside their tensor and tile. Intended as a reference
/// implementation and for validating kernel schedules.
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    hardware: HardwareConfig,
    scratch: Arena,
    accumulator: Arena,
    stats: TransferStats,
}

impl SimulatedDevice {
    pub fn new(hardware: HardwareConfig) -> Result<Self> {
        hardware.validate()?;
        log::debug!(
            "simulated device: pmax={}, tiles {}x{}, scratch {} B/partition, accumulator {} B/partition",
            hardware.partition_count,
            hardware.gemm_stationary_fmax,
            hardware.gemm_moving_fmax,
            hardware.scratch_bytes_per_partition,
            hardware.accumulator_bytes_per_partition,
        );
        Ok(SimulatedDevice {
            scratch: Arena::new(MemorySpace::Scratch, hardware.scratch_bytes_per_partition),
            accumulator: Arena::new(MemorySpace::Accumulator, hardware.accumulator_bytes_per_partition),
            hardware,
            stats: TransferStats::default(),
        })
    }

    pub fn scratch(&self) -> &Arena {
        &self.scratch
    }

    pub fn accumulator(&self) -> &Arena {
        &self.accumulator
    }

    /// Clears the transfer counters and arena high-water marks.
    pub fn reset_stats(&mut self) {
        self.stats = TransferStats::default();
        self.scratch.reset_high_water();
        self.accumulator.reset_high_water();
    }

    fn arena_mut(&mut self, space: MemorySpace) -> Result<&mut Arena> {
        match space {
            MemorySpace::Scratch => Ok(&mut self.scratch),
            MemorySpace::Accumulator => Ok(&mut self.accumulator),
            MemorySpace::External => Err(KernelError::TileShape(
                "tiles cannot live in external memory".to_string(),
            )),
        }
    }

    fn check_transfer(tensor: &Tensor, region: Region, tile: &Tile, tile_col: usize) -> Result<()> {
        if tile.space() != MemorySpace::Scratch {
            return Err(KernelError::TileShape(format!(
                "transfers stage through scratch memory, not {}",
                tile.space()
            )));
        }
        if region.rows > tile.partitions() || tile_col + region.cols > tile.free() {
            return Err(KernelError::OutOfBounds(format!(
                "region {}x{} at tile column {} does not fit tile [{}, {}]",
                region.rows,
                region.cols,
                tile_col,
                tile.partitions(),
                tile.free()
            )));
        }
        tensor
            .check_span(region.row_start, region.rows, region.col_start, region.cols)
            .map_err(|e| KernelError::OutOfBounds(format!("{}: {}", tensor.name(), e)))?;
        Ok(())
    }
}

impl Substrate for SimulatedDevice {
    fn name(&self) -> &str {
        "simulated"
    }

    fn hardware(&self) -> &HardwareConfig {
        &self.hardware
    }

    fn alloc_output(&mut self, name: &str, shape: Shape, dtype: DType) -> Result<Tensor> {
        Ok(Tensor::zeros(shape, dtype).with_name(name))
    }

    fn alloc_tile(&mut self, space: MemorySpace, partitions: usize, free: usize) -> Result<Tile> {
        if partitions == 0 || partitions > self.hardware.partition_count {
            return Err(KernelError::TileShape(format!(
                "{} partitions requested, hardware has {}",
                partitions, self.hardware.partition_count
            )));
        }
        if space == MemorySpace::Accumulator && free > self.hardware.psum_fmax {
            return Err(KernelError::TileShape(format!(
                "accumulator tile free size {} exceeds {}",
                free, self.hardware.psum_fmax
            )));
        }
        let tile = Tile::zeroed(space, partitions, free);
        self.arena_mut(space)?.allocate(tile.bytes_per_partition())?;
        Ok(tile)
    }

    fn release(&mut self, tile: Tile) -> Result<()> {
        let bytes = tile.bytes_per_partition();
        self.arena_mut(tile.space())?.release(bytes)
    }

    fn load(&mut self, src: &Tensor, region: Region, dst: &mut Tile, dst_col: usize) -> Result<()> {
        Self::check_transfer(src, region, dst, dst_col)?;
        for r in 0..region.rows {
            let row = &mut dst.row_mut(r)[dst_col..dst_col + region.cols];
            src.read_row(region.row_start + r, region.col_start, row)?;
        }
        self.stats.loads += 1;
        self.stats.bytes_loaded += region.rows * region.cols * src.dtype().size_in_bytes();
        Ok(())
    }

    fn store(&mut self, src: &Tile, src_col: usize, dst: &mut Tensor, region: Region) -> Result<()> {
        Self::check_transfer(dst, region, src, src_col)?;
        for r in 0..region.rows {
            let row = &src.row(r)[src_col..src_col + region.cols];
            dst.write_row(region.row_start + r, region.col_start, row)?;
        }
        self.stats.stores += 1;
        self.stats.bytes_stored += region.rows * region.cols * dst.dtype().size_in_bytes();
        Ok(())
    }

    fn matmul_acc(
        &mut self,
        acc: &mut Tile,
        stationary: &Tile,
        s_col: usize,
        moving: &Tile,
        m_col: usize,
    ) -> Result<()> {
        if acc.space() != MemorySpace::Accumulator
            || stationary.space() != MemorySpace::Scratch
            || moving.space() != MemorySpace::Scratch
        {
            return Err(KernelError::TileShape(
                "multiply-accumulate reads scratch operands into an accumulator tile".to_string(),
            ));
        }
        let (m, n) = (acc.partitions(), acc.free());
        let k = stationary.partitions();
        if moving.partitions() != k {
            return Err(KernelError::TileShape(format!(
                "contraction mismatch: stationary has {} partitions, moving has {}",
                k,
                moving.partitions()
            )));
        }
        if m > self.hardware.gemm_stationary_fmax || n > self.hardware.gemm_moving_fmax {
            return Err(KernelError::TileShape(format!(
                "output tile [{}, {}] exceeds native [{}, {}]",
                m, n, self.hardware.gemm_stationary_fmax, self.hardware.gemm_moving_fmax
            )));
        }
        if s_col + m > stationary.free() || m_col + n > moving.free() {
            return Err(KernelError::OutOfBounds(format!(
                "operand window overruns: stationary {}+{} of {}, moving {}+{} of {}",
                s_col,
                m,
                stationary.free(),
                m_col,
                n,
                moving.free()
            )));
        }

        for p in 0..k {
            let lhs = &stationary.row(p)[s_col..s_col + m];
            let rhs = &moving.row(p)[m_col..m_col + n];
            for (i, &a) in lhs.iter().enumerate() {
                for (c, &b) in acc.row_mut(i).iter_mut().zip(rhs) {
                    *c += a * b;
                }
            }
        }
        self.stats.matmuls += 1;
        Ok(())
    }

    fn stats(&self) -> TransferStats {
        self.stats
    }
}
