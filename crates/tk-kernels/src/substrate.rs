use std::fmt::Debug;

use tk_tensor::{DType, Shape, Tensor};

use crate::error::Result;
use crate::hardware::HardwareConfig;
use crate::memory::{MemorySpace, Region, Tile};

/// Counters of the work a substrate has been asked to perform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStats {
    /// External-to-scratch transfers issued.
    pub loads: usize,
    /// Scratch-to-external transfers issued.
    pub stores: usize,
    /// Bytes read from external memory, in the tensors' element type.
    pub bytes_loaded: usize,
    /// Bytes written to external memory, in the tensors' element type.
    pub bytes_stored: usize,
    /// Tile-granular multiply-accumulates issued.
    pub matmuls: usize,
}

/// The execution substrate the kernels run on.
///
/// Supplies allocation in every tier of the memory hierarchy, transfers
/// between external memory and scratch, and the hardware's native
/// multiply-accumulate. Operations are issued in program order from a single
/// thread; an implementation may overlap them internally as long as it
/// preserves that order's read-after-write dependencies.
pub trait Substrate: Debug {
    /// Returns the name of this substrate (e.g., "simulated").
    fn name(&self) -> &str;

    /// Native tile sizes and capacities of the target.
    fn hardware(&self) -> &HardwareConfig;

    /// Allocates a zero-filled output tensor in external memory.
    fn alloc_output(&mut self, name: &str, shape: Shape, dtype: DType) -> Result<Tensor>;

    /// Allocates a zero-filled `[partitions, free]` tile in `space`
    /// (scratch or accumulator).
    fn alloc_tile(&mut self, space: MemorySpace, partitions: usize, free: usize) -> Result<Tile>;

    /// Returns a tile's memory to its space. Every allocated tile must be
    /// released exactly once by the iteration that allocated it.
    fn release(&mut self, tile: Tile) -> Result<()>;

    /// Copies `region` of `src`'s matrix view into partitions
    /// `0..region.rows` of `dst`, columns `dst_col..dst_col + region.cols`.
    ///
    /// Partitions at or beyond `region.rows` are not touched, which is how
    /// a clamped region masks the tail of a row group.
    fn load(&mut self, src: &Tensor, region: Region, dst: &mut Tile, dst_col: usize) -> Result<()>;

    /// Copies partitions `0..region.rows`, columns `src_col..src_col +
    /// region.cols` of `src` into `region` of `dst`'s matrix view.
    fn store(&mut self, src: &Tile, src_col: usize, dst: &mut Tensor, region: Region) -> Result<()>;

    /// `acc += stationary[:, s_col..s_col+M]^T · moving[:, m_col..m_col+N]`
    /// where `M x N` is the shape of `acc` and the contraction runs over the
    /// partitions of both operands.
    fn matmul_acc(
        &mut self,
        acc: &mut Tile,
        stationary: &Tile,
        s_col: usize,
        moving: &Tile,
        m_col: usize,
    ) -> Result<()>;

    /// Work issued so far.
    fn stats(&self) -> TransferStats;
}

/// Allocates one `[partitions, free]` tile in `space` per entry of `frees`.
/// If any allocation fails, the tiles already allocated are released first.
pub fn alloc_tiles(
    substrate: &mut dyn Substrate,
    space: MemorySpace,
    partitions: usize,
    frees: impl IntoIterator<Item = usize>,
) -> Result<Vec<Tile>> {
    let mut tiles = Vec::new();
    for free in frees {
        match substrate.alloc_tile(space, partitions, free) {
            Ok(t) => tiles.push(t),
            Err(e) => return release_after(substrate, tiles, Err(e)),
        }
    }
    Ok(tiles)
}

/// Releases `tiles` and then returns `outcome`.
///
/// An error in `outcome` is returned unchanged after the release; a release
/// that fails on that path is logged. With a successful `outcome` the first
/// release failure is returned instead.
pub fn release_after<T>(
    substrate: &mut dyn Substrate,
    tiles: impl IntoIterator<Item = Tile>,
    outcome: Result<T>,
) -> Result<T> {
    let mut release_err = None;
    for t in tiles {
        if let Err(e) = substrate.release(t) {
            release_err.get_or_insert(e);
        }
    }
    match (outcome, release_err) {
        (Ok(v), None) => Ok(v),
        (Ok(_), Some(e)) => Err(e),
        (Err(e), None) => Err(e),
        (Err(e), Some(re)) => {
            log::warn!("{}: release after failed operation also failed: {}", substrate.name(), re);
            Err(e)
        }
    }
}
