use crate::error::Result;
use crate::memory::{MemorySpace, Tile};
use crate::substrate::{alloc_tiles, release_after, Substrate};

use super::plan::MatmulPlan;

/// The persistent scratch region of one N-block,
/// `[num_block_m, tiles_per_block_m, tiles_per_block_n, tile_m, tile_n]`.
///
/// It outlives every K-block iteration of its N-block and is passed to each
/// of them by exclusive reference, so the K-block loop cannot reorder or
/// overlap its read-modify-write of the partial sums.
#[derive(Debug)]
pub struct BlockAccumulator {
    tiles: Vec<Tile>,
    tiles_per_block_m: usize,
    tiles_per_block_n: usize,
}

impl BlockAccumulator {
    /// Allocates every slot zeroed. On failure the slots already allocated
    /// are released before the error is returned.
    pub fn alloc(substrate: &mut dyn Substrate, plan: &MatmulPlan) -> Result<Self> {
        let slots = plan.num_block_m * plan.tiles_per_block_m * plan.tiles_per_block_n;
        let tiles = alloc_tiles(substrate, MemorySpace::Scratch, plan.tile_m, vec![plan.tile_n; slots])?;
        Ok(BlockAccumulator {
            tiles,
            tiles_per_block_m: plan.tiles_per_block_m,
            tiles_per_block_n: plan.tiles_per_block_n,
        })
    }

    fn index(&self, m: usize, bm: usize, bn: usize) -> usize {
        (m * self.tiles_per_block_m + bm) * self.tiles_per_block_n + bn
    }

    pub fn slot(&self, m: usize, bm: usize, bn: usize) -> &Tile {
        &self.tiles[self.index(m, bm, bn)]
    }

    pub fn slot_mut(&mut self, m: usize, bm: usize, bn: usize) -> &mut Tile {
        let i = self.index(m, bm, bn);
        &mut self.tiles[i]
    }

    /// Adds a finished accumulator tile into slot `(m, bm, bn)`.
    pub fn accumulate(&mut self, m: usize, bm: usize, bn: usize, partial: &Tile) -> Result<()> {
        self.slot_mut(m, bm, bn).add_assign(partial)
    }

    pub fn release(self, substrate: &mut dyn Substrate) -> Result<()> {
        self.release_after(substrate, Ok(()))
    }

    /// Releases every slot, then returns `outcome` (see [`crate::substrate::release_after`]).
    pub fn release_after<T>(self, substrate: &mut dyn Substrate, outcome: Result<T>) -> Result<T> {
        release_after(substrate, self.tiles, outcome)
    }
}
