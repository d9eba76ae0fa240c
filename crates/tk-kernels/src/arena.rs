use crate::error::{KernelError, Result};
use crate::memory::MemorySpace;

/// Per-partition byte accounting for one on-chip memory space.
///
/// Every partition holds the same free-axis extent of every tile, so the
/// arena only tracks bytes per partition. Allocation fails once the capacity
/// would be exceeded; release returns the bytes.
#[derive(Debug, Clone)]
pub struct Arena {
    space: MemorySpace,
    capacity: usize,
    in_use: usize,
    high_water: usize,
    live: usize,
}

impl Arena {
    pub fn new(space: MemorySpace, capacity: usize) -> Self {
        Arena {
            space,
            capacity,
            in_use: 0,
            high_water: 0,
            live: 0,
        }
    }

    /// Bytes per partition currently allocated.
    pub fn in_use(&self) -> usize {
        self.in_use
    }

    /// Largest `in_use` observed since creation or the last `reset_high_water`.
    pub fn high_water(&self) -> usize {
        self.high_water
    }

    /// Number of allocations not yet released.
    pub fn live(&self) -> usize {
        self.live
    }

    pub fn allocate(&mut self, bytes: usize) -> Result<()> {
        let available = self.capacity - self.in_use;
        if bytes > available {
            return Err(KernelError::ScratchExhausted {
                space: self.space,
                requested: bytes,
                available,
            });
        }
        self.in_use += bytes;
        self.live += 1;
        self.high_water = self.high_water.max(self.in_use);
        Ok(())
    }

    pub fn release(&mut self, bytes: usize) -> Result<()> {
        if self.live == 0 || bytes > self.in_use {
            return Err(KernelError::TileShape(format!(
                "release of {} bytes from {} with {} bytes in {} live allocations",
                bytes, self.space, self.in_use, self.live
            )));
        }
        self.in_use -= bytes;
        self.live -= 1;
        Ok(())
    }

    pub fn reset_high_water(&mut self) {
        self.high_water = self.in_use;
    }
}
