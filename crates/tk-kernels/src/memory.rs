//! On-chip memory objects: tiles and the regions transfers address.

use std::fmt;

use crate::error::{KernelError, Result};

/// Bytes one tile element occupies on chip. Tiles always compute in `f32`.
pub const TILE_ELEM_BYTES: usize = std::mem::size_of::<f32>();

/// The three tiers of the memory hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemorySpace {
    /// Large, slow, off-chip tensor storage.
    External,
    /// Fast on-chip staging memory.
    Scratch,
    /// On-chip memory dedicated to multiply-accumulate results.
    Accumulator,
}

impl fmt::Display for MemorySpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemorySpace::External => write!(f, "external memory"),
            MemorySpace::Scratch => write!(f, "scratch memory"),
            MemorySpace::Accumulator => write!(f, "accumulator memory"),
        }
    }
}

/// A rectangular window `[row_start..+rows, col_start..+cols]` of a tensor's
/// matrix view. Each region is moved by exactly one transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub row_start: usize,
    pub rows: usize,
    pub col_start: usize,
    pub cols: usize,
}

impl Region {
    pub fn new(row_start: usize, rows: usize, col_start: usize, cols: usize) -> Self {
        Region {
            row_start,
            rows,
            col_start,
            cols,
        }
    }

    /// A region whose row count is clamped so it never reaches `row_limit`.
    ///
    /// Used for the trailing row group of a tensor whose row count is not a
    /// multiple of the partition count: the clamped rows are simply not
    /// part of the transfer.
    pub fn masked(row_start: usize, rows: usize, row_limit: usize, col_start: usize, cols: usize) -> Self {
        let valid = rows.min(row_limit.saturating_sub(row_start));
        Region::new(row_start, valid, col_start, cols)
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }
}

/// A `[partitions, free]` buffer resident in scratch or accumulator memory.
///
/// Tiles are created zeroed by a [`Substrate`](crate::Substrate) and must be
/// handed back to it with `release` by the iteration that allocated them.
#[derive(Debug)]
pub struct Tile {
    space: MemorySpace,
    partitions: usize,
    free: usize,
    data: Vec<f32>,
}

impl Tile {
    /// Zero-filled tile. Substrates call this after reserving arena space.
    pub fn zeroed(space: MemorySpace, partitions: usize, free: usize) -> Self {
        Tile {
            space,
            partitions,
            free,
            data: vec![0.0; partitions * free],
        }
    }

    pub fn space(&self) -> MemorySpace {
        self.space
    }

    pub fn partitions(&self) -> usize {
        self.partitions
    }

    pub fn free(&self) -> usize {
        self.free
    }

    /// Bytes this tile occupies in each partition.
    pub fn bytes_per_partition(&self) -> usize {
        self.free * TILE_ELEM_BYTES
    }

    pub fn row(&self, p: usize) -> &[f32] {
        &self.data[p * self.free..(p + 1) * self.free]
    }

    pub fn row_mut(&mut self, p: usize) -> &mut [f32] {
        &mut self.data[p * self.free..(p + 1) * self.free]
    }

    pub fn get(&self, p: usize, f: usize) -> f32 {
        self.data[p * self.free + f]
    }

    /// Copies `cols` columns of every partition of `src`, starting at
    /// `src_col`, into this tile at `dst_col`.
    pub fn copy_columns_from(&mut self, dst_col: usize, src: &Tile, src_col: usize, cols: usize) -> Result<()> {
        if src.partitions != self.partitions {
            return Err(KernelError::TileShape(format!(
                "copy between tiles of {} and {} partitions",
                src.partitions, self.partitions
            )));
        }
        if src_col + cols > src.free || dst_col + cols > self.free {
            return Err(KernelError::TileShape(format!(
                "copy of {} columns from {}/{} into {}/{} overruns a tile",
                cols, src_col, src.free, dst_col, self.free
            )));
        }
        for p in 0..self.partitions {
            self.row_mut(p)[dst_col..dst_col + cols].copy_from_slice(&src.row(p)[src_col..src_col + cols]);
        }
        Ok(())
    }

    /// Element-wise `self += other`.
    pub fn add_assign(&mut self, other: &Tile) -> Result<()> {
        self.check_same_shape(other)?;
        for (d, s) in self.data.iter_mut().zip(&other.data) {
            *d += s;
        }
        Ok(())
    }

    /// Writes the element-wise square of the first `rows` partitions into
    /// `dst`.
    pub fn square_into(&self, dst: &mut Tile, rows: usize) -> Result<()> {
        self.check_same_shape(dst)?;
        self.check_rows(rows)?;
        let n = rows * self.free;
        for (d, s) in dst.data[..n].iter_mut().zip(&self.data[..n]) {
            *d = s * s;
        }
        Ok(())
    }

    /// Sums each of the first `rows` partitions along the free axis into
    /// column 0 of `dst`.
    pub fn reduce_sum_into(&self, dst: &mut Tile, rows: usize) -> Result<()> {
        self.check_rows(rows)?;
        if dst.partitions != self.partitions || dst.free == 0 {
            return Err(KernelError::TileShape(format!(
                "reduction target [{}, {}] does not match {} partitions",
                dst.partitions, dst.free, self.partitions
            )));
        }
        for p in 0..rows {
            dst.row_mut(p)[0] = self.row(p).iter().sum();
        }
        Ok(())
    }

    /// Applies `f` in place to every element of the first `rows` partitions.
    pub fn map_rows(&mut self, rows: usize, f: impl Fn(f32) -> f32) -> Result<()> {
        self.check_rows(rows)?;
        for v in &mut self.data[..rows * self.free] {
            *v = f(*v);
        }
        Ok(())
    }

    /// `dst[p, :] = self[p, :] * factors[p, 0]` for the first `rows`
    /// partitions.
    pub fn scale_rows_into(&self, factors: &Tile, dst: &mut Tile, rows: usize) -> Result<()> {
        self.check_same_shape(dst)?;
        self.check_rows(rows)?;
        if factors.partitions != self.partitions || factors.free == 0 {
            return Err(KernelError::TileShape(format!(
                "row factors [{}, {}] do not match {} partitions",
                factors.partitions, factors.free, self.partitions
            )));
        }
        for p in 0..rows {
            let s = factors.get(p, 0);
            for (d, v) in dst.row_mut(p).iter_mut().zip(self.row(p)) {
                *d = v * s;
            }
        }
        Ok(())
    }

    fn check_same_shape(&self, other: &Tile) -> Result<()> {
        if self.partitions != other.partitions || self.free != other.free {
            return Err(KernelError::TileShape(format!(
                "[{}, {}] vs [{}, {}]",
                self.partitions, self.free, other.partitions, other.free
            )));
        }
        Ok(())
    }

    fn check_rows(&self, rows: usize) -> Result<()> {
        if rows > self.partitions {
            return Err(KernelError::TileShape(format!(
                "{} active rows in a tile of {} partitions",
                rows, self.partitions
            )));
        }
        Ok(())
    }
}
