//! Row-wise RMS normalization, `Out[b,s,:] = In[b,s,:] * rsqrt(mean(In[b,s,:]^2) + eps)`.
//!
//! The reduction spans the whole feature axis, so a row group of `pmax`
//! sequence positions is staged with its full feature dimension resident and
//! no blocking along features is attempted. Row groups never straddle two
//! batch entries: the last group of each batch entry is clamped to the rows
//! that belong to it.

use tk_tensor::Tensor;

use crate::error::{KernelError, Result};
use crate::hardware::HardwareConfig;
use crate::memory::{MemorySpace, Region, Tile, TILE_ELEM_BYTES};
use crate::substrate::{alloc_tiles, release_after, Substrate};

/// Tiles `[pmax, dim]` live at once: input, squares, output.
const ROW_TILES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RmsNormConfig {
    /// Added to the mean square before the reciprocal square root. The
    /// default of zero is the plain definition; an all-zero row then
    /// normalizes to NaN.
    pub eps: f32,
}

impl RmsNormConfig {
    #[must_use]
    pub fn with_eps(mut self, eps: f32) -> Self {
        self.eps = eps;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.eps.is_finite() || self.eps < 0.0 {
            return Err(KernelError::InvalidConfig(format!(
                "eps must be finite and >= 0, got {}",
                self.eps
            )));
        }
        Ok(())
    }
}

/// Largest feature dimension whose row group fits scratch memory.
pub fn max_feature_dim(hw: &HardwareConfig) -> usize {
    hw.scratch_bytes_per_partition.saturating_sub(TILE_ELEM_BYTES) / (ROW_TILES * TILE_ELEM_BYTES)
}

/// Normalizes every `[dim]` row of a `[batch, seq, dim]` tensor by its root
/// mean square. The output has the input's shape and dtype.
pub fn rmsnorm(substrate: &mut dyn Substrate, hidden: &Tensor, config: &RmsNormConfig) -> Result<Tensor> {
    config.validate()?;
    substrate.hardware().validate()?;
    let dims = hidden.shape().dims();
    let (batch, seq, dim) = match *dims {
        [b, s, d] => (b, s, d),
        _ => {
            return Err(KernelError::RankMismatch {
                name: hidden.name().to_string(),
                expected: 3,
                got: dims.to_vec(),
            })
        }
    };
    if dim == 0 {
        return Err(KernelError::InvalidConfig(format!(
            "{}: feature dimension of {} is empty",
            hidden.name(),
            hidden.shape()
        )));
    }
    let max_dim = max_feature_dim(substrate.hardware());
    if dim > max_dim {
        return Err(KernelError::FeatureDimTooLarge { dim, max: max_dim });
    }
    let pmax = substrate.hardware().partition_count;
    let groups = seq.div_ceil(pmax);

    log::debug!(
        "rmsnorm on {}: {} {}, {} row groups of {} per batch entry",
        substrate.name(),
        hidden.name(),
        hidden.shape(),
        groups,
        pmax,
    );

    let mut out = substrate.alloc_output("out", hidden.shape().clone(), hidden.dtype())?;

    for b in 0..batch {
        let batch_end = (b + 1) * seq;
        for i in 0..groups {
            let region = Region::masked(b * seq + i * pmax, pmax, batch_end, 0, dim);
            log::trace!("rmsnorm: batch {} group {} ({} rows)", b, i, region.rows);
            normalize_group(substrate, hidden, &mut out, region, config.eps)?;
        }
    }

    Ok(out)
}

fn normalize_group(
    substrate: &mut dyn Substrate,
    hidden: &Tensor,
    out: &mut Tensor,
    region: Region,
    eps: f32,
) -> Result<()> {
    let pmax = substrate.hardware().partition_count;
    let dim = region.cols;
    // input, squares, per-row 1/rms, output
    let mut tiles = alloc_tiles(substrate, MemorySpace::Scratch, pmax, [dim, dim, 1, dim])?;
    let outcome = normalize_staged(substrate, hidden, out, region, eps, &mut tiles);
    release_after(substrate, tiles, outcome)
}

fn normalize_staged(
    substrate: &mut dyn Substrate,
    hidden: &Tensor,
    out: &mut Tensor,
    region: Region,
    eps: f32,
    tiles: &mut [Tile],
) -> Result<()> {
    let staged = tiles.len();
    let [x, squares, inv_rms, y] = tiles else {
        return Err(KernelError::TileShape(format!("row group needs 4 tiles, got {}", staged)));
    };
    let (rows, dim) = (region.rows, region.cols);

    substrate.load(hidden, region, x, 0)?;
    x.square_into(squares, rows)?;
    squares.reduce_sum_into(inv_rms, rows)?;
    inv_rms.map_rows(rows, |sum| 1.0 / (sum / dim as f32 + eps).sqrt())?;
    x.scale_rows_into(inv_rms, y, rows)?;
    substrate.store(y, 0, out, region)
}
