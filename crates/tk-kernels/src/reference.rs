//! Straightforward host implementations used to validate kernel output.
//!
//! Both accumulate in `f64`, so they stand in for the exact result when
//! judging the `f32` tile arithmetic of the kernels.

use tk_tensor::TensorError;

use crate::error::Result;

fn check_len(len: usize, dims: &[usize]) -> Result<()> {
    let numel: usize = dims.iter().product();
    if len != numel {
        return Err(TensorError::LengthMismatch {
            len,
            shape: dims.to_vec(),
            numel,
        }
        .into());
    }
    Ok(())
}

/// `lhs_t^T · rhs` with `lhs_t` row-major `[k, m]` and `rhs` row-major
/// `[k, n]`; returns row-major `[m, n]`.
pub fn matmul_reference(lhs_t: &[f32], rhs: &[f32], k: usize, m: usize, n: usize) -> Result<Vec<f32>> {
    check_len(lhs_t.len(), &[k, m])?;
    check_len(rhs.len(), &[k, n])?;

    let mut c = vec![0.0f32; m * n];
    for i in 0..m {
        for j in 0..n {
            let mut sum = 0.0f64;
            for p in 0..k {
                sum += lhs_t[p * m + i] as f64 * rhs[p * n + j] as f64;
            }
            c[i * n + j] = sum as f32;
        }
    }
    Ok(c)
}

/// RMS normalization of every `dim`-sized row of `x`:
///
///   result[i] = x[i] / sqrt(mean(x^2) + eps)
pub fn rmsnorm_reference(x: &[f32], dim: usize, eps: f32) -> Result<Vec<f32>> {
    if dim == 0 || x.len() % dim != 0 {
        return Err(TensorError::Other(format!(
            "rmsnorm_reference: x.len()={} is not a multiple of dim={}",
            x.len(),
            dim
        ))
        .into());
    }

    let mut result = vec![0.0f32; x.len()];
    for (row, out) in x.chunks_exact(dim).zip(result.chunks_exact_mut(dim)) {
        let mean_sq = row.iter().map(|&v| v as f64 * v as f64).sum::<f64>() / dim as f64;
        let inv_rms = 1.0 / (mean_sq + eps as f64).sqrt();
        for (o, &v) in out.iter_mut().zip(row) {
            *o = (v as f64 * inv_rms) as f32;
        }
    }
    Ok(result)
}
