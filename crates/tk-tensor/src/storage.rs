use half::{bf16, f16};

use crate::dtype::DType;

/// Host-side backing store for a tensor in external memory.
///
/// Elements are kept in their declared type. Reads widen to `f32` and writes
/// narrow from `f32`, which is the precision every on-chip tile computes in.
#[derive(Debug, Clone)]
pub enum CpuStorage {
    /// 32-bit floating point storage.
    F32(Vec<f32>),
    /// 16-bit half precision storage.
    F16(Vec<f16>),
    /// 16-bit brain float storage.
    BF16(Vec<bf16>),
}

impl CpuStorage {
    /// Number of elements in this storage.
    pub fn len(&self) -> usize {
        match self {
            CpuStorage::F32(v) => v.len(),
            CpuStorage::F16(v) => v.len(),
            CpuStorage::BF16(v) => v.len(),
        }
    }

    /// Returns true if the storage contains no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Create zero-filled storage for the given dtype and element count.
    pub fn zeros(dtype: DType, n: usize) -> Self {
        match dtype {
            DType::F32 => CpuStorage::F32(vec![0.0; n]),
            DType::F16 => CpuStorage::F16(vec![f16::ZERO; n]),
            DType::BF16 => CpuStorage::BF16(vec![bf16::ZERO; n]),
        }
    }

    /// Create storage of the given dtype from f32 values, rounding to the
    /// nearest representable value for narrow types.
    pub fn from_f32_slice(dtype: DType, data: &[f32]) -> Self {
        match dtype {
            DType::F32 => CpuStorage::F32(data.to_vec()),
            DType::F16 => CpuStorage::F16(data.iter().map(|&v| f16::from_f32(v)).collect()),
            DType::BF16 => CpuStorage::BF16(data.iter().map(|&v| bf16::from_f32(v)).collect()),
        }
    }

    /// Returns the dtype of this storage.
    pub fn dtype(&self) -> DType {
        match self {
            CpuStorage::F32(_) => DType::F32,
            CpuStorage::F16(_) => DType::F16,
            CpuStorage::BF16(_) => DType::BF16,
        }
    }

    /// Widens `dst.len()` elements starting at `offset` into `dst`.
    ///
    /// # Panics
    /// Panics if `offset + dst.len()` exceeds the storage length. Callers
    /// bounds-check regions before reaching this point.
    pub fn read_f32(&self, offset: usize, dst: &mut [f32]) {
        let end = offset + dst.len();
        match self {
            CpuStorage::F32(v) => dst.copy_from_slice(&v[offset..end]),
            CpuStorage::F16(v) => {
                for (d, s) in dst.iter_mut().zip(&v[offset..end]) {
                    *d = s.to_f32();
                }
            }
            CpuStorage::BF16(v) => {
                for (d, s) in dst.iter_mut().zip(&v[offset..end]) {
                    *d = s.to_f32();
                }
            }
        }
    }

    /// Narrows `src` into the storage starting at `offset`.
    ///
    /// # Panics
    /// Panics if `offset + src.len()` exceeds the storage length.
    pub fn write_f32(&mut self, offset: usize, src: &[f32]) {
        let end = offset + src.len();
        match self {
            CpuStorage::F32(v) => v[offset..end].copy_from_slice(src),
            CpuStorage::F16(v) => {
                for (d, &s) in v[offset..end].iter_mut().zip(src) {
                    *d = f16::from_f32(s);
                }
            }
            CpuStorage::BF16(v) => {
                for (d, &s) in v[offset..end].iter_mut().zip(src) {
                    *d = bf16::from_f32(s);
                }
            }
        }
    }

    /// Copies the whole storage out as f32 values.
    pub fn to_f32_vec(&self) -> Vec<f32> {
        let mut out = vec![0.0f32; self.len()];
        self.read_f32(0, &mut out);
        out
    }
}
