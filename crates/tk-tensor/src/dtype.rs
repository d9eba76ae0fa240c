use std::fmt;

/// Floating-point element types a tensor can hold in external memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// 32-bit floating point.
    F32,
    /// 16-bit IEEE 754 half precision (`half::f16`).
    F16,
    /// 16-bit brain floating point (`half::bf16`).
    BF16,
}

impl DType {
    /// Returns the size in bytes of a single element.
    pub fn size_in_bytes(&self) -> usize {
        match self {
            DType::F32 => 4,
            DType::F16 | DType::BF16 => 2,
        }
    }

    /// Relative tolerance appropriate for comparing values of this type.
    pub fn epsilon(&self) -> f32 {
        match self {
            DType::F32 => f32::EPSILON,
            DType::F16 => half::f16::EPSILON.to_f32(),
            DType::BF16 => half::bf16::EPSILON.to_f32(),
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::F32 => write!(f, "f32"),
            DType::F16 => write!(f, "f16"),
            DType::BF16 => write!(f, "bf16"),
        }
    }
}
