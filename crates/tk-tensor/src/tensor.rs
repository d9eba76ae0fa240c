use crate::dtype::DType;
use crate::error::{Result, TensorError};
use crate::shape::Shape;
use crate::storage::CpuStorage;

/// A named tensor resident in external memory.
///
/// Holds contiguous, row-major data of a single floating-point dtype. Kernels
/// never index a `Tensor` element by element: they move rows of its matrix
/// view (see [`Shape::matrix_dims`]) in and out of on-chip tiles.
#[derive(Debug, Clone)]
pub struct Tensor {
    name: String,
    storage: CpuStorage,
    shape: Shape,
}

impl Tensor {
    /// Create a new f32 tensor from data and a shape.
    ///
    /// # Panics
    /// Panics if `data.len() != shape.numel()`.
    pub fn new(data: Vec<f32>, shape: Shape) -> Self {
        assert_eq!(
            data.len(),
            shape.numel(),
            "data length {} does not match shape {:?} (numel={})",
            data.len(),
            shape,
            shape.numel()
        );
        Tensor {
            name: String::from("tensor"),
            storage: CpuStorage::F32(data),
            shape,
        }
    }

    /// Create a tensor of `dtype` from f32 values, rounding for narrow types.
    pub fn from_f32(data: &[f32], shape: Shape, dtype: DType) -> Result<Self> {
        if data.len() != shape.numel() {
            return Err(TensorError::LengthMismatch {
                len: data.len(),
                shape: shape.dims().to_vec(),
                numel: shape.numel(),
            });
        }
        Ok(Tensor {
            name: String::from("tensor"),
            storage: CpuStorage::from_f32_slice(dtype, data),
            shape,
        })
    }

    /// Create a zero-filled tensor with the given shape and dtype.
    pub fn zeros(shape: Shape, dtype: DType) -> Self {
        let n = shape.numel();
        Tensor {
            name: String::from("tensor"),
            storage: CpuStorage::zeros(dtype, n),
            shape,
        }
    }

    /// Create a tensor with every element set to `value`.
    pub fn full(shape: Shape, dtype: DType, value: f32) -> Self {
        let data = vec![value; shape.numel()];
        Tensor {
            name: String::from("tensor"),
            storage: CpuStorage::from_f32_slice(dtype, &data),
            shape,
        }
    }

    /// Create an f32 tensor filled with ones.
    pub fn ones(shape: Shape) -> Self {
        Self::full(shape, DType::F32, 1.0)
    }

    /// Returns the tensor renamed to `name`.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The tensor's name, used in diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a reference to the tensor's shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns the tensor's data type.
    pub fn dtype(&self) -> DType {
        self.storage.dtype()
    }

    /// `(rows, cols)` of the matrix view that transfers address.
    pub fn matrix_dims(&self) -> Result<(usize, usize)> {
        self.shape.matrix_dims()
    }

    /// Copies the tensor out as f32 values.
    pub fn to_f32_vec(&self) -> Vec<f32> {
        self.storage.to_f32_vec()
    }

    /// Reads `dst.len()` elements of matrix-view row `row` starting at
    /// column `col`, widening to f32.
    pub fn read_row(&self, row: usize, col: usize, dst: &mut [f32]) -> Result<()> {
        let cols = self.check_span(row, 1, col, dst.len())?;
        self.storage.read_f32(row * cols + col, dst);
        Ok(())
    }

    /// Writes `src` into matrix-view row `row` starting at column `col`,
    /// narrowing to the tensor's dtype.
    pub fn write_row(&mut self, row: usize, col: usize, src: &[f32]) -> Result<()> {
        let cols = self.check_span(row, 1, col, src.len())?;
        self.storage.write_f32(row * cols + col, src);
        Ok(())
    }

    /// Validates that `rows x cols` starting at `(row, col)` lies inside the
    /// matrix view and returns the view's column count.
    pub fn check_span(&self, row: usize, rows: usize, col: usize, cols: usize) -> Result<usize> {
        let (view_rows, view_cols) = self.matrix_dims()?;
        if row + rows > view_rows || col + cols > view_cols {
            return Err(TensorError::RegionOutOfBounds {
                row_start: row,
                row_end: row + rows,
                col_start: col,
                col_end: col + cols,
                rows: view_rows,
                cols: view_cols,
            });
        }
        Ok(view_cols)
    }
}
