//! Dense F32 tensor used for model outputs.
//!
//! Provides the [`Tensor`] type the inference collaborator hands back and the
//! embedding reducer consumes. Storage is row-major.

use tracing::trace;

use crate::error::EmbedError;

/// N-dimensional row-major F32 tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    strides: Vec<usize>,
    data: Vec<f32>,
}

/// Compute row-major strides from shape.
/// strides[i] = product of shape[i+1..]
fn compute_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![0usize; shape.len()];
    if shape.is_empty() {
        return strides;
    }
    strides[shape.len() - 1] = 1;
    for i in (0..shape.len() - 1).rev() {
        strides[i] = strides[i + 1] * shape[i + 1];
    }
    strides
}

impl Tensor {
    /// Create a tensor from shape and data.
    ///
    /// # Panics
    /// Panics if `data.len()` does not match the product of `shape`.
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Self {
        let n_elements: usize = shape.iter().product();
        assert_eq!(
            data.len(),
            n_elements,
            "Data length {} does not match shape {:?} (expected {})",
            data.len(),
            shape,
            n_elements
        );
        let strides = compute_strides(&shape);
        trace!(?shape, "Created tensor");
        Self {
            shape,
            strides,
            data,
        }
    }

    /// Fallible form of [`Tensor::new`] for data that comes from outside the crate.
    pub fn try_new(shape: Vec<usize>, data: Vec<f32>) -> Result<Self, EmbedError> {
        let n_elements: usize = shape.iter().product();
        if data.len() != n_elements {
            return Err(EmbedError::ShapeMismatch {
                expected: format!("{} elements for shape {:?}", n_elements, shape),
                actual: vec![data.len()],
            });
        }
        Ok(Self::new(shape, data))
    }

    /// Create a zero-filled tensor.
    pub fn zeros(shape: &[usize]) -> Self {
        let n_elements: usize = shape.iter().product();
        Self::new(shape.to_vec(), vec![0.0f32; n_elements])
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Returns the total number of elements in the tensor.
    pub fn n_elements(&self) -> usize {
        self.data.len()
    }

    pub fn as_f32(&self) -> &[f32] {
        &self.data
    }

    /// Contiguous slice along the last dimension at the given leading indices.
    ///
    /// Returns `None` if `index` does not address exactly one row.
    pub fn row(&self, index: &[usize]) -> Option<&[f32]> {
        if self.shape.is_empty() || index.len() + 1 != self.shape.len() {
            return None;
        }
        let mut offset = 0;
        for (i, &idx) in index.iter().enumerate() {
            if idx >= self.shape[i] {
                return None;
            }
            offset += idx * self.strides[i];
        }
        let width = self.shape[self.shape.len() - 1];
        self.data.get(offset..offset + width)
    }
}
