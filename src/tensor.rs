// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Read-only multi-dimensional view over a flat `f32` buffer.
//!
//! Network outputs arrive as one contiguous buffer plus a shape. [`TensorView`] gives them
//! `(row, col, channel)` style indexing without copying them into nested arrays. The layout is
//! row-major, so the flat offset of `indices` is the sum over every dimension `d` of
//! `indices[d] * product(shape[d + 1..])`.

use std::fmt;
use std::ops::Index;

use ndarray::{ArrayView, ArrayView3, Dimension};

use crate::error::{PoseError, Result};

/// A borrowed, row-major view of a flat tensor buffer.
#[derive(Clone)]
pub struct TensorView<'a> {
    data: &'a [f32],
    shape: Vec<usize>,
    strides: Vec<usize>,
}

impl<'a> TensorView<'a> {
    /// Wraps `data` as a tensor of the given `shape`.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::ShapeMismatch`] if `data` does not hold exactly
    /// `product(shape)` elements.
    pub fn new(data: &'a [f32], shape: &[usize]) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(PoseError::ShapeMismatch {
                shape: shape.to_vec(),
                len: data.len(),
            });
        }

        let mut strides = vec![0; shape.len()];
        let mut stride = 1;
        for (out, &size) in strides.iter_mut().zip(shape).rev() {
            *out = stride;
            stride *= size;
        }

        Ok(Self {
            data,
            shape: shape.to_vec(),
            strides,
        })
    }

    /// Creates a view over a standard-layout `ndarray` view.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::TensorShape`] if the array is not contiguous in row-major order.
    pub fn from_array<D: Dimension>(array: ArrayView<'a, f32, D>) -> Result<Self> {
        let shape = array.shape().to_vec();
        let data = array.to_slice().ok_or_else(|| {
            PoseError::TensorShape(format!(
                "array of shape {shape:?} is not in standard (row-major) layout"
            ))
        })?;
        Self::new(data, &shape)
    }

    /// Drops a leading batch dimension of size 1, if present.
    #[must_use]
    pub fn squeeze_batch(self) -> Self {
        if self.shape.len() > 1 && self.shape[0] == 1 {
            Self {
                data: self.data,
                shape: self.shape[1..].to_vec(),
                strides: self.strides[1..].to_vec(),
            }
        } else {
            self
        }
    }

    /// Returns the shape of this view.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Returns the number of dimensions.
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Returns the total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the view holds no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the underlying flat buffer.
    pub fn as_slice(&self) -> &'a [f32] {
        self.data
    }

    /// Reads the element at `indices`.
    ///
    /// # Panics
    ///
    /// Panics if `indices` does not have exactly one entry per dimension or if any index is out
    /// of bounds. Callers only ever index inside the shape they iterate over.
    #[track_caller]
    pub fn at(&self, indices: &[usize]) -> f32 {
        self.data[self.offset(indices)]
    }

    /// Returns a 3-dimensional `ndarray` view of the same data, if this view has rank 3.
    pub fn to_array3(&self) -> Option<ArrayView3<'a, f32>> {
        match *self.shape.as_slice() {
            [h, w, c] => ArrayView3::from_shape((h, w, c), self.data).ok(),
            _ => None,
        }
    }

    #[track_caller]
    fn offset(&self, indices: &[usize]) -> usize {
        assert_eq!(
            indices.len(),
            self.shape.len(),
            "attempted to index tensor of shape {:?} with {:?}",
            self.shape,
            indices
        );

        let mut offset = 0;
        for ((&index, &size), &stride) in indices.iter().zip(&self.shape).zip(&self.strides) {
            assert!(
                index < size,
                "attempted to index tensor of shape {:?} with {:?}",
                self.shape,
                indices
            );
            offset += index * stride;
        }
        offset
    }
}

impl<const N: usize> Index<[usize; N]> for TensorView<'_> {
    type Output = f32;

    #[track_caller]
    fn index(&self, indices: [usize; N]) -> &f32 {
        &self.data[self.offset(&indices)]
    }
}

impl fmt::Debug for TensorView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TensorView")
            .field("shape", &self.shape)
            .finish()
    }
}
