//! Core tensor types and fundamental operations

use std::{
    fmt::{self, Debug, Display},
    iter::Sum,
};
use num_traits::Float;
use serde::{Serialize, Deserialize};

use crate::error::{CriterionError, CriterionResult};

/// Runtime shape: one extent per dimension, row-major
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Shape {
    pub dims: Vec<usize>,
}

impl Shape {
    pub fn new(dims: impl Into<Vec<usize>>) -> Self {
        Self { dims: dims.into() }
    }

    /// A 0-d shape holding a single element.
    pub fn scalar() -> Self {
        Self { dims: Vec::new() }
    }

    pub fn total_elements(&self) -> usize {
        self.dims.iter().product()
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn dim(&self, index: usize) -> Option<usize> {
        self.dims.get(index).copied()
    }

    /// Extent of the first dimension; a 0-d shape counts as a batch of one.
    pub fn batch_size(&self) -> usize {
        self.dims.first().copied().unwrap_or(1)
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.dims
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Self { dims }
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Self { dims: dims.to_vec() }
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Self { dims: dims.to_vec() }
    }
}

impl Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.dims.iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(", "))
    }
}

/// Floating point element types a criterion can run on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    F32,
    F64,
}

impl DType {
    /// Get the size in bytes of this data type
    pub const fn size(&self) -> usize {
        match self {
            DType::F32 => 4,
            DType::F64 => 8,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DType::F32 => "float32",
            DType::F64 => "float64",
        }
    }
}

/// Element type of a [`Tensor`]. Implemented for `f32` and `f64` only.
pub trait Element: Float + Sum + Default + Debug + Display + Send + Sync + 'static {
    const DTYPE: DType;

    fn from_f64(value: f64) -> Self;

    fn as_f64(self) -> f64;
}

impl Element for f32 {
    const DTYPE: DType = DType::F32;

    #[inline]
    fn from_f64(value: f64) -> Self {
        value as f32
    }

    #[inline]
    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl Element for f64 {
    const DTYPE: DType = DType::F64;

    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }

    #[inline]
    fn as_f64(self) -> f64 {
        self
    }
}

/// Contiguous, owned n-dimensional tensor
#[derive(Clone, PartialEq)]
pub struct Tensor<T: Element> {
    data: Vec<T>,
    shape: Shape,
}

impl<T: Element> Tensor<T> {
    /// Zero-filled tensor of the given shape
    pub fn zeros(shape: impl Into<Shape>) -> Self {
        Self::full(shape, T::zero())
    }

    pub fn ones(shape: impl Into<Shape>) -> Self {
        Self::full(shape, T::one())
    }

    pub fn full(shape: impl Into<Shape>, value: T) -> Self {
        let shape = shape.into();
        Self {
            data: vec![value; shape.total_elements()],
            shape,
        }
    }

    /// Wrap an existing buffer, checking it matches the shape
    pub fn from_vec(data: Vec<T>, shape: impl Into<Shape>) -> CriterionResult<Self> {
        let shape = shape.into();
        if data.len() != shape.total_elements() {
            return Err(CriterionError::invalid_argument(format!(
                "Data length {} doesn't match shape {} ({} elements)",
                data.len(),
                shape,
                shape.total_elements()
            )));
        }
        Ok(Self { data, shape })
    }

    /// 1-d tensor over a copy of `values`
    pub fn from_slice(values: &[T]) -> Self {
        Self {
            data: values.to_vec(),
            shape: Shape::new([values.len()]),
        }
    }

    /// An empty placeholder, used for lazily sized scratch buffers.
    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            shape: Shape::new([0]),
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dtype(&self) -> DType {
        T::DTYPE
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    pub fn size(&self, dim: usize) -> Option<usize> {
        self.shape.dim(dim)
    }

    pub fn batch_size(&self) -> usize {
        self.shape.batch_size()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_slice_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Reshape in place to `shape`, keeping the allocation when it is large enough.
    /// Element values are unspecified afterwards.
    pub fn resize_as(&mut self, shape: &Shape) {
        if &self.shape != shape {
            self.data.resize(shape.total_elements(), T::zero());
            self.shape = shape.clone();
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }
}

impl<T: Element> Debug for Tensor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape)
            .field("dtype", &self.dtype())
            .field("size", &self.numel())
            .finish()
    }
}
