//! Minimal owned tensor used by the criteria
//!
//! - Runtime n-dimensional shape with first-dimension batch size
//! - `f32`/`f64` element genericity through [`Element`]
//! - Element-wise kernels with an optional rayon path

pub mod core;
pub mod ops;

// Re-export main types for convenience
pub use self::core::{DType, Element, Shape, Tensor};
pub use self::ops::{sign, ElementwiseKernels, DEFAULT_PARALLEL_THRESHOLD};
