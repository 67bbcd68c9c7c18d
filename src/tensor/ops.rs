//! Element-wise kernels over contiguous buffers
//!
//! Maps run on rayon above `parallel_threshold` elements when the `parallel`
//! feature is enabled. Reductions always run sequentially so a loss value
//! does not depend on the thread count.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::core::Element;

/// Default element count at which maps switch to the rayon path.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 32 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementwiseKernels {
    parallel_threshold: usize,
}

impl Default for ElementwiseKernels {
    fn default() -> Self {
        Self::new(DEFAULT_PARALLEL_THRESHOLD)
    }
}

impl ElementwiseKernels {
    pub fn new(parallel_threshold: usize) -> Self {
        Self { parallel_threshold: parallel_threshold.max(1) }
    }

    pub fn parallel_threshold(&self) -> usize {
        self.parallel_threshold
    }

    /// `out = a - b`
    pub fn sub<T: Element>(&self, out: &mut [T], a: &[T], b: &[T]) {
        debug_assert_eq!(a.len(), b.len());
        out.copy_from_slice(a);
        self.zip_apply(out, b, |o, b| *o = *o - b);
    }

    /// `out *= w`
    pub fn mul_assign<T: Element>(&self, out: &mut [T], w: &[T]) {
        self.zip_apply(out, w, |o, w| *o = *o * w);
    }

    /// `out = |src|`
    pub fn abs<T: Element>(&self, out: &mut [T], src: &[T]) {
        self.zip_apply(out, src, |o, s| *o = s.abs());
    }

    /// `out = src * alpha`
    pub fn scale<T: Element>(&self, out: &mut [T], src: &[T], alpha: T) {
        self.zip_apply(out, src, |o, s| *o = s * alpha);
    }

    /// Apply `f` to every element in place
    pub fn map_inplace<T, F>(&self, out: &mut [T], f: F)
    where
        T: Element,
        F: Fn(T) -> T + Send + Sync,
    {
        #[cfg(feature = "parallel")]
        if out.len() >= self.parallel_threshold {
            out.par_iter_mut().for_each(|x| *x = f(*x));
            return;
        }

        for x in out.iter_mut() {
            *x = f(*x);
        }
    }

    pub fn sum<T: Element>(&self, src: &[T]) -> T {
        src.iter().copied().sum()
    }

    fn zip_apply<T, F>(&self, out: &mut [T], src: &[T], f: F)
    where
        T: Element,
        F: Fn(&mut T, T) + Send + Sync,
    {
        debug_assert_eq!(out.len(), src.len());

        #[cfg(feature = "parallel")]
        if out.len() >= self.parallel_threshold {
            out.par_iter_mut()
                .zip(src.par_iter())
                .for_each(|(o, &s)| f(o, s));
            return;
        }

        for (o, &s) in out.iter_mut().zip(src.iter()) {
            f(o, s);
        }
    }
}

/// Three-way sign: `sign(0) == 0`, unlike `f32::signum`.
#[inline]
pub fn sign<T: Element>(x: T) -> T {
    if x > T::zero() {
        T::one()
    } else if x < T::zero() {
        -T::one()
    } else {
        T::zero()
    }
}
