//! Finite-difference verification of hand-derived gradients

use tracing::debug;

use crate::{
    error::{CriterionError, CriterionResult},
    nn::criterion::{Criterion, WeightedTarget},
    tensor::{Element, Tensor},
};

/// Central-difference gradient check settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientCheck {
    pub epsilon: f64,
    pub tolerance: f64,
}

impl Default for GradientCheck {
    fn default() -> Self {
        Self {
            epsilon: 1e-6,
            tolerance: 1e-4,
        }
    }
}

/// Gradient check result
#[derive(Debug, Clone)]
pub struct GradientCheckReport {
    pub analytic: Vec<f64>,
    pub numeric: Vec<f64>,
    pub max_abs_error: f64,
    pub worst_index: Option<usize>,
    pub passed: bool,
}

impl GradientCheck {
    pub fn new(epsilon: f64, tolerance: f64) -> CriterionResult<Self> {
        if !(epsilon > 0.0 && tolerance > 0.0) {
            return Err(CriterionError::invalid_argument(
                "gradient check epsilon and tolerance must be positive",
            ));
        }
        Ok(Self { epsilon, tolerance })
    }

    /// Compare `backward` against central differences of `forward`, one element at a time.
    ///
    /// Only meaningful when backward is the exact derivative of forward, i.e. for
    /// a fixed normalizer or a batch of one.
    pub fn run<T, C>(
        &self,
        criterion: &mut C,
        input: &Tensor<T>,
        target: &WeightedTarget<'_, T>,
    ) -> CriterionResult<GradientCheckReport>
    where
        T: Element,
        C: Criterion<T> + ?Sized,
    {
        criterion.forward(input, target)?;
        let analytic: Vec<f64> = criterion
            .backward(input, target)?
            .as_slice()
            .iter()
            .map(|g| g.as_f64())
            .collect();

        let eps = T::from_f64(self.epsilon);
        let mut probe = input.clone();
        let mut numeric = Vec::with_capacity(input.numel());
        for i in 0..input.numel() {
            let original = probe.as_slice()[i];

            probe.as_slice_mut()[i] = original + eps;
            let plus = criterion.forward(&probe, target)?.as_f64();
            probe.as_slice_mut()[i] = original - eps;
            let minus = criterion.forward(&probe, target)?.as_f64();
            probe.as_slice_mut()[i] = original;

            numeric.push((plus - minus) / (2.0 * self.epsilon));
        }

        let mut max_abs_error = 0.0;
        let mut worst_index = None;
        for (i, (a, n)) in analytic.iter().zip(numeric.iter()).enumerate() {
            let err = (a - n).abs();
            if err > max_abs_error || (err.is_nan() && worst_index.is_none()) {
                max_abs_error = err;
                worst_index = Some(i);
            }
        }
        let passed = max_abs_error <= self.tolerance;

        debug!(
            criterion = criterion.name(),
            elements = input.numel(),
            max_abs_error,
            passed,
            "gradient check"
        );

        Ok(GradientCheckReport {
            analytic,
            numeric,
            max_abs_error,
            worst_index,
            passed,
        })
    }
}
