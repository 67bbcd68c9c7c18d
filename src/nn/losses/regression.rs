//! Regression loss functions

use tracing::{debug, trace};

use crate::{
    config::CriterionConfig,
    error::{CriterionError, CriterionResult, ErrorContext, WithContext},
    nn::criterion::{Criterion, Normalizer, ScratchPolicy, WeightedTarget},
    tensor::{sign, Element, ElementwiseKernels, Tensor},
};

/// What the `diff` scratch buffer currently holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DiffState {
    /// Nothing usable: never filled, or already turned into a gradient
    Stale,
    /// Residuals from the last `forward`, inside-weighted when `weighted`
    Residuals { weighted: bool },
}

/// Smooth L1 loss with optional inside/outside weights.
///
/// For each element the residual `x = inside * (input - ground_truth)` is mapped to
///
/// ```text
/// 0.5 * sigma² * x²     if |x| < 1 / sigma²
/// |x| - 0.5 / sigma²    otherwise
/// ```
///
/// then scaled by `outside`, summed and divided by the normalizer.
///
/// The criterion keeps two scratch buffers that are resized in place between
/// calls, so one instance must not be shared across threads without external
/// locking (see [`SharedCriterion`](crate::nn::SharedCriterion)).
///
/// # Normalizer asymmetry
///
/// With a fixed normalizer `n`, forward divides by `n` and backward scales by
/// `1 / n`. With the batch normalizer, forward divides by the batch size but
/// backward *multiplies* by it. Use a fixed normalizer when the gradient must
/// be the exact derivative of the returned loss.
#[derive(Debug, Clone)]
pub struct SmoothL1WeightedCriterion<T: Element> {
    sigma: f64,
    sigma2: T,
    normalizer: Normalizer,
    scratch: ScratchPolicy,
    kernels: ElementwiseKernels,
    diff: Tensor<T>,
    buffer: Tensor<T>,
    has_weights: bool,
    diff_state: DiffState,
}

impl<T: Element> SmoothL1WeightedCriterion<T> {
    /// `num <= 0` normalizes by the input's first-dimension size.
    pub fn new(sigma: f64, num: i64) -> CriterionResult<Self> {
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(CriterionError::invalid_argument(format!(
                "sigma must be a positive finite number, got {}",
                sigma
            )));
        }

        let normalizer = Normalizer::from_num(num);
        debug!(sigma, ?normalizer, dtype = T::DTYPE.name(), "created smooth L1 criterion");

        Ok(Self {
            sigma,
            sigma2: T::from_f64(sigma * sigma),
            normalizer,
            scratch: ScratchPolicy::default(),
            kernels: ElementwiseKernels::default(),
            diff: Tensor::empty(),
            buffer: Tensor::empty(),
            has_weights: false,
            diff_state: DiffState::Stale,
        })
    }

    pub fn from_config(config: &CriterionConfig) -> CriterionResult<Self> {
        config.validate()?;
        Ok(Self::new(config.loss.sigma, config.loss.num)?
            .with_scratch_policy(config.loss.scratch)
            .with_kernels(ElementwiseKernels::new(config.performance.parallel_threshold)))
    }

    pub fn with_scratch_policy(mut self, scratch: ScratchPolicy) -> Self {
        self.scratch = scratch;
        self
    }

    pub fn with_kernels(mut self, kernels: ElementwiseKernels) -> Self {
        self.kernels = kernels;
        self
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn sigma2(&self) -> T {
        self.sigma2
    }

    pub fn normalizer(&self) -> Normalizer {
        self.normalizer
    }

    pub fn scratch_policy(&self) -> ScratchPolicy {
        self.scratch
    }

    /// Whether the last call ran with inside/outside weights
    pub fn has_weights(&self) -> bool {
        self.has_weights
    }

    /// `diff = inside * (input - ground_truth)`
    fn compute_residuals(&mut self, input: &Tensor<T>, target: &WeightedTarget<'_, T>) {
        let kernels = self.kernels;
        self.diff.resize_as(input.shape());
        kernels.sub(
            self.diff.as_slice_mut(),
            input.as_slice(),
            target.ground_truth.as_slice(),
        );
        if let Some(weights) = &target.weights {
            kernels.mul_assign(self.diff.as_slice_mut(), weights.inside.as_slice());
        }
    }

    fn validate(&mut self, op: &str, input: &Tensor<T>, target: &WeightedTarget<'_, T>) -> CriterionResult<()> {
        target.validate(input).with_context(|| {
            ErrorContext::new(op)
                .with_shape(input.shape())
                .with_shape(target.ground_truth.shape())
        })?;
        self.has_weights = target.has_weights();
        Ok(())
    }
}

impl<T: Element> Criterion<T> for SmoothL1WeightedCriterion<T> {
    fn forward(&mut self, input: &Tensor<T>, target: &WeightedTarget<'_, T>) -> CriterionResult<T> {
        self.validate("smooth_l1.forward", input, target)?;
        self.compute_residuals(input, target);

        let kernels = self.kernels;
        self.buffer.resize_as(input.shape());
        kernels.abs(self.buffer.as_slice_mut(), self.diff.as_slice());

        let sigma2 = self.sigma2;
        let threshold = T::one() / sigma2;
        let half = T::from_f64(0.5);
        // Branch on the untransformed |x|.
        kernels.map_inplace(self.buffer.as_slice_mut(), move |x| {
            if x < threshold {
                half * sigma2 * x * x
            } else {
                x - half / sigma2
            }
        });

        if let Some(weights) = &target.weights {
            kernels.mul_assign(self.buffer.as_slice_mut(), weights.outside.as_slice());
        }

        let total = kernels.sum(self.buffer.as_slice());
        let divisor = self.normalizer.divisor(input.batch_size());
        let loss = if divisor == 0 {
            T::zero()
        } else {
            total / T::from_f64(divisor as f64)
        };

        self.diff_state = DiffState::Residuals { weighted: self.has_weights };
        trace!(
            shape = %input.shape(),
            weighted = self.has_weights,
            loss = loss.as_f64(),
            "smooth L1 forward"
        );
        Ok(loss)
    }

    fn backward(
        &mut self,
        input: &Tensor<T>,
        target: &WeightedTarget<'_, T>,
    ) -> CriterionResult<Tensor<T>> {
        self.validate("smooth_l1.backward", input, target)?;

        let reusable = self.scratch == ScratchPolicy::Reuse
            && self.diff_state == DiffState::Residuals { weighted: self.has_weights }
            && self.diff.shape() == input.shape();
        if !reusable {
            if self.scratch == ScratchPolicy::Reuse {
                debug!(shape = %input.shape(), "no matching forward pending, recomputing residuals");
            }
            self.compute_residuals(input, target);
        }

        let kernels = self.kernels;
        let sigma2 = self.sigma2;
        let threshold = T::one() / sigma2;
        kernels.map_inplace(self.diff.as_slice_mut(), move |x| {
            if x.abs() < threshold {
                sigma2 * x
            } else {
                sign(x)
            }
        });
        self.diff_state = DiffState::Stale;

        // Batch normalizer scales up rather than down; see the type-level docs.
        let alpha = match self.normalizer {
            Normalizer::Fixed(n) => T::one() / T::from_f64(n as f64),
            Normalizer::Batch => T::from_f64(input.batch_size() as f64),
        };

        let mut grad_input = Tensor::zeros(self.diff.shape().clone());
        kernels.scale(grad_input.as_slice_mut(), self.diff.as_slice(), alpha);

        if let Some(weights) = &target.weights {
            kernels.mul_assign(grad_input.as_slice_mut(), weights.inside.as_slice());
            kernels.mul_assign(grad_input.as_slice_mut(), weights.outside.as_slice());
        }

        trace!(shape = %input.shape(), weighted = self.has_weights, "smooth L1 backward");
        Ok(grad_input)
    }

    fn name(&self) -> &'static str {
        "SmoothL1WeightedCriterion"
    }
}
