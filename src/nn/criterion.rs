//! Criterion interface shared by loss functions with hand-derived gradients

use serde::{Deserialize, Serialize};

use crate::{
    error::{CriterionError, CriterionResult},
    tensor::{Element, Tensor},
};

/// A loss with a paired forward (value) and backward (gradient w.r.t. input) pass.
///
/// `backward` is expected to follow the `forward` call for the same input and
/// target; implementations may reuse state computed by `forward`.
pub trait Criterion<T: Element>: Send {
    /// Compute the scalar loss
    fn forward(&mut self, input: &Tensor<T>, target: &WeightedTarget<'_, T>) -> CriterionResult<T>;

    /// Compute the gradient of the loss with respect to `input`
    fn backward(
        &mut self,
        input: &Tensor<T>,
        target: &WeightedTarget<'_, T>,
    ) -> CriterionResult<Tensor<T>>;

    /// Get the name of the criterion
    fn name(&self) -> &'static str;

    /// `forward` over a raw target tuple, validating its arity first
    fn forward_tensors(&mut self, input: &Tensor<T>, target: &[&Tensor<T>]) -> CriterionResult<T> {
        let target = WeightedTarget::from_tensors(target)?;
        self.forward(input, &target)
    }

    /// `backward` over a raw target tuple, validating its arity first
    fn backward_tensors(
        &mut self,
        input: &Tensor<T>,
        target: &[&Tensor<T>],
    ) -> CriterionResult<Tensor<T>> {
        let target = WeightedTarget::from_tensors(target)?;
        self.backward(input, &target)
    }
}

/// Inside/outside weight pair; always supplied together.
#[derive(Debug, Clone, Copy)]
pub struct TargetWeights<'a, T: Element> {
    pub inside: &'a Tensor<T>,
    pub outside: &'a Tensor<T>,
}

/// Ground truth plus optional per-element weights
#[derive(Debug, Clone, Copy)]
pub struct WeightedTarget<'a, T: Element> {
    pub ground_truth: &'a Tensor<T>,
    pub weights: Option<TargetWeights<'a, T>>,
}

impl<'a, T: Element> WeightedTarget<'a, T> {
    pub fn unweighted(ground_truth: &'a Tensor<T>) -> Self {
        Self { ground_truth, weights: None }
    }

    pub fn weighted(
        ground_truth: &'a Tensor<T>,
        inside: &'a Tensor<T>,
        outside: &'a Tensor<T>,
    ) -> Self {
        Self {
            ground_truth,
            weights: Some(TargetWeights { inside, outside }),
        }
    }

    /// Build from a `[ground_truth]` or `[ground_truth, inside, outside]` tuple.
    pub fn from_tensors(tensors: &[&'a Tensor<T>]) -> CriterionResult<Self> {
        match *tensors {
            [ground_truth] => Ok(Self::unweighted(ground_truth)),
            [ground_truth, inside, outside] => Ok(Self::weighted(ground_truth, inside, outside)),
            _ => Err(CriterionError::invalid_argument(format!(
                "target must supply ground truth alone, or ground truth plus inside/outside weights (got {} tensors)",
                tensors.len()
            ))),
        }
    }

    /// Number of tensors in the target tuple: 1 or 3
    pub fn arity(&self) -> usize {
        if self.weights.is_some() { 3 } else { 1 }
    }

    pub fn has_weights(&self) -> bool {
        self.weights.is_some()
    }

    /// Check every tensor holds as many elements as `input`.
    pub fn validate(&self, input: &Tensor<T>) -> CriterionResult<()> {
        let expected = input.numel();
        check_count("ground truth", expected, self.ground_truth)?;
        if let Some(weights) = &self.weights {
            check_count("inside weight", expected, weights.inside)?;
            check_count("outside weight", expected, weights.outside)?;
        }
        Ok(())
    }
}

fn check_count<T: Element>(role: &str, expected: usize, tensor: &Tensor<T>) -> CriterionResult<()> {
    if tensor.numel() != expected {
        return Err(CriterionError::shape_mismatch(
            &format!("{} elements", expected),
            &format!("{} elements in {} {}", tensor.numel(), role, tensor.shape()),
            None,
        ));
    }
    Ok(())
}

/// Divisor applied to the summed loss
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalizer {
    /// Divide by the first-dimension size of the input
    Batch,
    /// Divide by a fixed positive count
    Fixed(u64),
}

impl Normalizer {
    /// `num <= 0` selects the batch size.
    pub fn from_num(num: i64) -> Self {
        if num > 0 {
            Normalizer::Fixed(num as u64)
        } else {
            Normalizer::Batch
        }
    }

    pub fn divisor(&self, input_batch_size: usize) -> usize {
        match self {
            Normalizer::Batch => input_batch_size,
            Normalizer::Fixed(n) => *n as usize,
        }
    }
}

/// How `backward` obtains the residuals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScratchPolicy {
    /// Reuse the residuals left by the matching `forward`
    #[default]
    Reuse,
    /// Recompute residuals on every `backward`
    Recompute,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_target_arity() {
        let gt = Tensor::<f32>::zeros([2]);
        let w = Tensor::<f32>::ones([2]);

        assert_eq!(WeightedTarget::from_tensors(&[&gt]).unwrap().arity(), 1);
        assert_eq!(WeightedTarget::from_tensors(&[&gt, &w, &w]).unwrap().arity(), 3);

        for bad in [vec![], vec![&gt, &w], vec![&gt, &w, &w, &w]] {
            let err = WeightedTarget::from_tensors(&bad).unwrap_err();
            assert_eq!(err.code(), ErrorCode::InvalidArgument);
        }
    }

    #[test]
    fn test_validate_counts() {
        let input = Tensor::<f64>::zeros([2, 2]);
        let gt = Tensor::<f64>::zeros([4]);
        let short = Tensor::<f64>::ones([3]);
        let ones = Tensor::<f64>::ones([4]);

        assert!(WeightedTarget::unweighted(&gt).validate(&input).is_ok());
        assert!(WeightedTarget::weighted(&gt, &ones, &ones).validate(&input).is_ok());

        let err = WeightedTarget::weighted(&gt, &ones, &short).validate(&input).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ShapeMismatch);
        assert!(err.to_string().contains("outside weight"));

        let err = WeightedTarget::unweighted(&short).validate(&input).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ShapeMismatch);
    }

    #[test]
    fn test_normalizer_from_num() {
        assert_eq!(Normalizer::from_num(0), Normalizer::Batch);
        assert_eq!(Normalizer::from_num(-3), Normalizer::Batch);
        assert_eq!(Normalizer::from_num(5), Normalizer::Fixed(5));
        assert_eq!(Normalizer::Batch.divisor(8), 8);
        assert_eq!(Normalizer::Fixed(5).divisor(8), 5);
    }

    #[test]
    fn test_scratch_policy_serde() {
        let json = serde_json::to_string(&ScratchPolicy::Recompute).unwrap();
        assert_eq!(json, "\"recompute\"");
        assert_eq!(ScratchPolicy::default(), ScratchPolicy::Reuse);
    }
}
