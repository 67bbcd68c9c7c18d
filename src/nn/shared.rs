//! Thread-safe wrapper around a stateful criterion

use std::{marker::PhantomData, sync::Arc};

use parking_lot::Mutex;

use crate::{
    error::CriterionResult,
    nn::criterion::{Criterion, WeightedTarget},
    tensor::{Element, Tensor},
};

/// Shares one criterion between threads, serialising calls behind a mutex.
///
/// Use [`forward_backward`](Self::forward_backward) when the gradient must come
/// from the same residuals as the loss; separate `forward` and `backward`
/// calls can interleave with other threads.
pub struct SharedCriterion<T: Element, C: Criterion<T>> {
    inner: Arc<Mutex<C>>,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: Element, C: Criterion<T>> SharedCriterion<T, C> {
    pub fn new(criterion: C) -> Self {
        Self {
            inner: Arc::new(Mutex::new(criterion)),
            _phantom: PhantomData,
        }
    }

    pub fn forward(&self, input: &Tensor<T>, target: &WeightedTarget<'_, T>) -> CriterionResult<T> {
        self.inner.lock().forward(input, target)
    }

    pub fn backward(
        &self,
        input: &Tensor<T>,
        target: &WeightedTarget<'_, T>,
    ) -> CriterionResult<Tensor<T>> {
        self.inner.lock().backward(input, target)
    }

    /// Loss and gradient under a single lock
    pub fn forward_backward(
        &self,
        input: &Tensor<T>,
        target: &WeightedTarget<'_, T>,
    ) -> CriterionResult<(T, Tensor<T>)> {
        let mut criterion = self.inner.lock();
        let loss = criterion.forward(input, target)?;
        let grad = criterion.backward(input, target)?;
        Ok((loss, grad))
    }

    pub fn name(&self) -> &'static str {
        self.inner.lock().name()
    }

    /// Number of handles sharing the criterion
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl<T: Element, C: Criterion<T>> Clone for SharedCriterion<T, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            _phantom: PhantomData,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::losses::SmoothL1WeightedCriterion;
    use std::thread;

    #[test]
    fn test_forward_backward_pair() {
        let shared = SharedCriterion::new(SmoothL1WeightedCriterion::<f32>::new(1.0, 0).unwrap());
        let input = Tensor::from_slice(&[2.0]);
        let gt = Tensor::from_slice(&[0.0]);

        let (loss, grad) = shared
            .forward_backward(&input, &WeightedTarget::unweighted(&gt))
            .unwrap();
        assert_eq!(loss, 1.5);
        assert_eq!(grad.as_slice(), &[1.0]);
        assert_eq!(shared.name(), "SmoothL1WeightedCriterion");
    }

    #[test]
    fn test_shared_across_threads() {
        let shared = SharedCriterion::new(SmoothL1WeightedCriterion::<f64>::new(1.0, 0).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let shared = shared.clone();
                thread::spawn(move || {
                    let value = 0.2 * (i + 1) as f64;
                    let input = Tensor::from_slice(&[value]);
                    let gt = Tensor::from_slice(&[0.0]);
                    let (loss, grad) = shared
                        .forward_backward(&input, &WeightedTarget::unweighted(&gt))
                        .unwrap();
                    (value, loss, grad.as_slice()[0])
                })
            })
            .collect();

        for handle in handles {
            let (value, loss, grad) = handle.join().unwrap();
            // every residual is inside the quadratic region for sigma = 1
            assert_eq!(loss, 0.5 * value * value);
            assert_eq!(grad, value);
        }
        assert_eq!(shared.handle_count(), 1);
    }
}
