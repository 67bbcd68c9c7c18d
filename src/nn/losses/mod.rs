//! Loss functions with hand-derived gradients

pub mod regression;

pub use regression::*;

use crate::{
    config::CriterionConfig,
    error::{CriterionError, CriterionResult},
    nn::criterion::Criterion,
    tensor::Element,
};

/// Criterion factory for creating criteria by name
pub struct CriterionFactory;

impl CriterionFactory {
    /// Create a criterion by name, configured from `config`
    pub fn create<T: Element>(
        name: &str,
        config: &CriterionConfig,
    ) -> CriterionResult<Box<dyn Criterion<T>>> {
        match name.to_lowercase().as_str() {
            "smooth_l1_weighted" | "smoothl1weighted" | "smooth_l1" | "huber" => {
                Ok(Box::new(SmoothL1WeightedCriterion::<T>::from_config(config)?))
            }
            _ => Err(CriterionError::invalid_argument(format!("Unknown criterion: {}", name))),
        }
    }

    /// List all available criteria
    pub fn available_criteria() -> Vec<&'static str> {
        vec!["smooth_l1_weighted", "smooth_l1", "huber"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ConfigBuilder,
        error::ErrorCode,
        tensor::Tensor,
    };

    #[test]
    fn test_criterion_factory() {
        let config = CriterionConfig::default();
        for name in CriterionFactory::available_criteria() {
            let criterion = CriterionFactory::create::<f32>(name, &config).unwrap();
            assert_eq!(criterion.name(), "SmoothL1WeightedCriterion");
        }

        let criterion = CriterionFactory::create::<f64>("Smooth_L1_Weighted", &config).unwrap();
        assert_eq!(criterion.name(), "SmoothL1WeightedCriterion");
    }

    #[test]
    fn test_unknown_criterion() {
        let err = CriterionFactory::create::<f32>("cross_entropy", &CriterionConfig::default())
            .err()
            .unwrap();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_factory_applies_config() {
        let config = ConfigBuilder::new()
            .loss(|l| {
                l.sigma = 3.0;
                l.num = 2;
            })
            .build();
        let mut criterion = CriterionFactory::create::<f64>("smooth_l1", &config).unwrap();

        // |x| = 1 >= 1/9, linear: 1 - 0.5/9, divided by num = 2
        let input = Tensor::from_slice(&[1.0]);
        let gt = Tensor::from_slice(&[0.0]);
        let loss = criterion.forward_tensors(&input, &[&gt]).unwrap();
        approx::assert_relative_eq!(loss, (1.0 - 0.5 / 9.0) / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_factory_rejects_invalid_config() {
        let config = ConfigBuilder::new().loss(|l| l.sigma = -1.0).build();
        let err = CriterionFactory::create::<f32>("smooth_l1", &config).err().unwrap();
        assert_eq!(err.code(), ErrorCode::ConfigInvalid);
    }
}
