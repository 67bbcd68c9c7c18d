//! Anvil criterion - weighted Smooth L1 loss with hand-derived gradients
//!
//! Features:
//! - Smooth L1 (Huber-style) forward/backward kernel with inside/outside weights
//! - Scratch buffers reused across forward/backward pairs
//! - `f32`/`f64` genericity resolved at compile time
//! - JSON configuration, criterion factory and a thread-safe wrapper
//! - Finite-difference gradient verification

pub mod config;
pub mod error;
pub mod nn;
pub mod tensor;
pub mod verification;

pub use config::{ConfigBuilder, ConfigManager, CriterionConfig, LossConfig};
pub use error::{CriterionError, CriterionResult, ErrorCode};
pub use nn::{
    Criterion, CriterionFactory, Normalizer, ScratchPolicy, SharedCriterion,
    SmoothL1WeightedCriterion, TargetWeights, WeightedTarget,
};
pub use tensor::{DType, Element, Shape, Tensor};
pub use verification::{GradientCheck, GradientCheckReport};

/// Install a `tracing` subscriber at INFO level.
///
/// Does nothing if a global subscriber is already set.
pub fn init() -> CriterionResult<()> {
    init_with_config(&CriterionConfig::default())
}

/// Install a `tracing` subscriber, at DEBUG level when `development.verbose_logging` is set.
pub fn init_with_config(config: &CriterionConfig) -> CriterionResult<()> {
    let level = if config.development.verbose_logging {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    if tracing_subscriber::fmt().with_max_level(level).try_init().is_ok() {
        tracing::info!(?level, "Anvil criterion initialized");
    }
    Ok(())
}

/// Get the current crate version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
