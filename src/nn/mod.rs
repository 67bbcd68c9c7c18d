//! Neural network criteria

pub mod criterion;
pub mod losses;
pub mod shared;

pub use criterion::*;
pub use losses::*;
pub use shared::*;
