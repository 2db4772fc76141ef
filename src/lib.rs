pub mod analysis;
pub mod assembly;
pub mod error;
pub mod kernel;
pub mod machine;
pub mod math;
pub mod mesh;
pub mod operations;
pub mod primitives;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{EmsectorError, Result};
