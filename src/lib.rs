pub mod camera;
pub mod demo;
pub mod error;
pub mod math;
pub mod rendering;

pub use error::{InstancingError, Result};
