pub mod batch_renderer;
pub mod config;
pub mod global_uniform;
pub mod gpu_mirror;
pub mod headless_renderer;
pub mod instancing;
