use anyhow::Result;
use clap::Parser;

use cubestorm::{
    demo::{DemoState, ScenePreset, SceneConfig},
    rendering::config::RenderConfig,
};

const DEFAULT_FRAMES: u32 = 600;
const FRAME_DELTA: f32 = 1.0 / 60.0;

#[derive(Parser)]
#[command(name = "cubestorm")]
#[command(about = "Runs an instanced cube scene and reports culling statistics")]
struct Args {
    /// Scene to run: single-cube, single-moving-cube, moving-cubes or moving-cubes-multi-batches
    #[arg(default_value = "moving-cubes-multi-batches")]
    preset: ScenePreset,

    /// Number of frames to simulate
    #[arg(default_value_t = DEFAULT_FRAMES)]
    frames: u32,

    /// Mirror instance buffers into wgpu buffers when an adapter is available
    #[arg(long)]
    gpu_mirror: bool,
}

fn main() -> Result<()> {
    pretty_env_logger::init();

    let Args {
        preset,
        frames,
        gpu_mirror,
    } = Args::parse();

    let render_config = RenderConfig {
        gpu_mirror,
        ..RenderConfig::default()
    };

    log::info!("Running {} for {} frames", preset.name(), frames);

    let mut demo = DemoState::new(SceneConfig::preset(preset), render_config)?;
    let stats = demo.run(frames, FRAME_DELTA)?;

    let total_visible: u64 = stats.iter().map(|s| s.visible_instances as u64).sum();
    let total_commands: u64 = stats.iter().map(|s| s.draw_commands as u64).sum();
    let frame_count = stats.len().max(1) as u64;

    log::info!(
        "{} frames, {:.1} visible instances and {:.1} draw commands per frame on average",
        stats.len(),
        total_visible as f64 / frame_count as f64,
        total_commands as f64 / frame_count as f64
    );

    Ok(())
}
