use std::str::FromStr;

use anyhow::Context;
use glam::{Quat, Vec3, Vec4};
use rand::Rng;

use crate::{
    camera::Camera,
    error::InstancingError,
    math::{bounds::Aabb, frustum::Frustum},
    rendering::{
        batch_renderer::{BatchRenderer, MaterialDescriptor, MaterialId, MeshDescriptor, MeshId},
        config::RenderConfig,
        global_uniform::BatchGlobals,
        gpu_mirror::{GpuContext, GpuMirror},
        headless_renderer::{FrameStats, HeadlessRenderer},
        instancing::{
            spawn::{
                compute_color, compute_position, random_color, random_in_ball, random_rotation,
                seeded_rng, square_grid, DEFAULT_SEED,
            },
            DrawKey, FrameTime, InstanceManager, InstanceSpawn, Motion, MotionSettings,
        },
    },
};

/// Half size of the bounds handed to the renderer, large enough to never cull a batch.
const GLOBAL_BOUNDS_EXTENT: f32 = 524_288.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenePreset {
    SingleCube,
    SingleMovingCube,
    MovingCubes,
    MovingCubesMultiBatches,
}

impl ScenePreset {
    pub const ALL: [ScenePreset; 4] = [
        ScenePreset::SingleCube,
        ScenePreset::SingleMovingCube,
        ScenePreset::MovingCubes,
        ScenePreset::MovingCubesMultiBatches,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ScenePreset::SingleCube => "single-cube",
            ScenePreset::SingleMovingCube => "single-moving-cube",
            ScenePreset::MovingCubes => "moving-cubes",
            ScenePreset::MovingCubesMultiBatches => "moving-cubes-multi-batches",
        }
    }
}

impl FromStr for ScenePreset {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScenePreset::ALL
            .into_iter()
            .find(|preset| preset.name() == s)
            .with_context(|| {
                let names: Vec<&str> = ScenePreset::ALL.iter().map(|p| p.name()).collect();
                format!("Unknown scene '{s}', expected one of {}", names.join(", "))
            })
    }
}

/// How instances are placed at spawn time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpawnLayout {
    /// Every instance at the origin with a fixed color.
    Single { color: Vec4 },
    /// Uniformly inside a ball around the origin, random colors and rotations.
    Ball { radius: f32 },
    /// Square grid spread over `scale` around the origin, rainbow colors, random
    /// rotations and a random mesh and material per instance.
    Grid { scale: Vec3 },
}

#[derive(Debug, Clone)]
pub struct SceneConfig {
    pub instance_count: u32,
    /// Degrees per second.
    pub rotate_speed: f32,
    pub motion: Motion,
    pub seed: u64,
    pub origin: Vec3,
    pub layout: SpawnLayout,
    pub meshes: Vec<MeshDescriptor>,
    pub materials: Vec<MaterialDescriptor>,
    pub camera: Camera,
}

fn unit_mesh(name: &str, extents: Vec3) -> MeshDescriptor {
    MeshDescriptor {
        name: name.to_string(),
        bounds: Aabb::new(Vec3::ZERO, extents),
    }
}

fn material(name: &str) -> MaterialDescriptor {
    MaterialDescriptor {
        name: name.to_string(),
    }
}

impl SceneConfig {
    pub fn preset(preset: ScenePreset) -> Self {
        let cube = unit_mesh("cube", Vec3::splat(0.5));
        let red = Vec4::new(1.0, 0.0, 0.0, 1.0);

        match preset {
            ScenePreset::SingleCube => Self {
                instance_count: 1,
                rotate_speed: 0.0,
                motion: Motion::Static,
                seed: DEFAULT_SEED,
                origin: Vec3::ZERO,
                layout: SpawnLayout::Single { color: red },
                meshes: vec![cube],
                materials: vec![material("lit")],
                camera: Camera::looking_at(Vec3::new(0.0, 2.0, -5.0), Vec3::ZERO),
            },
            ScenePreset::SingleMovingCube => Self {
                instance_count: 1,
                rotate_speed: 90.0,
                motion: Motion::Bob { move_speed: 2.0 },
                seed: DEFAULT_SEED,
                origin: Vec3::ZERO,
                layout: SpawnLayout::Single { color: red },
                meshes: vec![cube],
                materials: vec![material("lit")],
                camera: Camera::looking_at(Vec3::new(0.0, 2.0, -6.0), Vec3::ZERO),
            },
            ScenePreset::MovingCubes => Self {
                instance_count: 4096,
                rotate_speed: 45.0,
                motion: Motion::Static,
                seed: DEFAULT_SEED,
                origin: Vec3::ZERO,
                layout: SpawnLayout::Ball { radius: 10.0 },
                meshes: vec![cube],
                materials: vec![material("lit")],
                camera: Camera::looking_at(Vec3::new(0.0, 10.0, -30.0), Vec3::ZERO),
            },
            ScenePreset::MovingCubesMultiBatches => Self {
                instance_count: 20_000,
                rotate_speed: 90.0,
                motion: Motion::Orbit {
                    origin: Vec3::ZERO,
                    move_speed: 5.0,
                },
                seed: DEFAULT_SEED,
                origin: Vec3::ZERO,
                layout: SpawnLayout::Grid {
                    scale: Vec3::new(100.0, 1.0, 100.0),
                },
                meshes: vec![
                    cube,
                    unit_mesh("sphere", Vec3::splat(0.5)),
                    unit_mesh("capsule", Vec3::new(0.5, 1.0, 0.5)),
                ],
                materials: vec![material("lit red"), material("lit green"), material("lit blue")],
                camera: Camera::looking_at(Vec3::new(0.0, 60.0, -80.0), Vec3::ZERO),
            },
        }
    }

    pub fn motion_settings(&self) -> MotionSettings {
        MotionSettings {
            rotate_speed: self.rotate_speed,
            motion: self.motion,
        }
    }
}

fn spawn_instances(
    scene: &SceneConfig,
    instances: &mut InstanceManager,
    mesh_ids: &[MeshId],
    material_ids: &[MaterialId],
) -> anyhow::Result<()> {
    let mut rng = seeded_rng(scene.seed);
    let grid = square_grid(scene.instance_count);

    for index in 0..scene.instance_count {
        let (mesh_index, material_index, spawn) = match scene.layout {
            SpawnLayout::Single { color } => (
                0,
                0,
                InstanceSpawn {
                    position: scene.origin,
                    rotation: Quat::IDENTITY,
                    bounds: scene.meshes[0].bounds,
                    color,
                },
            ),
            SpawnLayout::Ball { radius } => {
                let color = random_color(&mut rng);
                let position = random_in_ball(&mut rng, scene.origin, radius);
                let rotation = random_rotation(&mut rng);
                (
                    0,
                    0,
                    InstanceSpawn {
                        position,
                        rotation,
                        bounds: scene.meshes[0].bounds,
                        color,
                    },
                )
            }
            SpawnLayout::Grid { scale } => {
                let mesh_index = rng.gen_range(0..mesh_ids.len());
                let material_index = rng.gen_range(0..material_ids.len());
                (
                    mesh_index,
                    material_index,
                    InstanceSpawn {
                        position: compute_position(index, grid, scene.origin, scale),
                        rotation: random_rotation(&mut rng),
                        bounds: scene.meshes[mesh_index].bounds,
                        color: compute_color(index, scene.instance_count, 1.0),
                    },
                )
            }
        };

        let draw_key = DrawKey::new(mesh_ids[mesh_index], 0, material_ids[material_index]);
        instances.spawn(draw_key, spawn)?;
    }

    Ok(())
}

/// A scene running against the headless renderer, one [`DemoState::step`] per frame.
pub struct DemoState {
    pub camera: Camera,
    pub aspect_ratio: f32,
    renderer: HeadlessRenderer,
    instances: InstanceManager,
    motion: MotionSettings,
    globals: BatchGlobals,
    gpu_mirror: Option<GpuMirror>,
    elapsed: f32,
}

impl DemoState {
    pub fn new(scene: SceneConfig, render_config: RenderConfig) -> anyhow::Result<Self> {
        if scene.meshes.is_empty() {
            return Err(InstancingError::EmptyMeshes.into());
        }
        if scene.materials.is_empty() {
            return Err(InstancingError::EmptyMaterials.into());
        }

        let mut renderer = HeadlessRenderer::new();
        let mesh_ids: Vec<MeshId> = scene
            .meshes
            .iter()
            .map(|mesh| renderer.register_mesh(mesh))
            .collect();
        let material_ids: Vec<MaterialId> = scene
            .materials
            .iter()
            .map(|material| renderer.register_material(material))
            .collect();

        let gpu_mirror_requested = render_config.gpu_mirror;
        let mut instances = InstanceManager::new(render_config);
        spawn_instances(&scene, &mut instances, &mesh_ids, &material_ids)?;
        instances
            .build_batches(&mut renderer)
            .context("Failed to build instance batches")?;

        let motion = scene.motion_settings();
        instances.update(&motion, FrameTime::default());
        instances.upload()?;

        renderer.set_global_bounds(Aabb::new(Vec3::ZERO, Vec3::splat(GLOBAL_BOUNDS_EXTENT)));

        let gpu_mirror = if gpu_mirror_requested {
            match GpuContext::request_headless() {
                Ok(context) => Some(GpuMirror::new(context, &instances)),
                Err(error) => {
                    log::warn!("{error:#}, running CPU-only");
                    None
                }
            }
        } else {
            None
        };

        log::info!(
            "Spawned {} instances in {} draw keys and {} batches",
            instances.total_instances(),
            instances.group_count(),
            renderer.batch_count()
        );

        Ok(Self {
            camera: scene.camera,
            aspect_ratio: 16.0 / 9.0,
            renderer,
            instances,
            motion,
            globals: BatchGlobals::default(),
            gpu_mirror,
            elapsed: 0.0,
        })
    }

    pub fn instances(&self) -> &InstanceManager {
        &self.instances
    }

    pub fn renderer(&self) -> &HeadlessRenderer {
        &self.renderer
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn frustum(&self) -> Frustum {
        self.camera.frustum(self.aspect_ratio)
    }

    /// Update, upload, then let the renderer cull against the camera.
    pub fn step(&mut self, delta: f32) -> anyhow::Result<FrameStats> {
        let frustum = self.frustum();
        self.step_with_frustum(delta, &frustum)
    }

    pub fn step_with_frustum(
        &mut self,
        delta: f32,
        frustum: &Frustum,
    ) -> anyhow::Result<FrameStats> {
        self.elapsed += delta;
        let time = FrameTime {
            delta,
            elapsed: self.elapsed,
        };

        self.instances.update(&self.motion, time);
        self.instances.upload()?;

        if let Some(mirror) = &self.gpu_mirror {
            mirror.sync(&self.instances, &self.globals);
        }

        self.renderer.set_globals(&self.globals);
        let stats = self.renderer.render_frame(&self.instances, frustum)?;

        Ok(stats)
    }

    pub fn run(&mut self, frames: u32, delta: f32) -> anyhow::Result<Vec<FrameStats>> {
        (0..frames).map(|_| self.step(delta)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_round_trip_through_names() {
        for preset in ScenePreset::ALL {
            assert_eq!(preset.name().parse::<ScenePreset>().unwrap(), preset);
        }
        assert!("spinning-teapots".parse::<ScenePreset>().is_err());
    }

    #[test]
    fn single_cube_is_visible_every_frame() {
        let mut demo = DemoState::new(
            SceneConfig::preset(ScenePreset::SingleCube),
            RenderConfig::default(),
        )
        .unwrap();

        let stats = demo.run(3, 1.0 / 60.0).unwrap();
        assert_eq!(stats.len(), 3);
        assert!(stats
            .iter()
            .all(|frame| frame.draw_commands == 1 && frame.visible_instances == 1));
        assert_eq!(demo.renderer().batch_count(), 1);
        assert!(demo.renderer().globals().is_some());
    }

    #[test]
    fn multi_batch_scene_uses_several_draw_keys() {
        let mut scene = SceneConfig::preset(ScenePreset::MovingCubesMultiBatches);
        scene.instance_count = 500;

        let demo = DemoState::new(scene, RenderConfig::default()).unwrap();

        assert_eq!(demo.instances().total_instances(), 500);
        assert!(demo.instances().group_count() > 1);
        assert_eq!(
            demo.renderer().global_bounds(),
            Some(Aabb::new(Vec3::ZERO, Vec3::splat(GLOBAL_BOUNDS_EXTENT)))
        );
    }

    #[test]
    fn scenes_without_meshes_are_rejected() {
        let mut scene = SceneConfig::preset(ScenePreset::SingleCube);
        scene.meshes.clear();

        let error = DemoState::new(scene, RenderConfig::default()).err().unwrap();
        assert_eq!(
            error.downcast_ref::<InstancingError>(),
            Some(&InstancingError::EmptyMeshes)
        );
    }
}
