use std::cell::RefCell;
use std::rc::Rc;

use glam::{Vec2, Vec3};
use wgpu::{Device, Queue};

use super::physics::{GlyphPose, PhysicsSystem};
use crate::config::{MaterialConfig, SceneConfig};
use crate::model::{Camera, GlyphSequence};
use crate::utils::{cuboid_transform, InstanceRaw};
use crate::view::RenderState;

/// Longest frame the simulation will catch up on
const MAX_FRAME_DT: f32 = 0.1;

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub eye: [f32; 4],
}

impl CameraUniform {
    pub fn from_camera(camera: &Camera) -> Self {
        Self {
            view_proj: camera.view_proj().to_cols_array_2d(),
            eye: camera.eye.extend(1.0).to_array(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightingUniform {
    pub sun_dir: [f32; 3],
    pub sun_intensity: f32,
    pub ambient: f32,
    pub env_intensity: f32,
    pub _pad: [f32; 2],
}

impl Default for LightingUniform {
    fn default() -> Self {
        let sun_dir = Vec3::new(-0.4, 1.0, 0.6).normalize();
        Self {
            sun_dir: sun_dir.to_array(),
            sun_intensity: 0.8,
            ambient: 0.25,
            env_intensity: 1.6,
            _pad: [0.0; 2],
        }
    }
}

/// Screen-space text for one glyph, in physical pixels
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphLabel {
    pub text: String,
    pub screen: Vec2,
    pub size: f32,
}

/// What the overlay needs to know about the frame that was just simulated
#[derive(Debug, Clone, Default)]
pub struct FrameSnapshot {
    pub labels: Vec<GlyphLabel>,
    pub live: usize,
    pub limit: usize,
    pub fps: f32,
}

/// Averages frame rate over roughly one second
#[derive(Debug, Default)]
struct FpsCounter {
    fps: f32,
    frame_count: u32,
    timer: f32,
}

impl FpsCounter {
    fn tick(&mut self, dt: f32) -> f32 {
        self.frame_count += 1;
        self.timer += dt;
        if self.timer >= 1.0 {
            self.fps = self.frame_count as f32 / self.timer;
            self.frame_count = 0;
            self.timer = 0.0;
        }
        self.fps
    }
}

/// Per-frame state shared by the web and native shells.
///
/// The sequence sits behind `Rc<RefCell<_>>` so key handlers can mutate it
/// between frames; the frame loop only reads it.
pub struct FrameLoopContext {
    pub camera: Camera,
    pub sequence: Rc<RefCell<GlyphSequence>>,
    pub physics: PhysicsSystem,
    pub lighting: LightingUniform,
    pub glyph_material: MaterialConfig,
    fps: FpsCounter,
}

impl FrameLoopContext {
    pub fn new(config: &SceneConfig, width: u32, height: u32) -> Self {
        Self {
            camera: Camera::new(&config.camera, width, height),
            sequence: Rc::new(RefCell::new(GlyphSequence::new(config))),
            physics: PhysicsSystem::new(config),
            lighting: LightingUniform::default(),
            glyph_material: config.material,
            fps: FpsCounter::default(),
        }
    }

    /// Reconcile bodies with the sequence, step the world and return poses
    pub fn advance(&mut self, dt: f32) -> Vec<GlyphPose> {
        let sequence = self.sequence.borrow();
        self.physics.sync(&*sequence);
        self.physics.step(dt.clamp(0.0, MAX_FRAME_DT));
        self.physics.glyph_poses(&*sequence)
    }

    pub fn instances(&self, poses: &[GlyphPose]) -> Vec<InstanceRaw> {
        let half_extents = self.physics.glyph_half_extents();
        poses
            .iter()
            .map(|pose| InstanceRaw::new(cuboid_transform(pose.transform, half_extents), &self.glyph_material))
            .collect()
    }

    /// Project poses to labels; glyphs behind the camera get none
    pub fn labels(&self, poses: &[GlyphPose], width: u32, height: u32) -> Vec<GlyphLabel> {
        let (w, h) = (width.max(1) as f32, height.max(1) as f32);
        let glyph_height = self.physics.glyph_half_extents().y * 2.0;
        poses
            .iter()
            .filter_map(|pose| {
                let screen = self.camera.project(pose.position, w, h)?;
                let size = self.camera.pixels_per_unit(pose.position, h) * glyph_height * 0.7;
                Some(GlyphLabel { text: pose.label.clone(), screen, size })
            })
            .collect()
    }

    /// Run one frame of simulation and upload its results
    pub fn update(&mut self, dt: f32, device: &Device, queue: &Queue, render_state: &mut RenderState) -> FrameSnapshot {
        let fps = self.fps.tick(dt);

        let (width, height) = (render_state.width(), render_state.height());
        self.camera.set_aspect(width, height);

        let poses = self.advance(dt);
        render_state.write_glyphs(device, queue, &self.instances(&poses));
        render_state.write_camera(queue, &CameraUniform::from_camera(&self.camera));
        render_state.write_lighting(queue, &self.lighting);

        let sequence = self.sequence.borrow();
        FrameSnapshot {
            labels: self.labels(&poses, width, height),
            live: sequence.len(),
            limit: sequence.limit(),
            fps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Command;

    fn context() -> FrameLoopContext {
        FrameLoopContext::new(&SceneConfig::default(), 800, 600)
    }

    #[test]
    fn test_uniform_sizes_match_shader() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 80);
        assert_eq!(std::mem::size_of::<LightingUniform>(), 32);
    }

    #[test]
    fn test_advance_follows_sequence() {
        let mut ctx = context();
        for ch in "hi".chars() {
            ctx.sequence.borrow_mut().apply(Command::Spawn(ch));
        }
        let poses = ctx.advance(1.0 / 60.0);
        assert_eq!(poses.len(), 2);
        assert_eq!(ctx.physics.glyph_body_count(), 2);

        ctx.sequence.borrow_mut().apply(Command::DeleteLast);
        let poses = ctx.advance(1.0 / 60.0);
        assert_eq!(poses.len(), 1);
        assert_eq!(poses[0].label, "H");
        assert_eq!(ctx.physics.glyph_body_count(), 1);

        ctx.sequence.borrow_mut().apply(Command::Clear);
        assert!(ctx.advance(1.0 / 60.0).is_empty());
        assert_eq!(ctx.physics.glyph_body_count(), 0);
    }

    #[test]
    fn test_long_frames_are_clamped() {
        let mut ctx = context();
        ctx.sequence.borrow_mut().apply(Command::Spawn('x'));
        let start = ctx.advance(0.0)[0].position;
        let after = ctx.advance(30.0)[0].position;
        // A few substeps at most, nowhere near the ground yet
        assert!(after.y < start.y);
        assert!(after.y > start.y - 5.0);
    }

    #[test]
    fn test_one_instance_and_label_per_pose() {
        let mut ctx = context();
        for ch in "abc".chars() {
            ctx.sequence.borrow_mut().apply(Command::Spawn(ch));
        }
        let poses = ctx.advance(1.0 / 60.0);
        assert_eq!(ctx.instances(&poses).len(), 3);

        let labels = ctx.labels(&poses, 800, 600);
        let texts: Vec<&str> = labels.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, ["A", "B", "C"]);
        assert!(labels.iter().all(|l| l.size > 0.0));
    }

    #[test]
    fn test_fps_counter_averages_over_a_second() {
        let mut fps = FpsCounter::default();
        let mut last = 0.0;
        for _ in 0..61 {
            last = fps.tick(1.0 / 60.0);
        }
        assert!((last - 60.0).abs() < 2.0, "fps {last}");
    }
}
