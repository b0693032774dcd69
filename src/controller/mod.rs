// CONTROLLER: Key routing, physics and the per-frame update
pub mod input;
pub mod reconcile;
pub mod physics;
pub mod frame_loop;

pub use input::{InputRouter, KeyBindings, KeyInput, Routed};
pub use physics::{GlyphPose, PhysicsSystem, SyncReport};
pub use frame_loop::{CameraUniform, FrameLoopContext, FrameSnapshot, GlyphLabel, LightingUniform};
