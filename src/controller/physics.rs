use std::collections::HashMap;

use glam::{EulerRot, Mat4, Quat, Vec3};
use rapier3d::na::{Isometry3, Quaternion, Translation3, UnitQuaternion, Vector3};
use rapier3d::prelude::{
    CCDSolver, ColliderBuilder, ColliderSet, DefaultBroadPhase, ImpulseJointSet,
    IntegrationParameters, IslandManager, MultibodyJointSet, NarrowPhase, PhysicsPipeline,
    RigidBodyBuilder, RigidBodyHandle, RigidBodySet,
};

use super::reconcile;
use crate::config::{GlyphBodyConfig, SceneConfig, StaticCuboid};
use crate::model::{Glyph, GlyphId, GlyphSequence};

/// Rigid body simulation of the glyphs and the arena they fall into.
///
/// Bodies are keyed by glyph id. The physics side never mutates the
/// sequence; it follows it through [`PhysicsSystem::sync`].
pub struct PhysicsSystem {
    gravity: Vector3<f32>,
    params: IntegrationParameters,
    max_substeps: u32,
    accumulator: f32,
    glyph_body: GlyphBodyConfig,

    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,

    glyph_bodies: HashMap<GlyphId, RigidBodyHandle>,
}

/// Bodies touched by one [`PhysicsSystem::sync`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub created: usize,
    pub destroyed: usize,
}

/// World transform of a live glyph
#[derive(Debug, Clone)]
pub struct GlyphPose {
    pub id: GlyphId,
    pub label: String,
    pub position: Vec3,
    pub transform: Mat4,
}

impl PhysicsSystem {
    pub fn new(config: &SceneConfig) -> Self {
        let g = config.physics.gravity;
        let params = IntegrationParameters {
            dt: config.physics.timestep,
            ..Default::default()
        };

        let mut colliders = ColliderSet::new();
        let arena = &config.arena;
        for cuboid in std::iter::once(&arena.ground).chain(arena.walls.iter()) {
            colliders.insert(static_collider(cuboid));
        }

        Self {
            gravity: Vector3::new(g.x, g.y, g.z),
            params,
            max_substeps: config.physics.max_substeps.max(1),
            accumulator: 0.0,
            glyph_body: config.glyph_body,
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders,
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            glyph_bodies: HashMap::new(),
        }
    }

    /// Create bodies for new glyphs and remove bodies whose glyph is gone
    pub fn sync<R: rand::Rng>(&mut self, sequence: &GlyphSequence<R>) -> SyncReport {
        let diff = reconcile::diff(self.glyph_bodies.keys().copied(), sequence);
        if diff.is_empty() {
            return SyncReport::default();
        }

        for id in &diff.destroy {
            if let Some(handle) = self.glyph_bodies.remove(id) {
                self.bodies.remove(
                    handle,
                    &mut self.islands,
                    &mut self.colliders,
                    &mut self.impulse_joints,
                    &mut self.multibody_joints,
                    true,
                );
            }
        }
        for glyph in &diff.create {
            let handle = self.insert_glyph(glyph);
            self.glyph_bodies.insert(glyph.id, handle);
        }

        let report = SyncReport {
            created: diff.create.len(),
            destroyed: diff.destroy.len(),
        };
        tracing::trace!(?report, bodies = self.glyph_bodies.len(), "synced glyph bodies");
        report
    }

    fn insert_glyph(&mut self, glyph: &Glyph) -> RigidBodyHandle {
        let s = &glyph.spawn;
        let q = Quat::from_euler(EulerRot::XYZ, s.rotation.x, s.rotation.y, s.rotation.z);
        let rotation = UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z));
        let position = Isometry3::from_parts(
            Translation3::new(s.position.x, s.position.y, s.position.z),
            rotation,
        );

        let body = RigidBodyBuilder::dynamic()
            .position(position)
            .linvel(Vector3::new(s.velocity.x, s.velocity.y, s.velocity.z))
            .ccd_enabled(true)
            .build();
        let handle = self.bodies.insert(body);

        let he = self.glyph_body.half_extents;
        let collider = ColliderBuilder::cuboid(he.x, he.y, he.z)
            .mass(self.glyph_body.mass)
            .restitution(self.glyph_body.restitution)
            .build();
        self.colliders.insert_with_parent(collider, handle, &mut self.bodies);

        handle
    }

    /// Advance by `dt` seconds of wall time using fixed steps.
    /// Returns the number of steps taken.
    pub fn step(&mut self, dt: f32) -> u32 {
        let fixed = self.params.dt;
        let budget = fixed * self.max_substeps as f32;
        self.accumulator = (self.accumulator + dt.max(0.0)).min(budget);

        let mut steps = 0;
        while self.accumulator >= fixed && steps < self.max_substeps {
            self.pipeline.step(
                &self.gravity,
                &self.params,
                &mut self.islands,
                &mut self.broad_phase,
                &mut self.narrow_phase,
                &mut self.bodies,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                &mut self.ccd_solver,
                None,
                &(),
                &(),
            );
            self.accumulator -= fixed;
            steps += 1;
        }
        steps
    }

    /// Poses of the live glyphs that have a body, in sequence order
    pub fn glyph_poses<R: rand::Rng>(&self, sequence: &GlyphSequence<R>) -> Vec<GlyphPose> {
        sequence
            .iter()
            .filter_map(|glyph| {
                let handle = self.glyph_bodies.get(&glyph.id)?;
                let iso = self.bodies.get(*handle)?.position();
                let t = iso.translation.vector;
                let r = iso.rotation;
                let position = Vec3::new(t.x, t.y, t.z);
                let rotation = Quat::from_xyzw(r.i, r.j, r.k, r.w);
                Some(GlyphPose {
                    id: glyph.id,
                    label: glyph.label(),
                    position,
                    transform: Mat4::from_rotation_translation(rotation, position),
                })
            })
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn body_position(&self, id: GlyphId) -> Option<Vec3> {
        let handle = self.glyph_bodies.get(&id)?;
        let t = self.bodies.get(*handle)?.translation();
        Some(Vec3::new(t.x, t.y, t.z))
    }

    pub fn glyph_body_count(&self) -> usize {
        self.glyph_bodies.len()
    }

    pub fn glyph_half_extents(&self) -> Vec3 {
        self.glyph_body.half_extents
    }
}

fn static_collider(cuboid: &StaticCuboid) -> rapier3d::prelude::Collider {
    let (c, he) = (cuboid.center, cuboid.half_extents);
    ColliderBuilder::cuboid(he.x, he.y, he.z)
        .translation(Vector3::new(c.x, c.y, c.z))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const FRAME: f32 = 1.0 / 60.0;

    fn setup(limit: usize) -> (PhysicsSystem, GlyphSequence<StdRng>) {
        let config = SceneConfig::default();
        let physics = PhysicsSystem::new(&config);
        let seq = GlyphSequence::with_rng(limit, config.spawn, StdRng::seed_from_u64(99));
        (physics, seq)
    }

    fn run(physics: &mut PhysicsSystem, seconds: f32) {
        let frames = (seconds / FRAME).round() as usize;
        for _ in 0..frames {
            physics.step(FRAME);
        }
    }

    #[test]
    fn test_arena_has_static_colliders_only() {
        let (physics, _) = setup(10);
        assert_eq!(physics.colliders.len(), 5);
        assert_eq!(physics.bodies.len(), 0);
    }

    #[test]
    fn test_sync_creates_body_at_spawn_position() {
        let (mut physics, mut seq) = setup(10);
        let id = seq.spawn('a').unwrap();

        let report = physics.sync(&seq);
        assert_eq!(report, SyncReport { created: 1, destroyed: 0 });
        assert_eq!(physics.glyph_body_count(), 1);

        let spawn = seq.get(0).unwrap().spawn.position;
        let pos = physics.body_position(id).unwrap();
        assert!((pos - spawn).length() < 1e-4);

        assert_eq!(physics.sync(&seq), SyncReport::default());
    }

    #[test]
    fn test_glyph_falls_and_lands_inside_arena() {
        let (mut physics, mut seq) = setup(10);
        let id = seq.spawn('g').unwrap();
        physics.sync(&seq);
        let start = physics.body_position(id).unwrap();

        run(&mut physics, 0.25);
        let falling = physics.body_position(id).unwrap();
        assert!(falling.y < start.y);

        run(&mut physics, 5.0);
        let rest = physics.body_position(id).unwrap();
        let ground_top = SceneConfig::default().arena.ground.top();
        assert!(rest.y > ground_top - 0.1, "fell through the ground: {rest:?}");
        assert!(rest.y < start.y);
        assert!(rest.x.abs() < 29.0 && rest.z > -29.0 && rest.z < 9.0, "left the arena: {rest:?}");
    }

    #[test]
    fn test_clear_and_eviction_destroy_bodies() {
        let (mut physics, mut seq) = setup(3);
        for ch in "abc".chars() {
            seq.spawn(ch);
        }
        physics.sync(&seq);
        let oldest = seq.get(0).unwrap().id;

        seq.spawn('d');
        assert_eq!(physics.sync(&seq), SyncReport { created: 1, destroyed: 1 });
        assert!(physics.body_position(oldest).is_none());
        assert_eq!(physics.bodies.len(), 3);

        seq.clear();
        assert_eq!(physics.sync(&seq), SyncReport { created: 0, destroyed: 3 });
        assert_eq!(physics.bodies.len(), 0);
        assert_eq!(physics.colliders.len(), 5);
    }

    #[test]
    fn test_poses_follow_sequence_order() {
        let (mut physics, mut seq) = setup(10);
        for ch in "xyz".chars() {
            seq.spawn(ch);
        }
        physics.sync(&seq);
        run(&mut physics, 0.1);

        let labels: Vec<String> = physics.glyph_poses(&seq).into_iter().map(|p| p.label).collect();
        assert_eq!(labels, ["X", "Y", "Z"]);
    }

    #[test]
    fn test_unsynced_glyphs_have_no_pose() {
        let (physics, mut seq) = setup(10);
        seq.spawn('q');
        assert!(physics.glyph_poses(&seq).is_empty());
    }

    #[test]
    fn test_step_is_bounded_per_frame() {
        let (mut physics, _) = setup(1);
        assert_eq!(physics.step(10.0), 4);
        assert_eq!(physics.step(0.0), 0);
        assert_eq!(physics.step(FRAME * 1.01), 1);
        assert_eq!(physics.step(-1.0), 0);
    }
}
