//! Particle field: per-tick update, trail bookkeeping and draw-list building.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use std::collections::VecDeque;

use crate::notes::{remap, Rgb};
use crate::params::FieldPhysics;

/// One retained {x, y, radius} snapshot of a particle's past positions
#[derive(Debug, Clone, Copy)]
pub struct TrailPoint {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

/// A live note particle
#[derive(Debug, Clone)]
pub struct Particle {
    /// Source pitch (Hz); fixed, kept for diagnostics
    pub frequency: f32,
    /// Source intensity (0-127); fixed
    pub velocity: f32,
    /// Current location in canvas pixels (origin top-left, y down)
    pub position: Vec2,
    /// Horizontal velocity in pixels per tick, decays toward 0
    pub drift: f32,
    /// Current radius in pixels, shrinks multiplicatively
    pub radius: f32,
    /// Hue fixed at creation
    pub color: Rgb,
    /// 0-255; linear fade, ≤0 means dead
    pub alpha: f32,
    /// Bounded FIFO of past snapshots, newest last
    pub trail: VecDeque<TrailPoint>,
}

impl Particle {
    /// Advance one animation tick.
    fn step(&mut self, physics: &FieldPhysics, canvas_width: f32) {
        self.position.y += physics.fall_speed_px;

        self.position.x += self.drift;
        self.drift *= physics.drift_decay;

        // Single-step reflection: the sign flips but the position is not
        // clamped, so a particle may sit off-canvas for one frame.
        if self.position.x < 0.0 || self.position.x > canvas_width {
            self.drift = -self.drift;
        }

        self.radius *= physics.shrink_rate;
        self.alpha -= physics.fade_per_tick;

        self.trail.push_back(TrailPoint {
            x: self.position.x,
            y: self.position.y,
            radius: self.radius,
        });
        if self.trail.len() > physics.trail_cap {
            self.trail.pop_front();
        }
    }

    pub fn is_dead(&self) -> bool {
        self.alpha <= 0.0
    }
}

/// Per-instance data for one filled circle (positions in canvas pixels)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct CircleInstance {
    pub center: [f32; 2],
    pub radius: f32,
    pub _padding: f32,
    /// RGBA, 0-1 scale, straight alpha
    pub color: [f32; 4],
}

fn circle(x: f32, y: f32, radius: f32, color: Rgb, alpha: f32) -> CircleInstance {
    CircleInstance {
        center: [x, y],
        radius,
        _padding: 0.0,
        color: [
            color[0] as f32 / 255.0,
            color[1] as f32 / 255.0,
            color[2] as f32 / 255.0,
            (alpha / 255.0).clamp(0.0, 1.0),
        ],
    }
}

/// Unordered collection of live particles, advanced once per frame
pub struct ParticleField {
    pub particles: Vec<Particle>,
    physics: FieldPhysics,
}

impl ParticleField {
    pub fn new(physics: FieldPhysics) -> Self {
        Self {
            particles: Vec::new(),
            physics,
        }
    }

    pub fn spawn(&mut self, particle: Particle) {
        self.particles.push(particle);
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Advance every particle one tick, then drop the dead ones.
    ///
    /// Two-phase: updates touch every particle in place, removal filters the
    /// collection afterwards, so deletion can't skip or double-process a
    /// neighbor the way index-shifting in-loop removal can.
    pub fn tick(&mut self, canvas_width: f32) {
        for particle in &mut self.particles {
            particle.step(&self.physics, canvas_width);
        }
        self.particles.retain(|p| !p.is_dead());
    }

    /// Build the frame's draw list, back-to-front per particle.
    ///
    /// Trail snapshots come first (oldest first, alpha ramping from 0 up to
    /// the particle's current alpha), then the particle itself at full current
    /// alpha. Particles appear in insertion order; the renderer draws
    /// instances in list order, which preserves that layering.
    pub fn instances(&self) -> Vec<CircleInstance> {
        let mut out = Vec::new();
        for particle in &self.particles {
            let trail_len = particle.trail.len() as f32;
            for (index, point) in particle.trail.iter().enumerate() {
                let alpha = remap(index as f32, 0.0, trail_len, 0.0, particle.alpha);
                out.push(circle(point.x, point.y, point.radius, particle.color, alpha));
            }
            out.push(circle(
                particle.position.x,
                particle.position.y,
                particle.radius,
                particle.color,
                particle.alpha,
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::key_to_frequency;
    use crate::notes::NoteFactory;
    use crate::params::{NoteMapping, ALPHA_OPAQUE};
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const CANVAS_W: f32 = 800.0;

    fn test_particle(x: f32, drift: f32, alpha: f32) -> Particle {
        Particle {
            frequency: 440.0,
            velocity: 100.0,
            position: Vec2::new(x, 0.0),
            drift,
            radius: 30.0,
            color: [255, 0, 0],
            alpha,
            trail: VecDeque::new(),
        }
    }

    fn spawned_field() -> (ParticleField, f32) {
        let factory = NoteFactory::new(NoteMapping::default());
        let mut rng = StdRng::seed_from_u64(3);
        let particle = factory.create(440.0, 100.0, CANVAS_W, &mut rng);
        let initial_radius = particle.radius;
        let mut field = ParticleField::new(FieldPhysics::default());
        field.spawn(particle);
        (field, initial_radius)
    }

    #[test]
    fn test_alpha_fades_linearly() {
        let (mut field, _) = spawned_field();
        for _ in 0..10 {
            field.tick(CANVAS_W);
        }
        assert_relative_eq!(
            field.particles[0].alpha,
            ALPHA_OPAQUE - 0.3 * 10.0,
            epsilon = 1e-3
        );
    }

    #[test]
    fn test_radius_shrinks_geometrically() {
        let (mut field, initial_radius) = spawned_field();
        for _ in 0..100 {
            field.tick(CANVAS_W);
        }
        assert_relative_eq!(
            field.particles[0].radius,
            initial_radius * 0.997f32.powi(100),
            epsilon = 1e-2
        );
    }

    #[test]
    fn test_trail_grows_then_saturates_at_cap() {
        let (mut field, _) = spawned_field();

        for tick in 1..=59usize {
            field.tick(CANVAS_W);
            assert_eq!(field.particles[0].trail.len(), tick);
        }

        for _ in 0..100 {
            field.tick(CANVAS_W);
        }
        let particle = &field.particles[0];
        assert_eq!(particle.trail.len(), 60);

        // 159 ticks total; the retained window is ticks 100..=159, so the
        // oldest snapshot was taken on tick 100 at y = 1.5 * 100.
        assert_relative_eq!(particle.trail[0].y, 1.5 * 100.0, epsilon = 1e-2);
        assert_relative_eq!(
            particle.trail.back().unwrap().y,
            1.5 * 159.0,
            epsilon = 1e-2
        );
    }

    #[test]
    fn test_downward_drift_is_constant() {
        let (mut field, _) = spawned_field();
        for _ in 0..4 {
            field.tick(CANVAS_W);
        }
        assert_relative_eq!(field.particles[0].position.y, 6.0, epsilon = 1e-4);
    }

    #[test]
    fn test_left_edge_crossing_flips_drift_sign() {
        let mut field = ParticleField::new(FieldPhysics::default());
        field.spawn(test_particle(0.2, -0.5, ALPHA_OPAQUE));

        field.tick(CANVAS_W);
        let particle = &field.particles[0];
        assert!(particle.position.x < 0.0, "position is not clamped");
        assert!(particle.drift > 0.0, "drift sign must flip on crossing");
    }

    #[test]
    fn test_right_edge_crossing_flips_drift_sign() {
        let mut field = ParticleField::new(FieldPhysics::default());
        field.spawn(test_particle(CANVAS_W - 0.2, 0.5, ALPHA_OPAQUE));

        field.tick(CANVAS_W);
        assert!(field.particles[0].drift < 0.0);
    }

    #[test]
    fn test_dead_particle_removal_keeps_the_survivor() {
        let mut field = ParticleField::new(FieldPhysics::default());
        field.spawn(test_particle(100.0, 0.0, 0.2)); // dies on the first tick
        field.spawn(test_particle(200.0, 0.0, ALPHA_OPAQUE));
        field.spawn(test_particle(300.0, 0.0, 0.1)); // dies on the first tick

        field.tick(CANVAS_W);

        assert_eq!(field.len(), 1);
        assert_relative_eq!(field.particles[0].position.x, 200.0, epsilon = 1e-4);
    }

    #[test]
    fn test_trail_alpha_ramps_from_transparent_to_current() {
        let (mut field, _) = spawned_field();
        field.tick(CANVAS_W);
        field.tick(CANVAS_W);

        let instances = field.instances();
        // Two trail snapshots plus the particle itself
        assert_eq!(instances.len(), 3);
        assert_eq!(instances[0].color[3], 0.0);
        assert!(instances[1].color[3] > instances[0].color[3]);
        let head = instances.last().unwrap();
        assert_relative_eq!(
            head.color[3],
            field.particles[0].alpha / 255.0,
            epsilon = 1e-4
        );
    }

    #[test]
    fn test_empty_field_ticks_and_draws_nothing() {
        let mut field = ParticleField::new(FieldPhysics::default());
        field.tick(CANVAS_W);
        assert!(field.is_empty());
        assert!(field.instances().is_empty());
    }

    /// End-to-end: the 'a' key is the domain minimum; its particle spawns at
    /// the left edge and has faded out of the field well within 860 ticks
    /// (255 / 0.3 = 850, plus float slack).
    #[test]
    fn test_lowest_key_note_lifecycle() {
        let frequency = key_to_frequency('a').unwrap();
        let factory = NoteFactory::new(NoteMapping::default());
        let mut rng = StdRng::seed_from_u64(11);
        let particle = factory.create(frequency, 100.0, CANVAS_W, &mut rng);

        assert_relative_eq!(particle.position.x, 0.0, epsilon = 1e-3);
        assert_eq!(particle.position.y, 0.0);
        assert!(particle.radius > 15.0 && particle.radius < 60.0);
        assert_eq!(particle.alpha, ALPHA_OPAQUE);

        let mut field = ParticleField::new(FieldPhysics::default());
        field.spawn(particle);

        for _ in 0..840 {
            field.tick(CANVAS_W);
        }
        assert_eq!(field.len(), 1, "still alive just before the fade bottom");

        for _ in 0..20 {
            field.tick(CANVAS_W);
        }
        assert!(field.is_empty(), "removed once alpha reaches 0");
    }
}
