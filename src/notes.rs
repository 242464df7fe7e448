//! Note factory: turns (frequency, velocity) events into renderable particles.
//!
//! Horizontal placement and color both interpolate over the shared pitch
//! domain, so a note's position and hue always agree.

use glam::Vec2;
use rand::Rng;
use std::collections::VecDeque;

use crate::field::Particle;
use crate::params::{NoteMapping, ALPHA_OPAQUE};

/// RGB color on the 0-255 scale
pub type Rgb = [u8; 3];

/// Fixed 12-entry palette, one hue per semitone of the mapped octave
pub const PALETTE: [Rgb; 12] = [
    [230, 25, 75],   // crimson
    [60, 180, 75],   // green
    [255, 225, 25],  // yellow
    [67, 99, 216],   // blue
    [245, 130, 49],  // orange
    [145, 30, 180],  // purple
    [70, 240, 240],  // cyan
    [240, 50, 230],  // magenta
    [188, 246, 12],  // lime
    [250, 190, 190], // pink
    [0, 128, 128],   // teal
    [230, 190, 255], // lavender
];

/// Linear interpolation of `value` from [in_min, in_max] to [out_min, out_max].
///
/// Values outside the input domain extrapolate; callers that need a bounded
/// result clamp afterwards.
pub fn remap(value: f32, in_min: f32, in_max: f32, out_min: f32, out_max: f32) -> f32 {
    out_min + (value - in_min) / (in_max - in_min) * (out_max - out_min)
}

/// Builds particles from note events
pub struct NoteFactory {
    mapping: NoteMapping,
}

impl NoteFactory {
    pub fn new(mapping: NoteMapping) -> Self {
        Self { mapping }
    }

    pub fn mapping(&self) -> &NoteMapping {
        &self.mapping
    }

    /// Select the palette entry for a pitch.
    ///
    /// The rounded index is clamped: a frequency a hair above the domain
    /// maximum would otherwise round to PALETTE.len() and index out of bounds.
    pub fn color_for(&self, frequency_hz: f32) -> Rgb {
        let top = (PALETTE.len() - 1) as f32;
        let index = remap(
            frequency_hz,
            self.mapping.pitch_min_hz,
            self.mapping.pitch_max_hz,
            0.0,
            top,
        )
        .round()
        .clamp(0.0, top);
        PALETTE[index as usize]
    }

    /// Create a particle for a note event.
    ///
    /// # Arguments
    /// * `frequency_hz` - Pitch in Hz; expected to come from the key table.
    ///   Out-of-domain values extrapolate off-canvas rather than clamping.
    /// * `velocity` - Intensity on the 0-127 scale, drives the initial radius
    /// * `canvas_width` - Current canvas width in pixels
    pub fn create(
        &self,
        frequency_hz: f32,
        velocity: f32,
        canvas_width: f32,
        rng: &mut impl Rng,
    ) -> Particle {
        let m = &self.mapping;
        let x = remap(frequency_hz, m.pitch_min_hz, m.pitch_max_hz, 0.0, canvas_width);
        let radius = remap(velocity, 0.0, m.velocity_max, m.radius_min_px, m.radius_max_px);

        Particle {
            frequency: frequency_hz,
            velocity,
            position: Vec2::new(x, 0.0),
            drift: rng.gen_range(-m.drift_range_px..=m.drift_range_px),
            radius,
            color: self.color_for(frequency_hz),
            alpha: ALPHA_OPAQUE,
            trail: VecDeque::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{PITCH_HIGH_HZ, PITCH_LOW_HZ};
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn factory() -> NoteFactory {
        NoteFactory::new(NoteMapping::default())
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_remap_is_linear_and_exact_at_endpoints() {
        assert_eq!(remap(0.0, 0.0, 1.0, 10.0, 20.0), 10.0);
        assert_eq!(remap(1.0, 0.0, 1.0, 10.0, 20.0), 20.0);
        assert_eq!(remap(0.5, 0.0, 1.0, 10.0, 20.0), 15.0);
        // No clamping: out-of-domain input extrapolates
        assert_eq!(remap(2.0, 0.0, 1.0, 0.0, 10.0), 20.0);
    }

    #[test]
    fn test_pitch_domain_endpoints_span_the_canvas() {
        let factory = factory();
        let mut rng = rng();

        let low = factory.create(PITCH_LOW_HZ, 100.0, 800.0, &mut rng);
        assert_relative_eq!(low.position.x, 0.0, epsilon = 1e-3);
        assert_eq!(low.position.y, 0.0);

        let high = factory.create(PITCH_HIGH_HZ, 100.0, 800.0, &mut rng);
        assert_relative_eq!(high.position.x, 800.0, epsilon = 1e-3);
    }

    #[test]
    fn test_velocity_maps_to_radius_endpoints() {
        let factory = factory();
        let mut rng = rng();

        let soft = factory.create(440.0, 0.0, 800.0, &mut rng);
        assert_relative_eq!(soft.radius, 15.0, epsilon = 1e-4);

        let loud = factory.create(440.0, 127.0, 800.0, &mut rng);
        assert_relative_eq!(loud.radius, 60.0, epsilon = 1e-4);
    }

    #[test]
    fn test_new_particle_starts_opaque_with_empty_trail() {
        let factory = factory();
        let particle = factory.create(440.0, 100.0, 800.0, &mut rng());

        assert_eq!(particle.alpha, ALPHA_OPAQUE);
        assert!(particle.trail.is_empty());
        assert!(particle.drift >= -1.0 && particle.drift <= 1.0);
    }

    #[test]
    fn test_palette_index_clamps_above_domain_maximum() {
        let factory = factory();

        // Float rounding near the top of the domain must not index past the
        // last palette entry.
        assert_eq!(factory.color_for(PITCH_HIGH_HZ), PALETTE[11]);
        assert_eq!(factory.color_for(PITCH_HIGH_HZ + 0.5), PALETTE[11]);
        assert_eq!(factory.color_for(PITCH_HIGH_HZ * 2.0), PALETTE[11]);
        assert_eq!(factory.color_for(PITCH_LOW_HZ), PALETTE[0]);
        assert_eq!(factory.color_for(PITCH_LOW_HZ / 2.0), PALETTE[0]);
    }

    #[test]
    fn test_mid_domain_pitch_picks_an_interior_hue() {
        let factory = factory();
        // A4 sits a bit under halfway through the domain
        assert_eq!(factory.color_for(440.0), PALETTE[5]);
    }
}
