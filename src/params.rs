//! Parameter definitions with units and documented semantics.
//!
//! All of the toy's magic numbers live here with:
//! - Units (Hz, canvas pixels, alpha steps per tick)
//! - Documented ranges and meanings
//! - One shared pitch domain so note placement, color selection and the
//!   key table cannot drift apart

/// Lowest mapped pitch (C4), first entry of the key table
pub const PITCH_LOW_HZ: f32 = 261.63;

/// Highest mapped pitch (E5), last entry of the key table
pub const PITCH_HIGH_HZ: f32 = 659.26;

/// Fully opaque alpha; particles are born at this value and fade to 0
pub const ALPHA_OPAQUE: f32 = 255.0;

/// Mapping from note events to initial particle attributes
#[derive(Debug, Clone)]
pub struct NoteMapping {
    /// Lower end of the pitch domain (Hz), maps to x = 0
    pub pitch_min_hz: f32,

    /// Upper end of the pitch domain (Hz), maps to x = canvas width
    pub pitch_max_hz: f32,

    /// Maximum velocity value (MIDI convention)
    pub velocity_max: f32,

    /// Radius at velocity 0 (canvas pixels)
    pub radius_min_px: f32,

    /// Radius at maximum velocity (canvas pixels)
    pub radius_max_px: f32,

    /// Initial horizontal drift is uniform in ±this (pixels per tick)
    pub drift_range_px: f32,
}

impl Default for NoteMapping {
    fn default() -> Self {
        Self {
            pitch_min_hz: PITCH_LOW_HZ,
            pitch_max_hz: PITCH_HIGH_HZ,
            velocity_max: 127.0,
            radius_min_px: 15.0,
            radius_max_px: 60.0,
            drift_range_px: 1.0,
        }
    }
}

/// Per-tick physics applied to every live particle
#[derive(Debug, Clone)]
pub struct FieldPhysics {
    /// Constant downward drift (pixels per tick)
    pub fall_speed_px: f32,

    /// Horizontal drift multiplier per tick (exponential decay toward 0)
    pub drift_decay: f32,

    /// Radius multiplier per tick (multiplicative shrink)
    pub shrink_rate: f32,

    /// Alpha subtracted per tick (linear fade; ≤0 means dead)
    pub fade_per_tick: f32,

    /// Trail ring length; oldest snapshot is evicted past this
    pub trail_cap: usize,
}

impl Default for FieldPhysics {
    fn default() -> Self {
        Self {
            fall_speed_px: 1.5,
            drift_decay: 0.99,
            shrink_rate: 0.997,
            fade_per_tick: 0.3,
            trail_cap: 60,
        }
    }
}

/// Synth voice parameters
#[derive(Debug, Clone)]
pub struct SynthParams {
    /// Velocity assigned to keyboard-origin notes (MIDI scale, 0-127)
    pub default_velocity: f32,

    /// Note length in seconds (percussive, fire-and-forget)
    pub note_duration_s: f32,

    /// Linear attack before the decay phase (seconds)
    pub attack_s: f32,

    /// Master gain applied after voice mixing
    pub master_gain: f32,
}

impl Default for SynthParams {
    fn default() -> Self {
        Self {
            default_velocity: 100.0,
            note_duration_s: 0.3,
            attack_s: 0.005,
            master_gain: 0.2,
        }
    }
}

/// Rendering configuration
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Window width (pixels)
    pub window_width: u32,

    /// Window height (pixels)
    pub window_height: u32,

    /// Alpha of the black fullscreen fade drawn over the previous frame
    /// (0-1 scale; 20/255 leaves a slow afterglow behind moving circles)
    pub fade_alpha: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            window_width: 1280,
            window_height: 720,
            fade_alpha: 20.0 / 255.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_mapping_domain_matches_shared_constants() {
        let mapping = NoteMapping::default();
        assert_eq!(mapping.pitch_min_hz, PITCH_LOW_HZ);
        assert_eq!(mapping.pitch_max_hz, PITCH_HIGH_HZ);
        assert!(mapping.pitch_min_hz < mapping.pitch_max_hz);
    }

    #[test]
    fn test_fade_alpha_is_a_valid_blend_factor() {
        let config = RenderConfig::default();
        assert!(config.fade_alpha > 0.0 && config.fade_alpha < 1.0);
    }
}
