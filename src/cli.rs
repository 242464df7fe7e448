//! Command-line argument parsing.

use clap::Parser;

use crate::params::{RenderConfig, SynthParams};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "Notefall")]
#[command(about = "Keyboard-driven falling-note visualizer", long_about = None)]
pub struct Args {
    /// Window width in pixels
    #[arg(long, value_name = "PIXELS")]
    pub width: Option<u32>,

    /// Window height in pixels
    #[arg(long, value_name = "PIXELS")]
    pub height: Option<u32>,

    /// Velocity assigned to keyboard notes (0-127)
    #[arg(long, value_name = "VELOCITY")]
    pub velocity: Option<f32>,

    /// Start with sound enabled instead of muted
    #[arg(long)]
    pub sound: bool,
}

impl Args {
    /// Render configuration with CLI overrides applied
    pub fn render_config(&self) -> RenderConfig {
        let mut config = RenderConfig::default();
        if let Some(width) = self.width {
            config.window_width = width;
        }
        if let Some(height) = self.height {
            config.window_height = height;
        }
        config
    }

    /// Synth parameters with CLI overrides applied
    pub fn synth_params(&self) -> SynthParams {
        let mut params = SynthParams::default();
        if let Some(velocity) = self.velocity {
            params.default_velocity = velocity.clamp(0.0, 127.0);
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_no_flags_given() {
        let args = Args::parse_from(["notefall"]);
        let config = args.render_config();
        assert_eq!(config.window_width, 1280);
        assert_eq!(config.window_height, 720);
        assert_eq!(args.synth_params().default_velocity, 100.0);
        assert!(!args.sound);
    }

    #[test]
    fn test_velocity_override_is_clamped_to_midi_range() {
        let args = Args::parse_from(["notefall", "--velocity", "300"]);
        assert_eq!(args.synth_params().default_velocity, 127.0);

        let args = Args::parse_from(["notefall", "--velocity=-5"]);
        assert_eq!(args.synth_params().default_velocity, 0.0);
    }
}
