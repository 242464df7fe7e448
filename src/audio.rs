//! Audio synthesis system.
//!
//! A cpal output stream mixes a bank of fire-and-forget sine voices with a
//! percussive envelope. Note events push voices in from the main thread; the
//! callback mixes, limits and retires them.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::f32::consts::TAU;
use std::sync::{Arc, Mutex};

use crate::params::SynthParams;

/// One fire-and-forget note: sine oscillator under a percussive envelope
pub struct Voice {
    phase: f32,
    phase_step: f32,
    amplitude: f32,
    delay_remaining: usize,
    elapsed: usize,
    total: usize,
    attack: usize,
}

impl Voice {
    /// # Arguments
    /// * `frequency_hz` - Oscillator pitch
    /// * `normalized_velocity` - Amplitude scale in [0, 1]
    /// * `onset_delay_s` - Silence before the envelope starts
    /// * `duration_s` - Envelope length from onset to silence
    /// * `attack_s` - Linear ramp-up portion of the envelope
    /// * `sample_rate_hz` - Output stream sample rate
    pub fn new(
        frequency_hz: f32,
        normalized_velocity: f32,
        onset_delay_s: f32,
        duration_s: f32,
        attack_s: f32,
        sample_rate_hz: f32,
    ) -> Self {
        let total = (duration_s * sample_rate_hz).max(1.0) as usize;
        Self {
            phase: 0.0,
            phase_step: TAU * frequency_hz / sample_rate_hz,
            amplitude: normalized_velocity.clamp(0.0, 1.0),
            delay_remaining: (onset_delay_s * sample_rate_hz) as usize,
            elapsed: 0,
            total,
            attack: ((attack_s * sample_rate_hz) as usize).min(total),
        }
    }

    /// Produce the next mono sample. Yields exact zeros through the onset
    /// delay and after the envelope has run out.
    pub fn next_sample(&mut self) -> f32 {
        if self.delay_remaining > 0 {
            self.delay_remaining -= 1;
            return 0.0;
        }
        if self.finished() {
            return 0.0;
        }

        let envelope = percussive_env(self.elapsed, self.attack, self.total);
        let sample = self.phase.sin() * self.amplitude * envelope;

        self.phase += self.phase_step;
        if self.phase >= TAU {
            self.phase -= TAU;
        }
        self.elapsed += 1;

        sample
    }

    pub fn finished(&self) -> bool {
        self.delay_remaining == 0 && self.elapsed >= self.total
    }
}

/// Percussive envelope: linear attack, then linear decay to zero at `total`.
fn percussive_env(elapsed: usize, attack: usize, total: usize) -> f32 {
    if elapsed >= total {
        return 0.0;
    }
    if elapsed < attack {
        return elapsed as f32 / attack as f32;
    }
    1.0 - (elapsed - attack) as f32 / (total - attack).max(1) as f32
}

/// Safety limiter: hard clip to ±0.5 to prevent ear damage
fn limit(sample: f32) -> f32 {
    sample.clamp(-0.5, 0.5)
}

/// Voices shared between the main thread and the audio callback
struct VoiceBank {
    voices: Vec<Voice>,
    gain: f32,
}

impl VoiceBank {
    fn next_sample(&mut self) -> f32 {
        let mixed: f32 = self.voices.iter_mut().map(Voice::next_sample).sum();
        mixed * self.gain
    }

    fn retire_finished(&mut self) {
        self.voices.retain(|voice| !voice.finished());
    }
}

/// Audio system owning the output stream and the shared voice bank
pub struct AudioSystem {
    bank: Arc<Mutex<VoiceBank>>,
    stream: cpal::Stream,
    sample_rate_hz: f32,
    params: SynthParams,
}

impl AudioSystem {
    /// Build the output stream. The stream stays paused until [`activate`]
    /// runs; some platforms require a user gesture before sound.
    ///
    /// [`activate`]: AudioSystem::activate
    pub fn new(params: SynthParams) -> Result<Self, String> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or("No audio output device found")?;

        let config = device
            .default_output_config()
            .map_err(|e| format!("Failed to get audio config: {}", e))?;

        let sample_rate_hz = config.sample_rate().0 as f32;
        let channels = config.channels() as usize;

        log::info!(
            "Audio: {} @ {}Hz",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            config.sample_rate().0
        );

        let bank = Arc::new(Mutex::new(VoiceBank {
            voices: Vec::new(),
            gain: params.master_gain,
        }));
        let bank_clone = Arc::clone(&bank);

        let stream = device
            .build_output_stream(
                &config.into(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut bank = bank_clone.lock().unwrap();
                    for frame in data.chunks_mut(channels) {
                        let sample = limit(bank.next_sample());
                        for out in frame.iter_mut() {
                            *out = sample;
                        }
                    }
                    bank.retire_finished();
                },
                |err| log::error!("Audio stream error: {}", err),
                None,
            )
            .map_err(|e| format!("Failed to build audio stream: {}", e))?;

        Ok(Self {
            bank,
            stream,
            sample_rate_hz,
            params,
        })
    }

    /// Start the output stream. Required once before the first playback;
    /// harmless to call again.
    pub fn activate(&self) -> Result<(), String> {
        self.stream
            .play()
            .map_err(|e| format!("Failed to start audio stream: {}", e))
    }

    /// Queue a note. Fire-and-forget: the voice plays out and is retired by
    /// the callback.
    pub fn play(
        &self,
        frequency_hz: f32,
        normalized_velocity: f32,
        onset_delay_s: f32,
        duration_s: f32,
    ) {
        let voice = Voice::new(
            frequency_hz,
            normalized_velocity,
            onset_delay_s,
            duration_s,
            self.params.attack_s,
            self.sample_rate_hz,
        );
        self.bank.lock().unwrap().voices.push(voice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_percussive_env_shape() {
        let attack = 100;
        let total = 1000;

        assert_eq!(percussive_env(0, attack, total), 0.0);
        assert_relative_eq!(percussive_env(attack, attack, total), 1.0);
        assert_relative_eq!(percussive_env(total - 1, attack, total), 0.0, epsilon = 2e-3);
        assert_eq!(percussive_env(total, attack, total), 0.0);

        // Monotone decay after the attack
        let mut previous = percussive_env(attack, attack, total);
        for elapsed in (attack + 1)..total {
            let value = percussive_env(elapsed, attack, total);
            assert!(value <= previous);
            previous = value;
        }
    }

    #[test]
    fn test_voice_runs_for_its_duration_then_finishes() {
        let sample_rate = 1000.0;
        let mut voice = Voice::new(440.0, 1.0, 0.0, 0.3, 0.005, sample_rate);

        let mut produced = 0;
        while !voice.finished() {
            let sample = voice.next_sample();
            assert!(sample.abs() <= 1.0);
            produced += 1;
        }
        assert_eq!(produced, 300); // 0.3 s at 1 kHz
    }

    #[test]
    fn test_onset_delay_postpones_the_envelope() {
        let sample_rate = 1000.0;
        let mut voice = Voice::new(440.0, 1.0, 0.1, 0.3, 0.005, sample_rate);

        for _ in 0..100 {
            assert_eq!(voice.next_sample(), 0.0);
            assert!(!voice.finished());
        }

        // Past the delay the envelope opens and samples become nonzero
        let heard = (0..50).map(|_| voice.next_sample().abs()).fold(0.0, f32::max);
        assert!(heard > 0.0);
    }

    #[test]
    fn test_velocity_scales_amplitude() {
        let sample_rate = 1000.0;
        let mut loud = Voice::new(440.0, 1.0, 0.0, 0.3, 0.005, sample_rate);
        let mut soft = Voice::new(440.0, 0.25, 0.0, 0.3, 0.005, sample_rate);

        let loud_peak = (0..300).map(|_| loud.next_sample().abs()).fold(0.0, f32::max);
        let soft_peak = (0..300).map(|_| soft.next_sample().abs()).fold(0.0, f32::max);
        assert_relative_eq!(soft_peak, loud_peak * 0.25, epsilon = 1e-4);
    }

    #[test]
    fn test_limiter_clamps_to_half_scale() {
        assert_eq!(limit(2.0), 0.5);
        assert_eq!(limit(-3.0), -0.5);
        assert_eq!(limit(0.2), 0.2);
    }

    #[test]
    fn test_bank_mixes_and_retires_voices() {
        let sample_rate = 1000.0;
        let mut bank = VoiceBank {
            voices: vec![
                Voice::new(440.0, 1.0, 0.0, 0.1, 0.005, sample_rate),
                Voice::new(330.0, 1.0, 0.0, 0.2, 0.005, sample_rate),
            ],
            gain: 0.5,
        };

        for _ in 0..150 {
            bank.next_sample();
        }
        bank.retire_finished();
        assert_eq!(bank.voices.len(), 1, "shorter voice is retired");

        for _ in 0..100 {
            bank.next_sample();
        }
        bank.retire_finished();
        assert!(bank.voices.is_empty());
    }
}
