//! Notefall - a keyboard-driven generative audio-visual toy
//!
//! Mapped keys trigger notes that fall as fading, drifting colored circles;
//! with sound enabled each note also plays a short synth voice.

mod audio;
mod cli;
mod field;
mod input;
mod notes;
mod params;
mod rendering;

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowId},
};

use audio::AudioSystem;
use cli::Args;
use field::ParticleField;
use input::{key_to_frequency, HeldKeys};
use notes::NoteFactory;
use params::{FieldPhysics, NoteMapping, RenderConfig, SynthParams};
use rendering::RenderSystem;

/// Main application state
struct App {
    // Window and rendering
    window: Option<Arc<Window>>,
    render_system: Option<RenderSystem>,

    // Simulation and input state
    field: ParticleField,
    factory: NoteFactory,
    held: HeldKeys,
    rng: StdRng,

    // Audio
    audio: Option<AudioSystem>,
    sound_enabled: bool,

    // Configuration
    render_config: RenderConfig,
    synth_params: SynthParams,
    start_with_sound: bool,
}

impl App {
    fn new(args: &Args) -> Self {
        Self {
            window: None,
            render_system: None,
            field: ParticleField::new(FieldPhysics::default()),
            factory: NoteFactory::new(NoteMapping::default()),
            held: HeldKeys::new(),
            rng: StdRng::from_entropy(),
            audio: None,
            sound_enabled: false,
            render_config: args.render_config(),
            synth_params: args.synth_params(),
            start_with_sound: args.sound,
        }
    }

    fn title(&self) -> String {
        let toggle_label = if self.sound_enabled {
            "Disable Sound"
        } else {
            "Enable Sound"
        };
        format!("Notefall - Space: {}", toggle_label)
    }
}

impl ApplicationHandler for App {
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }

        // Create window
        let window_attributes = Window::default_attributes()
            .with_title(self.title())
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.render_config.window_width,
                self.render_config.window_height,
            ));

        let window = Arc::new(event_loop.create_window(window_attributes).unwrap());

        // Initialize rendering system
        let render_system = pollster::block_on(RenderSystem::new(
            Arc::clone(&window),
            &self.render_config,
        ))
        .unwrap();

        // Initialize audio; the toy stays fully usable without a device
        let audio = match AudioSystem::new(self.synth_params.clone()) {
            Ok(audio) => Some(audio),
            Err(e) => {
                log::warn!("Audio unavailable, running silent: {}", e);
                None
            }
        };

        println!("\nNotefall is running!");
        println!("Play notes on A-; (home row) and W-P (sharps)");
        println!("Space toggles sound, ESC quits\n");

        self.window = Some(window);
        self.render_system = Some(render_system);
        self.audio = audio;

        if self.start_with_sound {
            self.toggle_sound();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(render_system) = &mut self.render_system {
                    render_system.resize(size.width, size.height);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                self.handle_key(event, event_loop);
            }
            WindowEvent::RedrawRequested => {
                self.render_frame();
            }
            _ => {}
        }
    }
}

impl App {
    fn handle_key(&mut self, event: KeyEvent, event_loop: &ActiveEventLoop) {
        let pressed = event.state == ElementState::Pressed;

        match event.logical_key.as_ref() {
            Key::Named(NamedKey::Escape) if pressed => event_loop.exit(),
            Key::Named(NamedKey::Space) if pressed && !event.repeat => self.toggle_sound(),
            Key::Character(text) => {
                if let Some(key) = text.chars().next() {
                    if pressed {
                        self.key_down(key);
                    } else {
                        self.held.release(key);
                    }
                }
            }
            _ => {}
        }
    }

    /// Key-down: spawn one particle per physical press. OS auto-repeat
    /// arrives as extra key-down events and is filtered by the held set.
    fn key_down(&mut self, key: char) {
        if !self.held.press(key) {
            return;
        }

        let Some(frequency) = key_to_frequency(key) else {
            return; // Unmapped key, silently ignored
        };

        let Some(ref render_system) = self.render_system else {
            return;
        };
        let (canvas_width, _) = render_system.canvas_size();

        let velocity = self.synth_params.default_velocity;
        let particle = self
            .factory
            .create(frequency, velocity, canvas_width, &mut self.rng);
        log::debug!(
            "note {:.2} Hz at x={:.1}, {} live",
            frequency,
            particle.position.x,
            self.field.len() + 1
        );
        self.field.spawn(particle);

        if self.sound_enabled {
            if let Some(ref audio) = self.audio {
                let normalized = velocity / self.factory.mapping().velocity_max;
                audio.play(frequency, normalized, 0.0, self.synth_params.note_duration_s);
            }
        }
    }

    fn toggle_sound(&mut self) {
        self.sound_enabled = !self.sound_enabled;

        // Platform audio wants an activation call before the first playback
        if self.sound_enabled {
            if let Some(ref audio) = self.audio {
                if let Err(e) = audio.activate() {
                    log::error!("Failed to activate audio: {}", e);
                }
            }
        }

        if let Some(window) = &self.window {
            window.set_title(&self.title());
        }
    }

    /// Advance and render a single frame
    fn render_frame(&mut self) {
        let Some(ref mut render_system) = self.render_system else {
            return;
        };

        // The field reads the current canvas width each tick, so a resize
        // simply takes effect on the next frame.
        let (canvas_width, _) = render_system.canvas_size();
        self.field.tick(canvas_width);

        let instances = self.field.instances();
        render_system.update_instances(&instances);

        match render_system.render() {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost) | Err(wgpu::SurfaceError::Outdated) => {
                let (width, height) = render_system.canvas_size();
                render_system.resize(width as u32, height as u32);
            }
            Err(e) => log::error!("Render error: {:?}", e),
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    println!("Notefall - falling-note audio-visual toy");
    println!("Initializing systems...");

    let mut app = App::new(&args);
    let event_loop = EventLoop::new().unwrap();
    let _ = event_loop.run_app(&mut app);
}
