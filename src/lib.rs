//! Notefall library - keyboard-driven falling-note visualizer

pub mod audio;
pub mod cli;
pub mod field;
pub mod input;
pub mod notes;
pub mod params;
pub mod rendering;
