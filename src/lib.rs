pub mod asset;
pub mod clock;
pub mod config;
pub mod gui;
pub mod perf;
pub mod renderer;
pub mod state;
pub mod winit;

pub use egui;
pub use egui_wgpu;
