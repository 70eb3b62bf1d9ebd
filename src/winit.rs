use std::sync::Arc;

use log::{debug, error};
use pollster::FutureExt;
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    error::EventLoopError,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Fullscreen, WindowAttributes, WindowId},
};

use crate::{
    config::ViewerConfig,
    state::{RenderResult, State},
};

pub struct App {
    config: ViewerConfig,
    state: Option<State>,
}

impl App {
    pub fn new(config: ViewerConfig) -> Self {
        Self {
            config,
            state: None,
        }
    }

    pub fn run(config: ViewerConfig) -> Result<(), EventLoopError> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Wait);
        let mut app = Self::new(config);
        event_loop.run_app(&mut app)
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        debug!("Resumed");
        if self.state.is_some() {
            return;
        }
        let attributes = WindowAttributes::default()
            .with_title("Animated Objects")
            .with_inner_size(LogicalSize::new(1280, 720));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                error!("Failed to create window: {}", err);
                event_loop.exit();
                return;
            }
        };
        match State::new(window.clone(), self.config.clone()).block_on() {
            Ok(mut state) => {
                state.setup_scene();
                window.request_redraw();
                self.state = Some(state);
            }
            Err(err) => {
                error!("{}", err);
                event_loop.exit();
            }
        }
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        debug!("Suspended");
        self.state = None;
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(state) = self.state.as_mut() else {
            debug!("Event received when state is none: {:?}", event);
            return;
        };

        match &event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
                return;
            }
            WindowEvent::RedrawRequested => {
                state.update();
                match state.render() {
                    RenderResult::Succeed | RenderResult::Skipped => (),
                    RenderResult::OutOfMemory => event_loop.exit(),
                }
                return;
            }
            WindowEvent::Resized(new_size) => {
                state.resize((new_size.width, new_size.height));
            }
            WindowEvent::KeyboardInput { event, .. } => match event.physical_key {
                PhysicalKey::Code(KeyCode::Escape) => {
                    event_loop.exit();
                    return;
                }
                PhysicalKey::Code(KeyCode::F11) => {
                    if !event.repeat && event.state == ElementState::Released {
                        let window = state.window();
                        if window.fullscreen().is_some() {
                            window.set_fullscreen(None)
                        } else {
                            window.set_fullscreen(Some(Fullscreen::Borderless(None)))
                        }
                    }
                    return;
                }
                PhysicalKey::Code(KeyCode::F10) => {
                    if !event.repeat && event.state == ElementState::Released {
                        let active = !state.panels_active();
                        state.set_panels_active(active);
                    }
                    return;
                }
                _ => (),
            },
            _ => (),
        }

        state.handle_window_event(&event);
    }
}
