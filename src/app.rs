use std::sync::Arc;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalPosition};
use winit::event::WindowEvent;
use winit::event_loop::ActiveEventLoop;
use winit::window::{CursorGrabMode, Window, WindowId};

use crate::demo::{SpaceScene, SPACE_SCENE};
use crate::engine::Engine;
use crate::scene::{MachineStep, SceneMachine};
use crate::settings::EngineSettings;

pub struct App {
    settings: EngineSettings,
    window: Option<Arc<Window>>,
    engine: Option<Engine>,
    machine: SceneMachine<Engine>,
    last_frame: Instant,
    cursor_captured: bool,
}

impl App {
    pub fn new(settings: EngineSettings) -> Self {
        let mut machine = SceneMachine::new();
        machine.register(Box::new(SpaceScene::new()));
        machine.set_active(SPACE_SCENE);

        Self {
            settings,
            window: None,
            engine: None,
            machine,
            last_frame: Instant::now(),
            cursor_captured: false,
        }
    }

    fn apply_cursor_capture(&mut self, captured: bool) {
        if captured == self.cursor_captured {
            return;
        }
        let Some(window) = &self.window else {
            return;
        };
        if captured {
            if let Err(err) = window
                .set_cursor_grab(CursorGrabMode::Confined)
                .or_else(|_| window.set_cursor_grab(CursorGrabMode::Locked))
            {
                log::warn!("Cursor grab failed: {err}");
            }
            window.set_cursor_visible(false);
            let size = window.inner_size();
            let center = PhysicalPosition::new(size.width / 2, size.height / 2);
            if let Err(err) = window.set_cursor_position(center) {
                log::warn!("Cursor centering failed: {err}");
            }
        } else {
            if let Err(err) = window.set_cursor_grab(CursorGrabMode::None) {
                log::warn!("Cursor release failed: {err}");
            }
            window.set_cursor_visible(true);
        }
        self.cursor_captured = captured;
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = Window::default_attributes()
            .with_title("voidstrike")
            .with_inner_size(LogicalSize::new(
                self.settings.resolution.width,
                self.settings.resolution.height,
            ));
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .expect("create window"),
        );

        let engine = pollster::block_on(Engine::new(window.clone(), &self.settings));
        self.engine = Some(engine);
        self.last_frame = Instant::now();

        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        let Some(window) = &self.window else {
            return;
        };
        if window.id() != id {
            return;
        }
        let Some(engine) = self.engine.as_mut() else {
            return;
        };

        engine.input.handle_window_event(&event);

        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                engine.resize(size);
            }
            WindowEvent::ScaleFactorChanged { .. } => {
                let size = window.inner_size();
                engine.resize(size);
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = now - self.last_frame;
                self.last_frame = now;

                if engine.handle_toggles() {
                    event_loop.exit();
                    return;
                }
                let capture = engine.capture_cursor;

                if self.machine.advance(engine, dt.as_secs_f32()) == MachineStep::Exit {
                    event_loop.exit();
                    return;
                }

                engine.update(dt);
                if let Err(err) = engine.render() {
                    log::error!("Render failed: {err}");
                    event_loop.exit();
                    return;
                }

                self.apply_cursor_capture(capture);
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}
