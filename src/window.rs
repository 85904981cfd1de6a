use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::ActiveEventLoop,
    window::{Window, WindowId},
};

use crate::camera::OrbitCamera;
use crate::config::SceneConfig;
use crate::error::RunError;
use crate::gpu::{FrameInput, GpuState};
use crate::grid::ParticleGrid;
use crate::input::Action;
use crate::sky::Cubemap;
use crate::time::Time;

const TITLE: &str = "Metaball Particles";

/// Window and GPU lifecycle driven by winit.
pub struct App {
    config: SceneConfig,
    grid: ParticleGrid,
    sky: Cubemap,
    window: Option<Arc<Window>>,
    gpu_state: Option<GpuState>,
    camera: OrbitCamera,
    time: Time,
    mouse_pressed: bool,
    last_mouse_pos: Option<(f64, f64)>,
    last_title_frame: u64,
    error: Option<RunError>,
}

impl App {
    pub fn new(config: SceneConfig, grid: ParticleGrid, sky: Cubemap) -> Self {
        Self {
            config,
            grid,
            sky,
            window: None,
            gpu_state: None,
            camera: OrbitCamera::new(),
            time: Time::new(),
            mouse_pressed: false,
            last_mouse_pos: None,
            last_title_frame: 0,
            error: None,
        }
    }

    /// The error that stopped the event loop, if any.
    pub fn take_error(&mut self) -> Option<RunError> {
        self.error.take()
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: RunError) {
        log::error!("{}", error);
        self.error = Some(error);
        event_loop.exit();
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<(), RunError> {
        let window_attrs = Window::default_attributes()
            .with_title(TITLE)
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.config.window_width,
                self.config.window_height,
            ));

        let window = Arc::new(event_loop.create_window(window_attrs)?);
        let gpu_state = pollster::block_on(GpuState::new(
            window.clone(),
            &self.config,
            self.grid,
            &self.sky,
            rand::random(),
        ))?;

        self.window = Some(window);
        self.gpu_state = Some(gpu_state);
        Ok(())
    }

    fn handle_action(&mut self, event_loop: &ActiveEventLoop, action: Action) {
        match action {
            Action::Quit => event_loop.exit(),
            Action::TogglePause => {
                self.time.toggle_pause();
                log::info!("{}", if self.time.is_paused() { "Paused" } else { "Resumed" });
            }
            Action::ResetParticles => {
                if let Some(gpu_state) = &mut self.gpu_state {
                    gpu_state.reset_particles(rand::random());
                    log::info!("Particles re-seeded");
                }
            }
            _ => {
                action.apply(&mut self.config);
            }
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        self.time.update();
        if self.config.auto_orbit && !self.time.is_paused() {
            self.camera.follow_auto_orbit(self.time.frame());
        }

        let Some(gpu_state) = &mut self.gpu_state else {
            return;
        };

        let input = FrameInput {
            config: &self.config,
            camera: &self.camera,
            time: self.time.elapsed(),
            simulate: !self.time.is_paused(),
        };

        match gpu_state.render(&input) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost, reconfiguring");
                gpu_state.resize(winit::dpi::PhysicalSize {
                    width: gpu_state.config.width,
                    height: gpu_state.config.height,
                });
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("GPU out of memory");
                event_loop.exit();
            }
            Err(e) => log::warn!("Render error: {:?}", e),
        }

        if let Some(window) = &self.window {
            let frame = self.time.frame();
            if frame >= self.last_title_frame + 30 {
                self.last_title_frame = frame;
                window.set_title(&format!("{} - {:.0} FPS", TITLE, self.time.fps()));
            }
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.init(event_loop) {
                self.fail(event_loop, e);
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                if let Some(gpu_state) = &mut self.gpu_state {
                    gpu_state.resize(physical_size);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let Some(action) = Action::from_event(&event) {
                    self.handle_action(event_loop, action);
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if button == MouseButton::Left {
                    self.mouse_pressed = state == ElementState::Pressed;
                    if !self.mouse_pressed {
                        self.last_mouse_pos = None;
                    }
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                // Manual orbit only while the automatic orbit is off
                if self.mouse_pressed && !self.config.auto_orbit {
                    if let Some((last_x, last_y)) = self.last_mouse_pos {
                        self.camera
                            .rotate((position.x - last_x) as f32, (position.y - last_y) as f32);
                    }
                    self.last_mouse_pos = Some((position.x, position.y));
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 * 0.1,
                };
                if !self.config.auto_orbit {
                    self.camera.zoom(scroll);
                }
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}
