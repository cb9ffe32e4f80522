use std::sync::Arc;

use glam::Vec3;
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::ActiveEventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use fogfx::error::{ConfigError, FogError, RenderError, RunError};
use fogfx::gpu::{pixel_to_ndc, GpuContext, GpuDepthTarget, WgpuScene};
use fogfx::{ConfigPatch, DemoConfig, DepthCompositor, FogEngine, FrameInput, FrameLoop, StopHandle};

/// Displacement per reference frame while the wind is on.
const WIND: Vec3 = Vec3::new(0.002, 0.0, 0.0);
const DENSITY_STEP: f32 = 5.0;

pub struct App {
    window: Option<Arc<Window>>,
    scene: Option<WgpuScene>,
    engine: FogEngine,
    compositor: DepthCompositor<GpuDepthTarget>,
    frames: FrameLoop,
    stop: StopHandle,
    mouse_pressed: bool,
    last_mouse_pos: Option<(f64, f64)>,
    cursor: Option<(f64, f64)>,
    source: Option<Vec3>,
    wind: bool,
    error: Option<RunError>,
}

impl App {
    pub fn new(config: DemoConfig) -> Result<Self, RunError> {
        let engine = FogEngine::new(config.fog).map_err(ConfigError::from)?;
        let compositor = DepthCompositor::new(config.water).map_err(ConfigError::from)?;
        let frames = FrameLoop::new();
        let stop = frames.stop_handle();
        Ok(Self {
            window: None,
            scene: None,
            engine,
            compositor,
            frames,
            stop,
            mouse_pressed: false,
            last_mouse_pos: None,
            cursor: None,
            source: None,
            wind: false,
            error: None,
        })
    }

    /// The error that ended the event loop, if any.
    pub fn take_error(&mut self) -> Option<RunError> {
        self.error.take()
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: RunError) {
        log::error!("{error}");
        self.error = Some(error);
        self.stop.stop();
        event_loop.exit();
    }

    fn handle_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Escape => self.stop.stop(),
            KeyCode::Space => {
                let paused = !self.engine.is_paused();
                self.engine.set_paused(paused);
                log::info!("{}", if paused { "paused" } else { "resumed" });
            }
            KeyCode::KeyF => {
                self.wind = !self.wind;
                log::info!("wind {}", if self.wind { "on" } else { "off" });
            }
            KeyCode::ArrowUp => self.change_density(DENSITY_STEP),
            KeyCode::ArrowDown => self.change_density(-DENSITY_STEP),
            _ => {}
        }
    }

    fn change_density(&mut self, step: f32) {
        let density = (self.engine.config().density + step).max(0.0);
        let patch = ConfigPatch {
            density: Some(density),
            ..Default::default()
        };
        match self.engine.apply_config(&patch) {
            Ok(_) => log::info!("density {density}"),
            Err(err) => log::warn!("density {density} rejected: {err}"),
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(delta) = self.frames.next_frame() else {
            event_loop.exit();
            return;
        };
        let Some(scene) = self.scene.as_mut() else {
            return;
        };

        // Resize check, then update, then render
        let result = self
            .compositor
            .sync_viewport(scene)
            .map_err(FogError::from)
            .and_then(|_| {
                if let Some((x, y)) = self.cursor {
                    let viewport = scene.context().viewport();
                    let ndc = pixel_to_ndc(x, y, viewport.width, viewport.height);
                    if let Some(hit) = scene.pick_ground(ndc) {
                        self.source = Some(hit);
                    }
                }

                let input = FrameInput {
                    source: self.source,
                    force: if self.wind { WIND } else { Vec3::ZERO },
                };
                let commands = self.engine.tick(delta, &input);
                self.engine.submit(&commands, scene.fog_mut())?;
                self.compositor
                    .frame(scene, self.engine.elapsed_ms())
                    .map(|_| ())
                    .map_err(FogError::from)
            });

        match result {
            Ok(()) => {}
            Err(FogError::Render(RenderError::ContextLost)) => {
                log::warn!("render context lost, rebuilding surface resources");
                self.engine.invalidate_surface();
                self.compositor.reset();
                self.frames.clock_mut().skip_gap();
            }
            Err(err @ FogError::Render(RenderError::OutOfMemory)) => {
                self.fail(event_loop, err.into());
                return;
            }
            Err(err) => log::error!("frame failed: {err}"),
        }

        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let window_attrs = Window::default_attributes()
            .with_title("fogfx")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(err) => return self.fail(event_loop, err.into()),
        };
        let ctx = match pollster::block_on(GpuContext::new(window.clone())) {
            Ok(ctx) => ctx,
            Err(err) => return self.fail(event_loop, err.into()),
        };
        log::info!(
            "{} fog particles, {}x{} surface",
            self.engine.system().len(),
            ctx.config.width,
            ctx.config.height
        );

        self.scene = Some(WgpuScene::new(ctx));
        self.engine.invalidate_surface();
        self.compositor.reset();
        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                self.stop.stop();
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                if let Some(scene) = &mut self.scene {
                    scene.resize(physical_size.width, physical_size.height);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => self.handle_key(code),
            WindowEvent::MouseInput { state, button, .. } => {
                if button == MouseButton::Left {
                    self.mouse_pressed = state == ElementState::Pressed;
                    if !self.mouse_pressed {
                        self.last_mouse_pos = None;
                    }
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Some((position.x, position.y));
                if self.mouse_pressed {
                    if let Some((last_x, last_y)) = self.last_mouse_pos {
                        if let Some(scene) = &mut self.scene {
                            scene.camera.orbit((position.x - last_x) as f32, (position.y - last_y) as f32);
                        }
                    }
                    self.last_mouse_pos = Some((position.x, position.y));
                }
            }
            WindowEvent::CursorLeft { .. } => self.cursor = None,
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 * 0.1,
                };
                if let Some(scene) = &mut self.scene {
                    scene.camera.zoom(scroll);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }
}
