//! Process-wide engine state: the GPU context, the resource stores,
//! the scene registries and the render path. Scenes receive `&mut
//! Engine` each frame and drive everything through it.

use std::sync::Arc;
use std::time::Duration;

use winit::dpi::PhysicalSize;
use winit::keyboard::KeyCode;
use winit::window::Window;

use crate::asset::ResourceStore;
use crate::input::{Debounce, Input};
use crate::render::{
    DebugRenderer, ForwardPipeline, FrameBuffer, FrameInputs, Mesh, RenderContext, Shader,
    ShadowArrays, ShadowBuffer, ShadowError, ShadowRegistry, TextRenderer, Texture,
};
use crate::scene::{Camera, Light, Model, Registry};
use crate::settings::EngineSettings;

/// Rolling frame statistics, refreshed twice a second.
pub struct FrameStats {
    frames: u32,
    elapsed: Duration,
    fps: f32,
    frame_ms: f32,
}

impl FrameStats {
    const WINDOW: Duration = Duration::from_millis(500);

    pub fn new() -> Self {
        Self {
            frames: 0,
            elapsed: Duration::ZERO,
            fps: 0.0,
            frame_ms: 0.0,
        }
    }

    pub fn tick(&mut self, dt: Duration) {
        self.frames += 1;
        self.elapsed += dt;
        if self.elapsed >= Self::WINDOW {
            let secs = self.elapsed.as_secs_f32();
            self.fps = self.frames as f32 / secs;
            self.frame_ms = secs * 1000.0 / self.frames as f32;
            self.frames = 0;
            self.elapsed = Duration::ZERO;
        }
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn frame_ms(&self) -> f32 {
        self.frame_ms
    }
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new()
    }
}

struct Toggles {
    capture: Debounce,
    debug_pass: Debounce,
    hud: Debounce,
    vsync: Debounce,
    feature_mask: Debounce,
    shot_lights: Debounce,
}

impl Toggles {
    fn new() -> Self {
        Self {
            capture: Debounce::new(),
            debug_pass: Debounce::new(),
            hud: Debounce::new(),
            vsync: Debounce::new(),
            feature_mask: Debounce::new(),
            shot_lights: Debounce::new(),
        }
    }
}

pub struct Engine {
    pub context: RenderContext,

    pub meshes: ResourceStore<Mesh>,
    pub textures: ResourceStore<Texture>,
    pub shaders: ResourceStore<Shader>,
    pub framebuffers: ResourceStore<FrameBuffer>,

    pub shadows: ShadowRegistry,
    pub shadow_arrays: ShadowArrays,

    pub pipeline: ForwardPipeline,
    pub debug: DebugRenderer,
    pub text: Option<TextRenderer>,

    pub models: Registry<Model>,
    pub lights: Registry<Light>,
    pub cameras: Registry<Camera>,
    pub input: Input,
    pub stats: FrameStats,

    pub capture_cursor: bool,
    pub debug_pass: bool,
    pub hud: bool,
    /// Observed by shot entities on init and every update.
    pub shot_lights: bool,

    toggles: Toggles,
    active_camera: u32,
    pending_shadow_clears: Vec<ShadowBuffer>,
}

impl Engine {
    pub async fn new(window: Arc<Window>, settings: &EngineSettings) -> Self {
        let size = window.inner_size();
        let context = RenderContext::new(window, size, settings).await;

        let shadow_arrays = ShadowArrays::new(
            &context.device,
            settings.shadow_map_size,
            context.supports_clamp_to_border,
        );
        let pipeline = ForwardPipeline::new(&context, &shadow_arrays);
        let debug = DebugRenderer::new(&context, pipeline.objects_layout());

        let text = match std::fs::read(&settings.font_path) {
            Ok(font_data) => {
                match TextRenderer::new(
                    &context.device,
                    &context.queue,
                    context.config.format,
                    &font_data,
                ) {
                    Ok(text) => {
                        text.set_viewport(&context.queue, size.width, size.height);
                        Some(text)
                    }
                    Err(err) => {
                        log::warn!("Font rasterization failed ({err}); HUD text disabled");
                        None
                    }
                }
            }
            Err(err) => {
                log::warn!(
                    "Could not read font {:?} ({err}); HUD text disabled",
                    settings.font_path
                );
                None
            }
        };

        let mut cameras = Registry::new();
        let active_camera = cameras.register(Camera::perspective(
            glam::Vec3::new(0.0, 2.0, 8.0),
            glam::Vec3::NEG_Z,
            context.aspect(),
        ));

        Self {
            context,
            meshes: ResourceStore::new(),
            textures: ResourceStore::new(),
            shaders: ResourceStore::new(),
            framebuffers: ResourceStore::new(),
            shadows: ShadowRegistry::new(),
            shadow_arrays,
            pipeline,
            debug,
            text,
            models: Registry::new(),
            lights: Registry::new(),
            cameras,
            input: Input::new(size),
            stats: FrameStats::new(),
            capture_cursor: false,
            debug_pass: false,
            hud: true,
            shot_lights: true,
            toggles: Toggles::new(),
            active_camera,
            pending_shadow_clears: Vec::new(),
        }
    }

    /// The camera the next frame renders through. A default camera is
    /// registered at startup, so one is always active.
    pub fn camera(&self) -> &Camera {
        self.cameras
            .get(self.active_camera)
            .expect("active camera is registered")
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        self.cameras
            .get_mut(self.active_camera)
            .expect("active camera is registered")
    }

    pub fn active_camera(&self) -> u32 {
        self.active_camera
    }

    /// Switch rendering to another registered camera. Unknown ids are
    /// ignored and leave the active camera in place.
    pub fn set_active_camera(&mut self, id: u32) -> bool {
        if self.cameras.get(id).is_none() {
            log::warn!("Camera {id} is not registered; keeping the active camera");
            return false;
        }
        self.active_camera = id;
        true
    }

    /// Register a light and lease its shadow layers in one step.
    pub fn add_light(&mut self, light: Light) -> Result<u32, ShadowError> {
        self.shadows.create(&light.shadow_buffer, light.kind)?;
        Ok(self.lights.register(light))
    }

    /// Deregister a light; the freed shadow layers are cleared to far
    /// depth on the next frame.
    pub fn remove_light(&mut self, id: u32) {
        let Some(light) = self.lights.deregister(id) else {
            return;
        };
        if let Some(handle) = self.shadows.get(&light.shadow_buffer) {
            if let Some(record) = self.shadows.destroy(handle) {
                self.pending_shadow_clears.push(record);
            }
        }
    }

    /// Run the debounced key toggles. Returns true when exit was
    /// requested.
    pub fn handle_toggles(&mut self) -> bool {
        if self.input.key_down(KeyCode::Escape) {
            return true;
        }
        if self.input.key_down(KeyCode::KeyM) && self.toggles.capture.ready() {
            self.capture_cursor = !self.capture_cursor;
            log::info!("Cursor capture: {}", self.capture_cursor);
        }
        if self.input.key_down(KeyCode::KeyB) && self.toggles.debug_pass.ready() {
            self.debug_pass = !self.debug_pass;
        }
        if self.input.key_down(KeyCode::KeyT) && self.toggles.hud.ready() {
            self.hud = !self.hud;
        }
        if self.input.key_down(KeyCode::KeyV) && self.toggles.vsync.ready() {
            self.context.cycle_present_mode();
        }
        if self.input.key_down(KeyCode::KeyL) && self.toggles.feature_mask.ready() {
            self.pipeline.cycle_feature_mask();
        }
        if self.input.key_down(KeyCode::KeyH) && self.toggles.shot_lights.ready() {
            self.shot_lights = !self.shot_lights;
            log::info!("Shot lights: {}", self.shot_lights);
        }
        false
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        self.context.resize(size);
        self.input.set_window_size(size);
        let aspect = self.context.aspect();
        for (_, camera) in self.cameras.iter_mut() {
            camera.set_aspect(aspect);
        }
        if let Some(text) = &self.text {
            text.set_viewport(&self.context.queue, size.width, size.height);
        }
    }

    /// Per-frame bookkeeping before rendering: frame statistics, then
    /// the lifecycle fan-out over every registry.
    pub fn update(&mut self, dt: Duration) {
        self.stats.tick(dt);
        let dt = dt.as_secs_f32();
        self.cameras.update_all(dt);
        self.lights.update_all(dt);
        self.models.update_all(dt);
    }

    /// Render one frame: shadow depth passes, lit pass, debug overlay,
    /// HUD text.
    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let frame = match self.context.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.context.resize(self.context.size);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => return Ok(()),
            Err(err) => return Err(err),
        };
        let surface_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("FrameEncoder"),
                });

        for record in self.pending_shadow_clears.drain(..) {
            self.shadow_arrays.clear_record(&mut encoder, &record);
        }

        let camera = self
            .cameras
            .get(self.active_camera)
            .expect("active camera is registered");
        let inputs = FrameInputs {
            camera,
            models: &self.models,
            lights: &self.lights,
            meshes: &self.meshes,
            textures: &self.textures,
            shadows: &self.shadows,
        };

        self.pipeline.prepare(&self.context, &inputs);
        if self.pipeline.feature_mask() == 0 {
            self.pipeline
                .render_shadows(&self.context, &mut encoder, &self.shadow_arrays, &inputs);
        }
        self.pipeline
            .render_lit(&self.context, &mut encoder, &surface_view, &inputs);

        if self.debug_pass {
            self.debug.queue_colliders(&inputs);
            self.debug.queue_light_markers(&inputs);
            self.debug.render(
                &self.context,
                &mut encoder,
                &surface_view,
                camera,
                self.pipeline.objects_bind_group(),
                &inputs,
            );
        }

        if let Some(text) = &mut self.text {
            if self.hud {
                text.enqueue(
                    format!(
                        "{:>5.1} fps  {:>5.2} ms",
                        self.stats.fps(),
                        self.stats.frame_ms()
                    ),
                    glam::Vec2::new(0.0, 1.0),
                    1.0,
                );
                text.flush(&self.context.queue, &mut encoder, &surface_view);
            } else {
                text.clear();
            }
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}
