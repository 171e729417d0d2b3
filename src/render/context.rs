use std::sync::Arc;

use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::settings::EngineSettings;

/// Swap-interval cycle for the vsync toggle, in order: 0, 1, 2.
const PRESENT_MODE_CYCLE: [wgpu::PresentMode; 3] = [
    wgpu::PresentMode::AutoNoVsync,
    wgpu::PresentMode::Fifo,
    wgpu::PresentMode::FifoRelaxed,
];

pub struct RenderContext {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub size: PhysicalSize<u32>,
    pub depth: Depth,
    pub supports_clamp_to_border: bool,
    pub supports_line_polygon: bool,
    available_present_modes: Vec<wgpu::PresentMode>,
    present_mode_index: usize,
}

impl RenderContext {
    pub async fn new(
        window: Arc<Window>,
        size: PhysicalSize<u32>,
        settings: &EngineSettings,
    ) -> Self {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .expect("Failed to create surface");

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .expect("Failed to find adapter");

        log::info!("Using adapter: {:?}", adapter.get_info());
        log::info!("Using backend: {:?}", adapter.get_info().backend);
        let adapter_features = adapter.features();

        let mut required_features = wgpu::Features::empty();

        let supports_clamp_to_border = if adapter_features
            .contains(wgpu::Features::ADDRESS_MODE_CLAMP_TO_BORDER)
        {
            required_features |= wgpu::Features::ADDRESS_MODE_CLAMP_TO_BORDER;
            true
        } else {
            log::warn!(
                "Clamp-to-border not supported; cone shadow samples outside the frustum will clamp to the edge"
            );
            false
        };

        let supports_line_polygon =
            if adapter_features.contains(wgpu::Features::POLYGON_MODE_LINE) {
                required_features |= wgpu::Features::POLYGON_MODE_LINE;
                true
            } else {
                log::warn!("Line polygon mode not supported; debug pass will draw line lists only");
                false
            };

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Device"),
                required_features,
                required_limits: wgpu::Limits::default(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .expect("Failed to create device");

        let surface_caps = surface.get_capabilities(&adapter);

        let format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        let available_present_modes = surface_caps.present_modes.clone();
        let present_mode_index = settings
            .present_mode_index()
            .min(PRESENT_MODE_CYCLE.len() - 1);
        let present_mode = pick_present_mode(
            PRESENT_MODE_CYCLE[present_mode_index],
            &available_present_modes,
        );

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth = Depth::new(&device, size);

        Self {
            surface,
            device,
            queue,
            config,
            size,
            depth,
            supports_clamp_to_border,
            supports_line_polygon,
            available_present_modes,
            present_mode_index,
        }
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        self.depth = Depth::new(&self.device, new_size);
    }

    /// Step the vsync cycle (interval 0 -> 1 -> 2 -> 0) and reconfigure
    /// the surface so the change applies on the next present.
    pub fn cycle_present_mode(&mut self) {
        self.present_mode_index = (self.present_mode_index + 1) % PRESENT_MODE_CYCLE.len();
        let desired = PRESENT_MODE_CYCLE[self.present_mode_index];
        self.config.present_mode = pick_present_mode(desired, &self.available_present_modes);
        log::info!("Present mode: {:?}", self.config.present_mode);
        self.surface.configure(&self.device, &self.config);
    }

    pub fn aspect(&self) -> f32 {
        self.config.width as f32 / self.config.height.max(1) as f32
    }
}

fn pick_present_mode(
    desired: wgpu::PresentMode,
    available: &[wgpu::PresentMode],
) -> wgpu::PresentMode {
    if available.contains(&desired) {
        return desired;
    }
    log::warn!("Present mode {desired:?} not supported, falling back to FIFO");
    wgpu::PresentMode::Fifo
}

pub struct Depth {
    pub view: wgpu::TextureView,
    pub format: wgpu::TextureFormat,
}

impl Depth {
    pub fn new(device: &wgpu::Device, size: PhysicalSize<u32>) -> Self {
        let format = wgpu::TextureFormat::Depth24Plus;
        let tex = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth"),
            size: wgpu::Extent3d {
                width: size.width.max(1),
                height: size.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = tex.create_view(&wgpu::TextureViewDescriptor::default());
        Self { view, format }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_mode_falls_back_to_fifo() {
        let available = [wgpu::PresentMode::Fifo, wgpu::PresentMode::Mailbox];
        assert_eq!(
            pick_present_mode(wgpu::PresentMode::FifoRelaxed, &available),
            wgpu::PresentMode::Fifo
        );
        assert_eq!(
            pick_present_mode(wgpu::PresentMode::Mailbox, &available),
            wgpu::PresentMode::Mailbox
        );
    }

    #[test]
    fn cycle_covers_swap_intervals_zero_one_two() {
        assert_eq!(PRESENT_MODE_CYCLE.len(), 3);
        assert_eq!(PRESENT_MODE_CYCLE[0], wgpu::PresentMode::AutoNoVsync);
        assert_eq!(PRESENT_MODE_CYCLE[1], wgpu::PresentMode::Fifo);
    }
}
