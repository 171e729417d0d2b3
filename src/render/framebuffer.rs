//! Offscreen color targets for external callers (scene transitions,
//! reflection captures). Shadow depth targets live in
//! [`crate::render::shadow`].

use crate::render::context::Depth;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameBufferKind {
    Simple,
    SimpleWithDepth,
    Cube,
    CubeWithDepth,
}

impl FrameBufferKind {
    fn layers(self) -> u32 {
        match self {
            FrameBufferKind::Simple | FrameBufferKind::SimpleWithDepth => 1,
            FrameBufferKind::Cube | FrameBufferKind::CubeWithDepth => 6,
        }
    }

    fn has_depth(self) -> bool {
        matches!(
            self,
            FrameBufferKind::SimpleWithDepth | FrameBufferKind::CubeWithDepth
        )
    }
}

pub struct FrameBuffer {
    pub kind: FrameBufferKind,
    pub color: wgpu::Texture,
    /// One render view per layer; cube kinds are drawn face by face.
    pub layer_views: Vec<wgpu::TextureView>,
    pub sample_view: wgpu::TextureView,
    pub depth: Option<Depth>,
}

impl FrameBuffer {
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        kind: FrameBufferKind,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> Self {
        let layers = kind.layers();
        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: layers,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });

        let layer_views = (0..layers)
            .map(|layer| {
                color.create_view(&wgpu::TextureViewDescriptor {
                    label: Some(&format!("{label}Layer{layer}")),
                    dimension: Some(wgpu::TextureViewDimension::D2),
                    base_array_layer: layer,
                    array_layer_count: Some(1),
                    ..Default::default()
                })
            })
            .collect();

        let sample_view = color.create_view(&wgpu::TextureViewDescriptor {
            label: Some(&format!("{label}SampleView")),
            dimension: Some(if layers == 6 {
                wgpu::TextureViewDimension::Cube
            } else {
                wgpu::TextureViewDimension::D2
            }),
            ..Default::default()
        });

        let depth = kind.has_depth().then(|| {
            Depth::new(
                device,
                winit::dpi::PhysicalSize::new(width, height),
            )
        });

        Self {
            kind,
            color,
            layer_views,
            sample_view,
            depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_kinds_carry_six_layers() {
        assert_eq!(FrameBufferKind::Simple.layers(), 1);
        assert_eq!(FrameBufferKind::SimpleWithDepth.layers(), 1);
        assert_eq!(FrameBufferKind::Cube.layers(), 6);
        assert_eq!(FrameBufferKind::CubeWithDepth.layers(), 6);
    }

    #[test]
    fn only_with_depth_kinds_allocate_depth() {
        assert!(!FrameBufferKind::Simple.has_depth());
        assert!(FrameBufferKind::SimpleWithDepth.has_depth());
        assert!(!FrameBufferKind::Cube.has_depth());
        assert!(FrameBufferKind::CubeWithDepth.has_depth());
    }
}
