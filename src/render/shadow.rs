//! Shadow depth targets shared by every light.
//!
//! Two fixed arrays are allocated once at startup: a 2D depth array
//! with one layer per cone light, and a cube depth array with six
//! faces per point light. Lights lease layers through the registry;
//! the arrays are never reallocated, so unused layers stay bound and
//! cleared to far depth, which keeps every sampler slot valid even
//! when fewer than the maximum lights exist.

use thiserror::Error;

use crate::asset::{Handle, ResourceStore};
use crate::config::{FRAMEBUFFER_HEIGHT, MAX_CONE_LIGHTS, MAX_POINT_LIGHTS, POINT_SHADOW_FACES};
use crate::scene::LightKind;

#[derive(Error, Debug)]
pub enum ShadowError {
    #[error("no free {0:?} shadow layer (cap {1})")]
    Exhausted(LightKind, usize),
}

/// Smallest-free-index layer pool.
pub struct LayerAllocator {
    in_use: Vec<bool>,
}

impl LayerAllocator {
    pub fn new(capacity: usize) -> Self {
        Self {
            in_use: vec![false; capacity],
        }
    }

    pub fn allocate(&mut self) -> Option<usize> {
        let slot = self.in_use.iter().position(|used| !used)?;
        self.in_use[slot] = true;
        Some(slot)
    }

    pub fn free(&mut self, slot: usize) {
        debug_assert!(self.in_use[slot], "freeing an unallocated shadow layer");
        self.in_use[slot] = false;
    }

    pub fn live(&self) -> usize {
        self.in_use.iter().filter(|used| **used).count()
    }

    pub fn capacity(&self) -> usize {
        self.in_use.len()
    }
}

/// One leased slice of a shadow array. Point records store the first
/// face layer, always a multiple of six.
pub struct ShadowBuffer {
    pub kind: LightKind,
    pub layer: usize,
}

impl ShadowBuffer {
    /// Pool slot this record occupies.
    pub fn slot(&self) -> usize {
        match self.kind {
            LightKind::Cone => self.layer,
            LightKind::Point => self.layer / POINT_SHADOW_FACES,
        }
    }
}

/// Name-keyed, refcounted shadow layer bookkeeping. GPU textures live
/// in [`ShadowArrays`]; this half is pure state.
pub struct ShadowRegistry {
    store: ResourceStore<ShadowBuffer>,
    cone: LayerAllocator,
    point: LayerAllocator,
}

impl Default for ShadowRegistry {
    fn default() -> Self {
        Self {
            store: ResourceStore::new(),
            cone: LayerAllocator::new(MAX_CONE_LIGHTS),
            point: LayerAllocator::new(MAX_POINT_LIGHTS),
        }
    }
}

impl ShadowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(
        &mut self,
        name: &str,
        kind: LightKind,
    ) -> Result<Handle<ShadowBuffer>, ShadowError> {
        let Self { store, cone, point } = self;
        let (allocator, faces) = match kind {
            LightKind::Cone => (cone, 1),
            LightKind::Point => (point, POINT_SHADOW_FACES),
        };
        let cap = allocator.capacity();
        store.create(name, || {
            let slot = allocator
                .allocate()
                .ok_or(ShadowError::Exhausted(kind, cap))?;
            Ok(ShadowBuffer {
                kind,
                layer: slot * faces,
            })
        })
    }

    pub fn get(&self, name: &str) -> Option<Handle<ShadowBuffer>> {
        self.store.get(name)
    }

    pub fn buffer(&self, handle: Handle<ShadowBuffer>) -> &ShadowBuffer {
        self.store
            .resource(handle)
            .expect("shadow handle outlived its record")
    }

    /// Drops one reference; at zero the layer returns to its pool and
    /// the freed record is handed back so callers can clear it.
    pub fn destroy(&mut self, handle: Handle<ShadowBuffer>) -> Option<ShadowBuffer> {
        let record = self.store.destroy(handle)?;
        match record.kind {
            LightKind::Cone => self.cone.free(record.slot()),
            LightKind::Point => self.point.free(record.slot()),
        }
        Some(record)
    }

    pub fn live_cone(&self) -> usize {
        self.cone.live()
    }

    pub fn live_point(&self) -> usize {
        self.point.live()
    }
}

/// Depth texture array with one render view per layer and one sampling
/// view over the whole array.
pub struct ShadowArray {
    _texture: wgpu::Texture,
    array_view: wgpu::TextureView,
    layer_views: Vec<wgpu::TextureView>,
}

impl ShadowArray {
    fn new(
        device: &wgpu::Device,
        label: &str,
        layers: u32,
        size: u32,
        sample_dimension: wgpu::TextureViewDimension,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: layers,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth32Float,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });

        let array_view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(&format!("{label}ArrayView")),
            format: Some(wgpu::TextureFormat::Depth32Float),
            dimension: Some(sample_dimension),
            aspect: wgpu::TextureAspect::All,
            base_array_layer: 0,
            array_layer_count: Some(layers),
            ..Default::default()
        });

        let layer_views = (0..layers)
            .map(|layer| {
                texture.create_view(&wgpu::TextureViewDescriptor {
                    label: Some(&format!("{label}Layer{layer}")),
                    format: Some(wgpu::TextureFormat::Depth32Float),
                    dimension: Some(wgpu::TextureViewDimension::D2),
                    aspect: wgpu::TextureAspect::All,
                    base_array_layer: layer,
                    array_layer_count: Some(1),
                    ..Default::default()
                })
            })
            .collect();

        Self {
            _texture: texture,
            array_view,
            layer_views,
        }
    }

    pub fn array_view(&self) -> &wgpu::TextureView {
        &self.array_view
    }

    pub fn layer_view(&self, index: usize) -> &wgpu::TextureView {
        &self.layer_views[index]
    }

    pub fn layer_count(&self) -> usize {
        self.layer_views.len()
    }
}

pub struct ShadowArrays {
    pub cone: ShadowArray,
    pub point: ShadowArray,
    pub cone_sampler: wgpu::Sampler,
    pub point_sampler: wgpu::Sampler,
}

impl ShadowArrays {
    pub fn new(device: &wgpu::Device, map_size: u32, supports_clamp_to_border: bool) -> Self {
        let size = if map_size == 0 {
            FRAMEBUFFER_HEIGHT
        } else {
            map_size
        };

        let cone = ShadowArray::new(
            device,
            "ConeShadowMap",
            MAX_CONE_LIGHTS as u32,
            size,
            wgpu::TextureViewDimension::D2Array,
        );
        let point = ShadowArray::new(
            device,
            "PointShadowMap",
            (MAX_POINT_LIGHTS * POINT_SHADOW_FACES) as u32,
            size,
            wgpu::TextureViewDimension::CubeArray,
        );

        // Out-of-frustum cone samples read the black border, so they
        // resolve as in-shadow.
        let cone_address_mode = if supports_clamp_to_border {
            wgpu::AddressMode::ClampToBorder
        } else {
            wgpu::AddressMode::ClampToEdge
        };
        let cone_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("ConeShadowSampler"),
            address_mode_u: cone_address_mode,
            address_mode_v: cone_address_mode,
            address_mode_w: cone_address_mode,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            border_color: supports_clamp_to_border
                .then_some(wgpu::SamplerBorderColor::OpaqueBlack),
            ..Default::default()
        });

        let point_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("PointShadowSampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        Self {
            cone,
            point,
            cone_sampler,
            point_sampler,
        }
    }

    /// Reset a freed record's layers to far depth so later samples
    /// read as unshadowed.
    pub fn clear_record(&self, encoder: &mut wgpu::CommandEncoder, record: &ShadowBuffer) {
        let (array, faces) = match record.kind {
            LightKind::Cone => (&self.cone, 1),
            LightKind::Point => (&self.point, POINT_SHADOW_FACES),
        };
        for face in 0..faces {
            encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("ShadowLayerClear"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: array.layer_view(record.layer + face),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocator_hands_out_smallest_free_index() {
        let mut alloc = LayerAllocator::new(3);
        assert_eq!(alloc.allocate(), Some(0));
        assert_eq!(alloc.allocate(), Some(1));
        alloc.free(0);
        assert_eq!(alloc.allocate(), Some(0));
        assert_eq!(alloc.allocate(), Some(2));
        assert_eq!(alloc.allocate(), None);
    }

    #[test]
    fn cone_pool_exhausts_at_cap_and_recycles() {
        let mut reg = ShadowRegistry::new();
        let a = reg.create("A", LightKind::Cone).unwrap();
        let b = reg.create("B", LightKind::Cone).unwrap();
        assert_eq!(reg.buffer(a).layer, 0);
        assert_eq!(reg.buffer(b).layer, 1);

        assert!(matches!(
            reg.create("C", LightKind::Cone),
            Err(ShadowError::Exhausted(LightKind::Cone, _))
        ));

        let freed = reg.destroy(a).unwrap();
        assert_eq!(freed.layer, 0);
        let c = reg.create("C", LightKind::Cone).unwrap();
        assert_eq!(reg.buffer(c).layer, 0);
    }

    #[test]
    fn point_layers_are_multiples_of_six() {
        let mut reg = ShadowRegistry::new();
        let mut layers = Vec::new();
        for i in 0..MAX_POINT_LIGHTS {
            let h = reg.create(&format!("p{i}"), LightKind::Point).unwrap();
            layers.push(reg.buffer(h).layer);
        }
        for (i, layer) in layers.iter().enumerate() {
            assert_eq!(layer % POINT_SHADOW_FACES, 0);
            assert_eq!(*layer, i * POINT_SHADOW_FACES);
        }
        assert!(reg.create("overflow", LightKind::Point).is_err());
        assert_eq!(reg.live_point(), MAX_POINT_LIGHTS);
    }

    #[test]
    fn same_name_shares_the_layer() {
        let mut reg = ShadowRegistry::new();
        let a = reg.create("shared", LightKind::Cone).unwrap();
        let b = reg.create("shared", LightKind::Cone).unwrap();
        assert_eq!(a, b);
        assert_eq!(reg.live_cone(), 1);

        // First destroy only drops a reference.
        assert!(reg.destroy(a).is_none());
        assert_eq!(reg.live_cone(), 1);
        assert!(reg.destroy(b).is_some());
        assert_eq!(reg.live_cone(), 0);
    }

    #[test]
    fn kinds_draw_from_separate_pools() {
        let mut reg = ShadowRegistry::new();
        for i in 0..MAX_CONE_LIGHTS {
            reg.create(&format!("c{i}"), LightKind::Cone).unwrap();
        }
        // Cone exhaustion must not affect point allocation.
        assert!(reg.create("p0", LightKind::Point).is_ok());
    }
}
