//! HUD text: a layered glyph atlas plus a per-frame quad batch.
//!
//! The atlas is a 255-layer R8 array, one glyph per layer, indexed by
//! the character's byte value. Callers enqueue strings positioned on a
//! character grid (80 columns by 26 rows at scale 1); flush lays the
//! whole list out into one dynamic vertex buffer and draws it over the
//! lit output with alpha blending. Characters past the batch cap are
//! dropped silently.

use glam::{Mat4, Vec2};
use wgpu::util::DeviceExt;

use fontdue::{Font, FontSettings};
use thiserror::Error;

use crate::config::{ATLAS_GLYPHS, MAX_TEXT_CHARS, MAX_TEXT_LENGTH, TEXT_HEIGHT, TEXT_WIDTH};
use crate::render::vertex::TextVertex;

#[derive(Error, Debug)]
pub enum TextError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to load font: {0}")]
    Font(String),
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Glyph {
    pub size: Vec2,
    /// x = left offset from the pen, y = height above the baseline.
    pub bearing: Vec2,
    pub advance: f32,
    /// Used fraction of the glyph's atlas cell.
    pub uv_max: Vec2,
}

/// Per-byte glyph metrics plus the shared cell dimensions.
pub struct GlyphSet {
    pub cell_width: u32,
    pub cell_height: u32,
    pub glyphs: Vec<Glyph>,
}

pub struct RasterFont {
    pub set: GlyphSet,
    /// One bitmap per byte glyph, each `width * rows` coverage bytes.
    pub bitmaps: Vec<Vec<u8>>,
}

/// Rasterize codepoints 0..=254 at the given pixel height. The cell is
/// sized to the largest glyph so every bitmap fits one atlas layer.
pub fn rasterize_font(font_data: &[u8], px: f32) -> Result<RasterFont, TextError> {
    let font = Font::from_bytes(font_data, FontSettings::default())
        .map_err(|e| TextError::Font(e.to_string()))?;

    let mut glyphs = Vec::with_capacity(ATLAS_GLYPHS);
    let mut bitmaps = Vec::with_capacity(ATLAS_GLYPHS);
    let mut cell_width = 0usize;
    let mut cell_height = 0usize;

    for byte in 0..ATLAS_GLYPHS {
        let ch = byte as u8 as char;
        let (metrics, bitmap) = font.rasterize(ch, px);
        cell_width = cell_width.max(metrics.width);
        cell_height = cell_height.max(metrics.height);
        glyphs.push((metrics, bitmap));
    }

    let set_glyphs = glyphs
        .iter()
        .map(|(metrics, _)| Glyph {
            size: Vec2::new(metrics.width as f32, metrics.height as f32),
            bearing: Vec2::new(
                metrics.xmin as f32,
                (metrics.height as i32 + metrics.ymin) as f32,
            ),
            advance: metrics.advance_width,
            uv_max: Vec2::new(
                metrics.width as f32 / cell_width.max(1) as f32,
                metrics.height as f32 / cell_height.max(1) as f32,
            ),
        })
        .collect();

    for (_, bitmap) in glyphs {
        bitmaps.push(bitmap);
    }

    log::info!(
        "Rasterized {} glyphs at {px}px, cell {cell_width}x{cell_height}",
        ATLAS_GLYPHS
    );

    Ok(RasterFont {
        set: GlyphSet {
            cell_width: cell_width as u32,
            cell_height: cell_height as u32,
            glyphs: set_glyphs,
        },
        bitmaps,
    })
}

#[derive(Clone, Debug)]
pub struct TextEntry {
    pub content: String,
    /// Character-grid position: x in columns, y in rows.
    pub position: Vec2,
    pub scale: f32,
}

/// Lay the draw list out as triangle pairs, six vertices per
/// character, capped at `cap` characters. Returns the vertices and
/// the number of characters laid out.
pub fn build_batch(entries: &[TextEntry], set: &GlyphSet, cap: usize) -> (Vec<TextVertex>, usize) {
    let mut vertices = Vec::with_capacity((cap * 6).min(entries.len() * 480));
    let mut count = 0usize;

    'outer: for entry in entries {
        let mut pen_x = entry.position.x * TEXT_WIDTH;
        let baseline = entry.position.y * TEXT_HEIGHT;

        for byte in entry.content.bytes() {
            if count == cap {
                break 'outer;
            }
            let glyph = &set.glyphs[byte as usize % set.glyphs.len()];

            let x = pen_x + glyph.bearing.x * entry.scale;
            let y = baseline - (glyph.size.y - glyph.bearing.y) * entry.scale;
            let w = glyph.size.x * entry.scale;
            let h = glyph.size.y * entry.scale;
            let (u, v) = (glyph.uv_max.x, glyph.uv_max.y);
            let layer = byte as u32;

            let quad = [
                TextVertex { pos: [x, y + h], uv: [0.0, 0.0], layer },
                TextVertex { pos: [x, y], uv: [0.0, v], layer },
                TextVertex { pos: [x + w, y], uv: [u, v], layer },
                TextVertex { pos: [x, y + h], uv: [0.0, 0.0], layer },
                TextVertex { pos: [x + w, y], uv: [u, v], layer },
                TextVertex { pos: [x + w, y + h], uv: [u, 0.0], layer },
            ];
            vertices.extend_from_slice(&quad);
            count += 1;

            pen_x += glyph.advance * entry.scale;
        }
    }

    (vertices, count)
}

/// Cut a line at MAX_TEXT_LENGTH without splitting a codepoint.
fn clip_to_row(content: &mut String) {
    if content.len() <= MAX_TEXT_LENGTH {
        return;
    }
    let mut cut = MAX_TEXT_LENGTH;
    while !content.is_char_boundary(cut) {
        cut -= 1;
    }
    content.truncate(cut);
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct TextProjection {
    matrix: [[f32; 4]; 4],
}

pub struct TextRenderer {
    glyphs: GlyphSet,
    queue_list: Vec<TextEntry>,
    vertex_buffer: wgpu::Buffer,
    projection_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    pipeline: wgpu::RenderPipeline,
    _atlas: wgpu::Texture,
}

impl TextRenderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        font_data: &[u8],
    ) -> Result<Self, TextError> {
        let raster = rasterize_font(font_data, TEXT_HEIGHT)?;
        Ok(Self::with_raster_font(device, queue, surface_format, raster))
    }

    pub fn with_raster_font(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        raster: RasterFont,
    ) -> Self {
        let cell_width = raster.set.cell_width.max(1);
        let cell_height = raster.set.cell_height.max(1);

        let atlas = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("GlyphAtlas"),
            size: wgpu::Extent3d {
                width: cell_width,
                height: cell_height,
                depth_or_array_layers: ATLAS_GLYPHS as u32,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        // One layer per byte glyph, cleared cell padded with zeroes.
        let mut layer = vec![0u8; (cell_width * cell_height) as usize];
        for (index, bitmap) in raster.bitmaps.iter().enumerate() {
            layer.fill(0);
            let glyph = &raster.set.glyphs[index];
            let (gw, gh) = (glyph.size.x as usize, glyph.size.y as usize);
            for row in 0..gh {
                let src = row * gw;
                let dst = row * cell_width as usize;
                layer[dst..dst + gw].copy_from_slice(&bitmap[src..src + gw]);
            }
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &atlas,
                    mip_level: 0,
                    origin: wgpu::Origin3d {
                        x: 0,
                        y: 0,
                        z: index as u32,
                    },
                    aspect: wgpu::TextureAspect::All,
                },
                &layer,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(cell_width),
                    rows_per_image: Some(cell_height),
                },
                wgpu::Extent3d {
                    width: cell_width,
                    height: cell_height,
                    depth_or_array_layers: 1,
                },
            );
        }

        let atlas_view = atlas.create_view(&wgpu::TextureViewDescriptor {
            label: Some("GlyphAtlasView"),
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            ..Default::default()
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("GlyphSampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("TextVertexBuffer"),
            size: (MAX_TEXT_CHARS * 6 * std::mem::size_of::<TextVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let projection = TextProjection {
            matrix: Mat4::IDENTITY.to_cols_array_2d(),
        };
        let projection_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("TextProjectionBuffer"),
            contents: bytemuck::bytes_of(&projection),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("TextBindLayout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2Array,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("TextBindGroup"),
            layout: &bind_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: projection_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&atlas_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("TextShader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shader/text.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("TextPipelineLayout"),
            bind_group_layouts: &[&bind_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("TextPipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[TextVertex::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            glyphs: raster.set,
            queue_list: Vec::new(),
            vertex_buffer,
            projection_buffer,
            bind_group,
            pipeline,
            _atlas: atlas,
        }
    }

    /// Queue a string for the next flush. Strings longer than one grid
    /// row are cut at MAX_TEXT_LENGTH characters.
    pub fn enqueue(&mut self, content: impl Into<String>, position: Vec2, scale: f32) {
        let mut content = content.into();
        clip_to_row(&mut content);
        self.queue_list.push(TextEntry {
            content,
            position,
            scale,
        });
    }

    pub fn set_viewport(&self, queue: &wgpu::Queue, width: u32, height: u32) {
        let projection = TextProjection {
            matrix: Mat4::orthographic_rh(0.0, width as f32, 0.0, height as f32, -1.0, 1.0)
                .to_cols_array_2d(),
        };
        queue.write_buffer(&self.projection_buffer, 0, bytemuck::bytes_of(&projection));
    }

    /// Draw the queued list over `view` and clear it. Returns the
    /// number of characters drawn.
    pub fn flush(
        &mut self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
    ) -> usize {
        let (vertices, count) = build_batch(&self.queue_list, &self.glyphs, MAX_TEXT_CHARS);
        self.queue_list.clear();
        if count == 0 {
            return 0;
        }

        queue.write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&vertices));

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("TextPass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.draw(0..(count * 6) as u32, 0..1);

        count
    }

    /// Drop queued entries without drawing them.
    pub fn clear(&mut self) {
        self.queue_list.clear();
    }

    pub fn pending(&self) -> usize {
        self.queue_list.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_set(advance: f32) -> GlyphSet {
        GlyphSet {
            cell_width: 10,
            cell_height: 20,
            glyphs: (0..ATLAS_GLYPHS)
                .map(|_| Glyph {
                    size: Vec2::new(8.0, 16.0),
                    bearing: Vec2::new(1.0, 14.0),
                    advance,
                    uv_max: Vec2::new(0.8, 0.8),
                })
                .collect(),
        }
    }

    fn entry(content: &str, position: Vec2, scale: f32) -> TextEntry {
        TextEntry {
            content: content.into(),
            position,
            scale,
        }
    }

    #[test]
    fn six_vertices_per_character() {
        let set = uniform_set(9.0);
        let (vertices, count) = build_batch(&[entry("abc", Vec2::ZERO, 1.0)], &set, MAX_TEXT_CHARS);
        assert_eq!(count, 3);
        assert_eq!(vertices.len(), 18);
    }

    #[test]
    fn pen_advances_by_scaled_advance() {
        let set = uniform_set(9.0);
        let (vertices, _) = build_batch(&[entry("aa", Vec2::ZERO, 2.0)], &set, MAX_TEXT_CHARS);
        // Quad left edge = pen + bearing.x * scale.
        assert_eq!(vertices[0].pos[0], 2.0);
        assert_eq!(vertices[6].pos[0], 2.0 + 9.0 * 2.0);
    }

    #[test]
    fn baseline_uses_descender_offset() {
        let set = uniform_set(9.0);
        let row = 3.0;
        let (vertices, _) =
            build_batch(&[entry("a", Vec2::new(0.0, row), 1.0)], &set, MAX_TEXT_CHARS);
        // Bottom y = row * TEXT_HEIGHT - (size.y - bearing.y) * scale.
        let expected = row * TEXT_HEIGHT - (16.0 - 14.0);
        assert_eq!(vertices[1].pos[1], expected);
        // Top edge sits one glyph height above.
        assert_eq!(vertices[0].pos[1], expected + 16.0);
    }

    #[test]
    fn layer_index_is_the_byte_value() {
        let set = uniform_set(9.0);
        let (vertices, _) = build_batch(&[entry("A", Vec2::ZERO, 1.0)], &set, MAX_TEXT_CHARS);
        assert!(vertices.iter().all(|v| v.layer == b'A' as u32));
    }

    #[test]
    fn batch_caps_at_max_chars() {
        let set = uniform_set(9.0);
        let long = "x".repeat(MAX_TEXT_CHARS + 760);
        let (vertices, count) = build_batch(&[entry(&long, Vec2::ZERO, 1.0)], &set, MAX_TEXT_CHARS);
        assert_eq!(count, MAX_TEXT_CHARS);
        assert_eq!(vertices.len(), MAX_TEXT_CHARS * 6);
    }

    #[test]
    fn cap_applies_across_entries() {
        let set = uniform_set(9.0);
        let entries: Vec<TextEntry> = (0..3)
            .map(|row| entry(&"y".repeat(MAX_TEXT_CHARS / 2), Vec2::new(0.0, row as f32), 1.0))
            .collect();
        let (_, count) = build_batch(&entries, &set, MAX_TEXT_CHARS);
        assert_eq!(count, MAX_TEXT_CHARS);
    }

    #[test]
    fn lines_clip_at_the_row_width() {
        let mut short = "fps 60".to_string();
        clip_to_row(&mut short);
        assert_eq!(short, "fps 60");

        let mut long = "z".repeat(MAX_TEXT_LENGTH + 20);
        clip_to_row(&mut long);
        assert_eq!(long.len(), MAX_TEXT_LENGTH);
    }

    #[test]
    fn clipping_never_splits_a_codepoint() {
        // One ASCII byte shifts every following two-byte char off the
        // clip boundary.
        let mut line = format!("a{}", "é".repeat(MAX_TEXT_LENGTH));
        clip_to_row(&mut line);
        assert_eq!(line.len(), MAX_TEXT_LENGTH - 1);
        assert!(line.is_char_boundary(line.len()));
    }

    #[test]
    fn empty_list_produces_nothing() {
        let set = uniform_set(9.0);
        let (vertices, count) = build_batch(&[], &set, MAX_TEXT_CHARS);
        assert_eq!(count, 0);
        assert!(vertices.is_empty());
    }
}
