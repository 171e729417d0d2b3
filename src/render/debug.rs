//! Debug overlay passes: collider wireframes as a line list, plus an
//! optional polygon-mode-line pass over the model meshes when the
//! adapter supports it.

use std::mem;

use glam::{Mat4, Vec3};

use crate::render::context::RenderContext;
use crate::render::pipeline::FrameInputs;
use crate::render::primitives::{box_edge_lines, wire_sphere_lines};
use crate::render::vertex::{LineVertex, MeshVertex};
use crate::scene::{Camera, ColliderShape};

const SPHERE_SEGMENTS: u32 = 24;
const COLLIDER_COLOR: [f32; 3] = [0.2, 1.0, 0.2];
const BOUNDS_COLOR: [f32; 3] = [1.0, 0.25, 0.25];
const WIRE_COLOR: [f32; 4] = [0.85, 0.85, 0.2, 1.0];

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct DebugGlobals {
    view_proj: [[f32; 4]; 4],
    color: [f32; 4],
}

pub struct DebugRenderer {
    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    line_pipeline: wgpu::RenderPipeline,
    wire_pipeline: Option<wgpu::RenderPipeline>,
    vertex_buffer: wgpu::Buffer,
    vertex_capacity: usize,
    lines: Vec<LineVertex>,
}

impl DebugRenderer {
    pub fn new(context: &RenderContext, objects_layout: &wgpu::BindGroupLayout) -> Self {
        let device = &context.device;

        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("DebugGlobalsBuffer"),
            size: mem::size_of::<DebugGlobals>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("DebugGlobalsBindLayout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("DebugGlobalsBindGroup"),
            layout: &globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("DebugShader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shader/debug.wgsl").into()),
        });

        let line_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("DebugLinePipelineLayout"),
            bind_group_layouts: &[&globals_layout],
            push_constant_ranges: &[],
        });

        // Lines draw on top of the lit pass but still depth-test so
        // hidden colliders read as occluded.
        let depth_state = wgpu::DepthStencilState {
            format: context.depth.format,
            depth_write_enabled: false,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        };

        let line_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("DebugLinePipeline"),
            layout: Some(&line_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_line"),
                buffers: &[LineVertex::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_line"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: context.config.format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineList,
                ..Default::default()
            },
            depth_stencil: Some(depth_state.clone()),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let wire_pipeline = context.supports_line_polygon.then(|| {
            let wire_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("DebugWirePipelineLayout"),
                bind_group_layouts: &[&globals_layout, objects_layout],
                push_constant_ranges: &[],
            });
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("DebugWirePipeline"),
                layout: Some(&wire_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_wire"),
                    buffers: &[MeshVertex::layout()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_wire"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: context.config.format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    polygon_mode: wgpu::PolygonMode::Line,
                    ..Default::default()
                },
                depth_stencil: Some(depth_state),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        });

        let vertex_capacity = 4096;
        let vertex_buffer = Self::make_vertex_buffer(device, vertex_capacity);

        Self {
            globals_buffer,
            globals_bind_group,
            line_pipeline,
            wire_pipeline,
            vertex_buffer,
            vertex_capacity,
            lines: Vec::new(),
        }
    }

    fn make_vertex_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("DebugLineBuffer"),
            size: (capacity * mem::size_of::<LineVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    pub fn wireframe_supported(&self) -> bool {
        self.wire_pipeline.is_some()
    }

    fn push_segments(&mut self, points: &[Vec3], transform: Mat4, color: [f32; 3]) {
        for p in points {
            let world = transform * p.extend(1.0);
            self.lines.push(LineVertex {
                pos: [world.x, world.y, world.z],
                color,
            });
        }
    }

    /// Queue a small wireframe sphere at every light position.
    pub fn queue_light_markers(&mut self, inputs: &FrameInputs<'_>) {
        let points = wire_sphere_lines(0.25, SPHERE_SEGMENTS);
        for (_, light) in inputs.lights.iter() {
            self.push_segments(
                &points,
                Mat4::from_translation(light.position),
                light.color.to_array(),
            );
        }
    }

    /// Queue collider outlines for every model that carries one: the
    /// shape in its own transform, and the world-space bounds around
    /// it.
    pub fn queue_colliders(&mut self, inputs: &FrameInputs<'_>) {
        for (_, model) in inputs.models.iter() {
            let Some(collider) = model.collider() else {
                continue;
            };
            match collider.shape() {
                ColliderShape::Sphere { radius } => {
                    let scaled = radius * collider.scale().x;
                    let points = wire_sphere_lines(scaled, SPHERE_SEGMENTS);
                    self.push_segments(
                        &points,
                        Mat4::from_translation(collider.position()),
                        COLLIDER_COLOR,
                    );
                }
                ColliderShape::OrientedBox { local } => {
                    let points = box_edge_lines(local);
                    let transform = Mat4::from_scale_rotation_translation(
                        collider.scale(),
                        collider.rotation(),
                        collider.position(),
                    );
                    self.push_segments(&points, transform, COLLIDER_COLOR);
                }
            }
            let points = box_edge_lines(collider.world_aabb());
            self.push_segments(&points, Mat4::IDENTITY, BOUNDS_COLOR);
        }
    }

    /// Upload queued lines and draw them, then overlay mesh wireframes
    /// when the polygon-mode-line pipeline exists.
    pub fn render(
        &mut self,
        context: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        surface_view: &wgpu::TextureView,
        camera: &Camera,
        objects_bind_group: &wgpu::BindGroup,
        inputs: &FrameInputs<'_>,
    ) {
        if self.lines.len() > self.vertex_capacity {
            self.vertex_capacity = self.lines.len().next_power_of_two();
            self.vertex_buffer = Self::make_vertex_buffer(&context.device, self.vertex_capacity);
        }

        let globals = DebugGlobals {
            view_proj: camera.view_proj().to_cols_array_2d(),
            color: WIRE_COLOR,
        };
        context
            .queue
            .write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&globals));

        if !self.lines.is_empty() {
            context
                .queue
                .write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&self.lines));
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("DebugPass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: surface_view,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &context.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        if !self.lines.is_empty() {
            pass.set_pipeline(&self.line_pipeline);
            pass.set_bind_group(0, &self.globals_bind_group, &[]);
            pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            pass.draw(0..self.lines.len() as u32, 0..1);
        }

        if let Some(wire) = &self.wire_pipeline {
            pass.set_pipeline(wire);
            pass.set_bind_group(0, &self.globals_bind_group, &[]);
            pass.set_bind_group(1, objects_bind_group, &[]);
            for (index, (_, model)) in inputs.models.iter().enumerate() {
                let Some(mesh) = inputs.meshes.resource(model.mesh) else {
                    continue;
                };
                pass.set_vertex_buffer(0, mesh.vertex_buffer().slice(..));
                let instance = index as u32;
                pass.draw(0..mesh.vertex_count(), instance..instance + 1);
            }
        }

        drop(pass);
        self.lines.clear();
    }
}
