//! Two-pass forward renderer.
//!
//! Pass 1 renders depth for every light into its leased shadow array
//! layers (six sub-passes per point light, one per cube face). Pass 2
//! draws models in registration order against the surface, sampling
//! the shadow arrays through comparison samplers. Per-model matrices
//! travel in one storage buffer indexed by `instance_index`, so a draw
//! is a single two-instance-range call with no per-draw uniform
//! writes.

use std::mem;
use std::num::NonZeroU64;

use glam::Mat4;

use crate::asset::ResourceStore;
use crate::config::{MAX_CONE_LIGHTS, MAX_POINT_LIGHTS, POINT_SHADOW_FACES};
use crate::render::context::RenderContext;
use crate::render::mesh::Mesh;
use crate::render::shadow::{ShadowArrays, ShadowRegistry};
use crate::render::texture::Texture;
use crate::render::uniforms::{
    ConeLightUniform, Globals, LightsUniform, ObjectData, PointLightUniform, ShadowViewUniform,
};
use crate::render::vertex::MeshVertex;
use crate::scene::{Camera, Light, LightKind, Model, Registry};

/// Rendering feature cycle: full, shadows off, shadows and lighting
/// off.
pub const FEATURE_MASK_STATES: u32 = 3;

pub struct FrameInputs<'a> {
    pub camera: &'a Camera,
    pub models: &'a Registry<Model>,
    pub lights: &'a Registry<Light>,
    pub meshes: &'a ResourceStore<Mesh>,
    pub textures: &'a ResourceStore<Texture>,
    pub shadows: &'a ShadowRegistry,
}

pub struct ForwardPipeline {
    globals_buffer: wgpu::Buffer,
    lights_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,

    objects_buffer: wgpu::Buffer,
    objects_capacity: u32,
    objects_layout: wgpu::BindGroupLayout,
    objects_bind_group: wgpu::BindGroup,
    objects_scratch: Vec<ObjectData>,

    diffuse_layout: wgpu::BindGroupLayout,

    shadow_uniform_buffer: wgpu::Buffer,
    shadow_staging_buffer: wgpu::Buffer,
    shadow_bind_group: wgpu::BindGroup,
    cone_shadow_pipeline: wgpu::RenderPipeline,
    point_shadow_pipeline: wgpu::RenderPipeline,

    lit_pipeline: wgpu::RenderPipeline,

    feature_mask: u32,
    pub ambient: f32,
}

impl ForwardPipeline {
    pub fn new(context: &RenderContext, arrays: &ShadowArrays) -> Self {
        let device = &context.device;

        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("GlobalsBuffer"),
            size: mem::size_of::<Globals>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let lights_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("LightsBuffer"),
            size: mem::size_of::<LightsUniform>() as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("FrameBindLayout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: Some(
                            NonZeroU64::new(mem::size_of::<Globals>() as u64).unwrap(),
                        ),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: Some(
                            NonZeroU64::new(mem::size_of::<LightsUniform>() as u64).unwrap(),
                        ),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2Array,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::CubeArray,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 5,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        });

        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("FrameBindGroup"),
            layout: &frame_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: globals_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: lights_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(arrays.cone.array_view()),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&arrays.cone_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(arrays.point.array_view()),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::Sampler(&arrays.point_sampler),
                },
            ],
        });

        let objects_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("ObjectsBindLayout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let objects_capacity = 256u32;
        let (objects_buffer, objects_bind_group) =
            Self::make_objects_buffer(device, &objects_layout, objects_capacity);

        let diffuse_layout = Texture::bind_group_layout(device);

        // Depth-pass uniform is rewritten between sub-passes through a
        // staging buffer; all copies are encoded before submit, so each
        // pass needs its own source offset.
        let shadow_uniform_size = mem::size_of::<ShadowViewUniform>() as u64;
        let shadow_uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("ShadowViewBuffer"),
            size: shadow_uniform_size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let max_faces = (MAX_CONE_LIGHTS + MAX_POINT_LIGHTS * POINT_SHADOW_FACES) as u64;
        let shadow_staging_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("ShadowStagingBuffer"),
            size: shadow_uniform_size * max_faces,
            usage: wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let shadow_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("ShadowViewBindLayout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: Some(NonZeroU64::new(shadow_uniform_size).unwrap()),
                },
                count: None,
            }],
        });

        let shadow_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("ShadowViewBindGroup"),
            layout: &shadow_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: shadow_uniform_buffer.as_entire_binding(),
            }],
        });

        let cone_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("ConeShadowShader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shader/shadow_cone.wgsl").into()),
        });
        let point_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("PointShadowShader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shader/shadow_point.wgsl").into()),
        });

        let shadow_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("ShadowPipelineLayout"),
                bind_group_layouts: &[&shadow_layout, &objects_layout],
                push_constant_ranges: &[],
            });

        let shadow_depth_state = wgpu::DepthStencilState {
            format: wgpu::TextureFormat::Depth32Float,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState {
                constant: 2,
                slope_scale: 2.0,
                clamp: 0.0,
            },
        };

        let cone_shadow_pipeline =
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("ConeShadowPipeline"),
                layout: Some(&shadow_pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &cone_shader,
                    entry_point: Some("vs_main"),
                    buffers: &[MeshVertex::layout()],
                    compilation_options: Default::default(),
                },
                fragment: None,
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: Some(wgpu::Face::Back),
                    front_face: wgpu::FrontFace::Ccw,
                    ..Default::default()
                },
                depth_stencil: Some(shadow_depth_state.clone()),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });

        // Point faces store distance / far instead of projected depth,
        // so the fragment stage is required.
        let point_shadow_pipeline =
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("PointShadowPipeline"),
                layout: Some(&shadow_pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &point_shader,
                    entry_point: Some("vs_main"),
                    buffers: &[MeshVertex::layout()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &point_shader,
                    entry_point: Some("fs_main"),
                    targets: &[],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: Some(wgpu::Face::Back),
                    front_face: wgpu::FrontFace::Ccw,
                    ..Default::default()
                },
                depth_stencil: Some(shadow_depth_state),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });

        let lit_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("LitShader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shader/lit.wgsl").into()),
        });

        let lit_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("LitPipelineLayout"),
            bind_group_layouts: &[&frame_layout, &objects_layout, &diffuse_layout],
            push_constant_ranges: &[],
        });

        let lit_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("LitPipeline"),
            layout: Some(&lit_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &lit_shader,
                entry_point: Some("vs_main"),
                buffers: &[MeshVertex::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &lit_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: context.config.format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                front_face: wgpu::FrontFace::Ccw,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: context.depth.format,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            globals_buffer,
            lights_buffer,
            frame_bind_group,
            objects_buffer,
            objects_capacity,
            objects_layout,
            objects_bind_group,
            objects_scratch: Vec::new(),
            diffuse_layout,
            shadow_uniform_buffer,
            shadow_staging_buffer,
            shadow_bind_group,
            cone_shadow_pipeline,
            point_shadow_pipeline,
            lit_pipeline,
            feature_mask: 0,
            ambient: 0.15,
        }
    }

    fn make_objects_buffer(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        capacity: u32,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("ObjectsBuffer"),
            size: capacity as u64 * mem::size_of::<ObjectData>() as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("ObjectsBindGroup"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        (buffer, bind_group)
    }

    pub fn diffuse_layout(&self) -> &wgpu::BindGroupLayout {
        &self.diffuse_layout
    }

    pub fn objects_layout(&self) -> &wgpu::BindGroupLayout {
        &self.objects_layout
    }

    pub fn objects_bind_group(&self) -> &wgpu::BindGroup {
        &self.objects_bind_group
    }

    pub fn feature_mask(&self) -> u32 {
        self.feature_mask
    }

    /// Full -> shadows off -> shadows and lighting off -> full.
    pub fn cycle_feature_mask(&mut self) {
        self.feature_mask = (self.feature_mask + 1) % FEATURE_MASK_STATES;
        log::info!("Feature mask: {}", self.feature_mask);
    }

    /// Upload per-frame state: model matrices in registration order,
    /// camera globals, and the packed light table.
    pub fn prepare(&mut self, context: &RenderContext, inputs: &FrameInputs<'_>) {
        self.objects_scratch.clear();
        for (_, model) in inputs.models.iter() {
            self.objects_scratch.push(ObjectData::new(model.matrix()));
        }

        let required = self.objects_scratch.len() as u32;
        if required > self.objects_capacity {
            let new_capacity = required.max(self.objects_capacity * 2);
            log::info!(
                "Growing objects buffer: {} -> {}",
                self.objects_capacity,
                new_capacity
            );
            let (buffer, bind_group) =
                Self::make_objects_buffer(&context.device, &self.objects_layout, new_capacity);
            self.objects_buffer = buffer;
            self.objects_bind_group = bind_group;
            self.objects_capacity = new_capacity;
        }

        if !self.objects_scratch.is_empty() {
            context.queue.write_buffer(
                &self.objects_buffer,
                0,
                bytemuck::cast_slice(&self.objects_scratch),
            );
        }

        let mut globals = Globals::new(
            inputs.camera.view_proj(),
            inputs.camera.position,
            self.ambient,
        );
        globals.feature_mask = self.feature_mask;

        let mut lights = LightsUniform {
            cones: [ConeLightUniform {
                view_proj: Mat4::IDENTITY.to_cols_array_2d(),
                position: [0.0; 4],
                color_intensity: [0.0; 4],
            }; MAX_CONE_LIGHTS],
            points: [PointLightUniform {
                position: [0.0; 4],
                color_intensity: [0.0; 4],
                params: [1.0, 0.0, 0.0, 0.0],
            }; MAX_POINT_LIGHTS],
        };

        for (_, light) in inputs.lights.iter() {
            let Some(handle) = inputs.shadows.get(&light.shadow_buffer) else {
                log::warn!("Light references unknown shadow buffer '{}'", light.shadow_buffer);
                continue;
            };
            let record = inputs.shadows.buffer(handle);
            match light.kind {
                LightKind::Cone => {
                    let slot = record.slot();
                    if globals.cone_count as usize == MAX_CONE_LIGHTS {
                        continue;
                    }
                    lights.cones[globals.cone_count as usize] = ConeLightUniform {
                        view_proj: light.view_proj(0).to_cols_array_2d(),
                        position: light.position.extend(slot as f32).to_array(),
                        color_intensity: light.color.extend(light.intensity).to_array(),
                    };
                    globals.cone_count += 1;
                }
                LightKind::Point => {
                    let slot = record.slot();
                    if globals.point_count as usize == MAX_POINT_LIGHTS {
                        continue;
                    }
                    lights.points[globals.point_count as usize] = PointLightUniform {
                        position: light.position.extend(1.0).to_array(),
                        color_intensity: light.color.extend(light.intensity).to_array(),
                        params: [light.far, slot as f32, 0.0, 0.0],
                    };
                    globals.point_count += 1;
                }
            }
        }

        context
            .queue
            .write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&globals));
        context
            .queue
            .write_buffer(&self.lights_buffer, 0, bytemuck::bytes_of(&lights));
    }

    /// Depth pass: one sub-pass per shadow layer, lights in
    /// registration order.
    pub fn render_shadows(
        &self,
        context: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        arrays: &ShadowArrays,
        inputs: &FrameInputs<'_>,
    ) {
        let uniform_size = mem::size_of::<ShadowViewUniform>() as u64;
        let mut staging_offset = 0u64;

        for (_, light) in inputs.lights.iter() {
            let Some(handle) = inputs.shadows.get(&light.shadow_buffer) else {
                continue;
            };
            let record = inputs.shadows.buffer(handle);

            for face in 0..light.face_count() {
                let uniform = match light.kind {
                    LightKind::Cone => ShadowViewUniform::cone(light.view_proj(face)),
                    LightKind::Point => ShadowViewUniform::point_face(
                        light.view_proj(face),
                        light.position,
                        light.far,
                    ),
                };
                context.queue.write_buffer(
                    &self.shadow_staging_buffer,
                    staging_offset,
                    bytemuck::bytes_of(&uniform),
                );

                encoder.copy_buffer_to_buffer(
                    &self.shadow_staging_buffer,
                    staging_offset,
                    &self.shadow_uniform_buffer,
                    0,
                    uniform_size,
                );

                let (array, pipeline) = match light.kind {
                    LightKind::Cone => (&arrays.cone, &self.cone_shadow_pipeline),
                    LightKind::Point => (&arrays.point, &self.point_shadow_pipeline),
                };

                let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("ShadowPass"),
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

                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &self.shadow_bind_group, &[]);
                pass.set_bind_group(1, &self.objects_bind_group, &[]);

                for (index, (_, model)) in inputs.models.iter().enumerate() {
                    let Some(mesh) = inputs.meshes.resource(model.mesh) else {
                        continue;
                    };
                    pass.set_vertex_buffer(0, mesh.vertex_buffer().slice(..));
                    let instance = index as u32;
                    pass.draw(0..mesh.vertex_count(), instance..instance + 1);
                }

                staging_offset += uniform_size;
            }
        }
    }

    /// Lit pass over the surface, models in registration order. The
    /// diffuse bind group is only rebound when the texture changes.
    pub fn render_lit(
        &self,
        context: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        surface_view: &wgpu::TextureView,
        inputs: &FrameInputs<'_>,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("LitPass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: surface_view,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: 0.02,
                        g: 0.02,
                        b: 0.03,
                        a: 1.0,
                    }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &context.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.lit_pipeline);
        pass.set_bind_group(0, &self.frame_bind_group, &[]);
        pass.set_bind_group(1, &self.objects_bind_group, &[]);

        let mut bound_texture = None;
        for (index, (_, model)) in inputs.models.iter().enumerate() {
            let Some(mesh) = inputs.meshes.resource(model.mesh) else {
                continue;
            };
            if bound_texture != Some(model.texture) {
                let Some(texture) = inputs.textures.resource(model.texture) else {
                    continue;
                };
                pass.set_bind_group(2, &texture.bind_group, &[]);
                bound_texture = Some(model.texture);
            }
            pass.set_vertex_buffer(0, mesh.vertex_buffer().slice(..));
            let instance = index as u32;
            pass.draw(0..mesh.vertex_count(), instance..instance + 1);
        }
    }
}
