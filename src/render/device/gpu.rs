// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! # WGPU Device
//!
//! Runs the pass graph as fullscreen-triangle fragment shaders. All kernels
//! share one bind group layout (see `shader_source.rs`), so a pass is just a
//! pipeline lookup by `(kind, output format)`, a bind group and one draw.
//!
//! Uniform blocks of a whole frame are packed into one arena buffer at
//! `min_uniform_buffer_offset_alignment` and written with a single
//! `write_buffer` before the frame's encoder is submitted.

use crate::error::{PipelineError, Result};
use crate::render::device::RenderDevice;
use crate::render::image::{ImageBuffer, ImageDesc, ImageFormat, ImageId, ImageUsage, ImageView};
use crate::render::pass::{Command, CommandList, PassInvocation, PassKind, MAX_PASS_INPUTS};
use log::{debug, info, warn};
use std::borrow::Cow;
use std::collections::HashMap;

mod shader_source;
use shader_source::kernel_source;

const EMPTY_UNIFORM_SIZE: u64 = 256;

fn texture_format(format: ImageFormat) -> wgpu::TextureFormat {
    match format {
        ImageFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        ImageFormat::Bgra8Unorm => wgpu::TextureFormat::Bgra8Unorm,
        ImageFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
    }
}

fn image_format(format: wgpu::TextureFormat) -> Option<ImageFormat> {
    match format {
        wgpu::TextureFormat::Rgba8Unorm => Some(ImageFormat::Rgba8Unorm),
        wgpu::TextureFormat::Bgra8Unorm => Some(ImageFormat::Bgra8Unorm),
        wgpu::TextureFormat::Rgba16Float => Some(ImageFormat::Rgba16Float),
        _ => None,
    }
}

fn texture_usage(usage: ImageUsage, mip_levels: u32) -> wgpu::TextureUsages {
    let mut out = wgpu::TextureUsages::empty();
    if usage.contains(ImageUsage::SAMPLED) {
        out |= wgpu::TextureUsages::TEXTURE_BINDING;
    }
    if usage.contains(ImageUsage::RENDER_TARGET) {
        out |= wgpu::TextureUsages::RENDER_ATTACHMENT;
    }
    if usage.contains(ImageUsage::COPY_SRC) {
        out |= wgpu::TextureUsages::COPY_SRC;
    }
    if usage.contains(ImageUsage::COPY_DST) {
        out |= wgpu::TextureUsages::COPY_DST;
    }
    // mip levels are rendered from the level above
    if mip_levels > 1 {
        out |= wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::RENDER_ATTACHMENT;
    }
    out
}

fn image_usage(usage: wgpu::TextureUsages) -> ImageUsage {
    let mut out = ImageUsage::empty();
    if usage.contains(wgpu::TextureUsages::TEXTURE_BINDING) {
        out |= ImageUsage::SAMPLED;
    }
    if usage.contains(wgpu::TextureUsages::RENDER_ATTACHMENT) {
        out |= ImageUsage::RENDER_TARGET;
    }
    if usage.contains(wgpu::TextureUsages::COPY_SRC) {
        out |= ImageUsage::COPY_SRC;
    }
    if usage.contains(wgpu::TextureUsages::COPY_DST) {
        out |= ImageUsage::COPY_DST;
    }
    out
}

fn align_to(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

struct GpuImage {
    texture: wgpu::Texture,
    /// All levels, bound as a pass input
    sampled: wgpu::TextureView,
    format: ImageFormat,
    mip_levels: u32,
}

impl GpuImage {
    fn level_view(&self, level: u32) -> wgpu::TextureView {
        self.texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("crt_pixel level view"),
            base_mip_level: level,
            mip_level_count: Some(1),
            ..Default::default()
        })
    }
}

pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    sampler: wgpu::Sampler,
    /// Bound to unused input slots
    dummy_view: wgpu::TextureView,
    empty_uniforms: wgpu::Buffer,
    uniform_arena: Option<wgpu::Buffer>,
    pipelines: HashMap<(PassKind, ImageFormat), wgpu::RenderPipeline>,
    images: HashMap<ImageId, GpuImage>,
    next_id: u64,
}

impl WgpuDevice {
    /// Create a device without a surface, e.g. for recording or tests.
    pub fn new_headless() -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| PipelineError::Setup(format!("Failed to find suitable WGPU adapter: {}", e)))?;

        info!("WGPU adapter found: {:?}", adapter.get_info());

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("crt_pixel WGPU Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            ..Default::default()
        }))
        .map_err(|e| PipelineError::Setup(format!("Failed to create WGPU device: {}", e)))?;

        Ok(Self::from_parts(device, queue))
    }

    /// Wrap a device and queue owned by the host window.
    pub fn from_parts(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let texture_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Kernel Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                texture_entry(1),
                texture_entry(2),
                texture_entry(3),
                texture_entry(4),
                wgpu::BindGroupLayoutEntry {
                    binding: 5,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Kernel Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Kernel Linear Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let dummy = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Kernel Dummy Input"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let dummy_view = dummy.create_view(&wgpu::TextureViewDescriptor::default());

        let empty_uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Kernel Empty Uniforms"),
            size: EMPTY_UNIFORM_SIZE,
            usage: wgpu::BufferUsages::UNIFORM,
            mapped_at_creation: false,
        });

        Self {
            device,
            queue,
            bind_group_layout,
            pipeline_layout,
            sampler,
            dummy_view,
            empty_uniforms,
            uniform_arena: None,
            pipelines: HashMap::new(),
            images: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Backing texture of a buffer, e.g. to present or copy it elsewhere.
    pub fn texture(&self, id: ImageId) -> Option<&wgpu::Texture> {
        self.images.get(&id).map(|img| &img.texture)
    }

    /// Adopt a texture created by the host, typically the current surface
    /// texture, so it can be used as a pass output.
    pub fn import_texture(&mut self, texture: wgpu::Texture) -> Result<ImageBuffer> {
        let format = image_format(texture.format()).ok_or_else(|| {
            PipelineError::Unsupported(format!("texture format {:?}", texture.format()))
        })?;
        let desc = ImageDesc {
            label: "imported",
            width: texture.width(),
            height: texture.height(),
            format,
            mip_levels: texture.mip_level_count(),
            usage: image_usage(texture.usage()),
        };
        Ok(self.register(texture, &desc))
    }

    fn register(&mut self, texture: wgpu::Texture, desc: &ImageDesc) -> ImageBuffer {
        let id = ImageId(self.next_id);
        self.next_id += 1;
        let sampled = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.images.insert(
            id,
            GpuImage {
                texture,
                sampled,
                format: desc.format,
                mip_levels: desc.mip_levels,
            },
        );
        ImageBuffer::new(id, desc)
    }

    fn image(&self, id: ImageId) -> Result<&GpuImage> {
        self.images.get(&id).ok_or(PipelineError::UnknownImage(id))
    }

    fn create_pipeline(
        &self,
        kind: PassKind,
        module: &wgpu::ShaderModule,
        format: ImageFormat,
    ) -> wgpu::RenderPipeline {
        self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&format!("{} {:?} Pipeline", kind.name(), format)),
            layout: Some(&self.pipeline_layout),
            cache: None,
            vertex: wgpu::VertexState {
                module,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: texture_format(format),
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        })
    }

    fn ensure_arena(&mut self, size: u64) {
        let needed = align_to(size.max(1), EMPTY_UNIFORM_SIZE);
        if self.uniform_arena.as_ref().is_some_and(|b| b.size() >= needed) {
            return;
        }
        let size = needed.next_power_of_two();
        debug!("WgpuDevice: uniform arena grows to {} bytes", size);
        self.uniform_arena = Some(self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Kernel Uniform Arena"),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
    }

    fn bind_group(
        &self,
        uniforms: wgpu::BufferBinding,
        inputs: &[&wgpu::TextureView; MAX_PASS_INPUTS],
    ) -> wgpu::BindGroup {
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Kernel Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Buffer(uniforms),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(inputs[0]),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(inputs[1]),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(inputs[2]),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(inputs[3]),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }

    fn draw(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        label: &str,
        pipeline: &wgpu::RenderPipeline,
        bind_group: &wgpu::BindGroup,
        target: &wgpu::TextureView,
    ) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        render_pass.set_pipeline(pipeline);
        render_pass.set_bind_group(0, bind_group, &[]);
        render_pass.draw(0..3, 0..1);
    }

    fn encode_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        pass: &PassInvocation,
        offset: Option<u64>,
    ) -> Result<()> {
        let pipeline = self
            .pipelines
            .get(&(pass.kind, pass.output.format))
            .ok_or_else(|| {
                PipelineError::Setup(format!("kernel {} used before compile", pass.kind.name()))
            })?;
        let target = self.image(pass.output.id)?.level_view(0);

        let mut inputs = [&self.dummy_view; MAX_PASS_INPUTS];
        for (slot, view) in inputs.iter_mut().zip(&pass.inputs) {
            *slot = &self.image(view.id)?.sampled;
        }

        let uniforms = match (offset, &self.uniform_arena) {
            (Some(offset), Some(arena)) if !pass.uniforms.is_empty() => wgpu::BufferBinding {
                buffer: arena,
                offset,
                size: wgpu::BufferSize::new(pass.uniforms.len() as u64),
            },
            _ => self.empty_uniforms.as_entire_buffer_binding(),
        };
        let bind_group = self.bind_group(uniforms, &inputs);
        self.draw(encoder, pass.kind.name(), pipeline, &bind_group, &target);
        Ok(())
    }

    fn encode_mips(&self, encoder: &mut wgpu::CommandEncoder, view: ImageView) -> Result<()> {
        let image = self.image(view.id)?;
        let pipeline = self
            .pipelines
            .get(&(PassKind::MipDownsample, image.format))
            .ok_or_else(|| PipelineError::Setup("mip kernel not compiled".to_string()))?;
        for level in 1..image.mip_levels {
            let src = image.level_view(level - 1);
            let dst = image.level_view(level);
            let mut inputs = [&self.dummy_view; MAX_PASS_INPUTS];
            inputs[0] = &src;
            let bind_group =
                self.bind_group(self.empty_uniforms.as_entire_buffer_binding(), &inputs);
            self.draw(encoder, "mip_downsample", pipeline, &bind_group, &dst);
        }
        Ok(())
    }

    fn encode(
        &self,
        commands: &CommandList,
        offsets: &[Option<u64>],
    ) -> Result<wgpu::CommandBuffer> {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(commands.label()),
            });
        for (command, offset) in commands.commands().iter().zip(offsets) {
            match command {
                Command::Pass(pass) => self.encode_pass(&mut encoder, pass, *offset)?,
                Command::GenerateMips(view) => self.encode_mips(&mut encoder, *view)?,
            }
        }
        Ok(encoder.finish())
    }
}

impl RenderDevice for WgpuDevice {
    fn name(&self) -> &'static str {
        "wgpu"
    }

    fn create_image(&mut self, desc: &ImageDesc) -> Result<ImageBuffer> {
        let max = self.device.limits().max_texture_dimension_2d;
        if desc.width > max || desc.height > max {
            warn!(
                "WgpuDevice: {} of {}x{} exceeds max texture size {}",
                desc.label, desc.width, desc.height, max
            );
            return Err(PipelineError::Allocation {
                label: desc.label,
                width: desc.width,
                height: desc.height,
            });
        }

        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(desc.label),
            size: wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: desc.mip_levels,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: texture_format(desc.format),
            usage: texture_usage(desc.usage, desc.mip_levels),
            view_formats: &[],
        });
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            warn!("WgpuDevice: allocation of {} failed: {}", desc.label, err);
            return Err(PipelineError::Allocation {
                label: desc.label,
                width: desc.width,
                height: desc.height,
            });
        }
        Ok(self.register(texture, desc))
    }

    fn release_image(&mut self, image: ImageBuffer) {
        if self.images.remove(&image.id()).is_none() {
            debug!("WgpuDevice: release of unknown image {:?}", image.id());
        }
    }

    fn write_image(&mut self, image: ImageView, data: &[u8], bytes_per_row: u32) -> Result<()> {
        if !image.format.is_unorm8() {
            return Err(PipelineError::Unsupported(format!("upload to {:?}", image.format)));
        }
        let img = self.image(image.id)?;
        let row = bytes_per_row.max(image.width * 4);
        let needed = row as usize * (image.height as usize - 1) + image.width as usize * 4;
        if data.len() < needed {
            return Err(PipelineError::Unsupported(format!(
                "upload of {} bytes into {}x{}",
                data.len(),
                image.width,
                image.height
            )));
        }
        self.queue.write_texture(
            img.texture.as_image_copy(),
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(row),
                rows_per_image: Some(image.height),
            },
            wgpu::Extent3d {
                width: image.width,
                height: image.height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    fn read_image(&mut self, image: ImageView) -> Result<Vec<u8>> {
        if !image.format.is_unorm8() {
            return Err(PipelineError::Unsupported(format!("readback of {:?}", image.format)));
        }
        let img = self.image(image.id)?;
        let (width, height) = image.size();
        let unpadded_bytes_per_row = width * 4;

        // bytes_per_row must be a multiple of COPY_BYTES_PER_ROW_ALIGNMENT (256)
        let bytes_per_row = align_to(
            unpadded_bytes_per_row as u64,
            wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as u64,
        ) as u32;
        let staging_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Staging Buffer"),
            size: (bytes_per_row * height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            img.texture.as_image_copy(),
            wgpu::TexelCopyBufferInfo {
                buffer: &staging_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = staging_buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device
            .poll(wgpu::PollType::Wait)
            .map_err(|e| PipelineError::Device(format!("poll failed: {}", e)))?;

        match receiver.recv() {
            Ok(Ok(())) => {
                let data = buffer_slice.get_mapped_range();
                let row_size = unpadded_bytes_per_row as usize;
                let mut out = Vec::with_capacity(row_size * height as usize);
                for y in 0..height as usize {
                    let start = y * bytes_per_row as usize;
                    out.extend_from_slice(&data[start..start + row_size]);
                }
                drop(data);
                staging_buffer.unmap();
                Ok(out)
            }
            Ok(Err(e)) => Err(PipelineError::Device(format!("buffer map failed: {}", e))),
            Err(e) => Err(PipelineError::Device(format!("buffer map lost: {}", e))),
        }
    }

    fn compile(&mut self, kind: PassKind) -> Result<()> {
        if self.is_compiled(kind) {
            return Ok(());
        }
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(kind.name()),
            source: wgpu::ShaderSource::Wgsl(Cow::Owned(kernel_source(kind))),
        });
        let built: Vec<_> = ImageFormat::ALL
            .iter()
            .map(|format| (*format, self.create_pipeline(kind, &module, *format)))
            .collect();
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(PipelineError::Setup(format!(
                "kernel {} failed to build: {}",
                kind.name(),
                err
            )));
        }
        for (format, pipeline) in built {
            self.pipelines.insert((kind, format), pipeline);
        }
        info!("WgpuDevice: compiled kernel {}", kind.name());
        Ok(())
    }

    fn is_compiled(&self, kind: PassKind) -> bool {
        ImageFormat::ALL
            .iter()
            .all(|format| self.pipelines.contains_key(&(kind, *format)))
    }

    fn submit(&mut self, commands: CommandList) -> Result<()> {
        if commands
            .commands()
            .iter()
            .any(|c| matches!(c, Command::GenerateMips(_)))
        {
            self.compile(PassKind::MipDownsample)?;
        }

        let alignment = self.device.limits().min_uniform_buffer_offset_alignment as u64;
        let mut arena: Vec<u8> = Vec::new();
        let mut offsets = Vec::with_capacity(commands.len());
        for command in commands.commands() {
            match command {
                Command::Pass(pass) if !pass.uniforms.is_empty() => {
                    let offset = align_to(arena.len() as u64, alignment);
                    arena.resize(offset as usize, 0);
                    arena.extend_from_slice(&pass.uniforms);
                    offsets.push(Some(offset));
                }
                _ => offsets.push(None),
            }
        }
        if !arena.is_empty() {
            arena.resize(align_to(arena.len() as u64, 16) as usize, 0);
            self.ensure_arena(arena.len() as u64);
            if let Some(buffer) = &self.uniform_arena {
                self.queue.write_buffer(buffer, 0, &arena);
            }
        }

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let submitted = self
            .encode(&commands, &offsets)
            .map(|buffer| {
                self.queue.submit(std::iter::once(buffer));
            });
        let scope_error = pollster::block_on(self.device.pop_error_scope());
        submitted?;
        if let Some(err) = scope_error {
            return Err(PipelineError::Device(format!(
                "frame {} rejected: {}",
                commands.label(),
                err
            )));
        }
        Ok(())
    }
}
