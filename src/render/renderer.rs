//! GPU backend for the frame compositor
//!
//! `GpuRenderer` owns the offscreen targets and pipelines. Each frame borrows
//! it as a [`GpuFrame`], which records the passes the compositor asks for into
//! one command encoder and presents on [`GpuFrame::present`].

use std::convert::Infallible;

use wgpu::util::DeviceExt;

use crate::compositor::RenderBackend;
use crate::gpu_context::GpuContext;
use crate::output::{CompositeParams, QuadSurface, SolidMesh, SurfaceVertex, TargetId};
use crate::output::surface::QUAD_INDICES;
use crate::scene::SceneDescriptor;

use super::mesh::{build_scene_mesh, SceneUniforms};
use super::pipelines::{CompositePipeline, ScenePipeline, SolidPipeline};
use super::targets::{DepthTarget, MipGenerator, OffscreenTarget, OFFSCREEN_FORMAT};

pub struct GpuRenderer {
    color: OffscreenTarget,
    mask: OffscreenTarget,
    depth: DepthTarget,
    /// Zero-initialized 1x1 target sampled for unbound sources
    blank: OffscreenTarget,
    mips: MipGenerator,

    mask_pipeline: SolidPipeline,
    overlay_pipeline: SolidPipeline,
    scene_pipeline: ScenePipeline,
    composite_pipeline: CompositePipeline,
    composite_bind_group: wgpu::BindGroup,
    /// (colour, mask) sources the bind group was built for
    composite_sources: (Option<TargetId>, Option<TargetId>),

    surface_vertex_buffer: wgpu::Buffer,
    surface_index_buffer: wgpu::Buffer,
    /// Revision of the quad last uploaded
    uploaded_revision: Option<u64>,

    clear_color: wgpu::Color,
}

impl GpuRenderer {
    /// Create targets of `buffer_size` squared and pipelines for `gpu`'s surface
    pub fn new(gpu: &GpuContext, buffer_size: u32) -> Self {
        let device = &gpu.device;

        let color = OffscreenTarget::new(device, buffer_size, "Scene Color Target");
        let mask = OffscreenTarget::new(device, buffer_size, "Mask Target");
        let depth = DepthTarget::new(device, buffer_size);
        let blank = OffscreenTarget::new(device, 1, "Blank Target");
        tracing::info!(
            "Offscreen targets: {}x{}, {} mip levels",
            color.size,
            color.size,
            color.mip_views.len()
        );

        let composite_pipeline = CompositePipeline::new(device, gpu.surface_format);
        let composite_bind_group = composite_pipeline.bind(device, &blank.view, &blank.view);

        let surface_vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Surface Vertex Buffer"),
            size: SurfaceVertex::SIZE * 4,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let surface_index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Surface Index Buffer"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            mips: MipGenerator::new(device),
            mask_pipeline: SolidPipeline::new(device, OFFSCREEN_FORMAT, "Mask Pipeline"),
            overlay_pipeline: SolidPipeline::new(device, gpu.surface_format, "Overlay Pipeline"),
            scene_pipeline: ScenePipeline::new(device, OFFSCREEN_FORMAT),
            composite_pipeline,
            composite_bind_group,
            composite_sources: (None, None),
            color,
            mask,
            depth,
            blank,
            surface_vertex_buffer,
            surface_index_buffer,
            uploaded_revision: None,
            clear_color: wgpu::Color::BLACK,
        }
    }

    /// Colour the output is cleared to outside the quad
    pub fn set_clear_color(&mut self, rgb: [f64; 3]) {
        self.clear_color = wgpu::Color {
            r: rgb[0],
            g: rgb[1],
            b: rgb[2],
            a: 1.0,
        };
    }

    fn source_view(&self, source: Option<TargetId>) -> &wgpu::TextureView {
        match source {
            Some(TargetId::SceneColor) => &self.color.view,
            Some(TargetId::Mask) => &self.mask.view,
            None => &self.blank.view,
        }
    }

    /// Rebuild the composite bind group when the surface's sources changed
    fn bind_sources(&mut self, device: &wgpu::Device, surface: &QuadSurface) {
        let sources = (surface.color_source(), surface.mask_source());
        if self.composite_sources == sources {
            return;
        }
        tracing::debug!(color = ?sources.0, mask = ?sources.1, "Binding surface sources");
        self.composite_bind_group = self.composite_pipeline.bind(
            device,
            self.source_view(sources.0),
            self.source_view(sources.1),
        );
        self.composite_sources = sources;
    }

    /// Acquire the next surface texture and start recording a frame
    pub fn begin_frame<'a>(
        &'a mut self,
        gpu: &'a GpuContext,
    ) -> Result<GpuFrame<'a>, wgpu::SurfaceError> {
        let output = gpu.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        Ok(GpuFrame {
            renderer: self,
            gpu,
            encoder,
            output,
            view,
        })
    }
}

/// One frame being recorded
pub struct GpuFrame<'a> {
    renderer: &'a mut GpuRenderer,
    gpu: &'a GpuContext,
    encoder: wgpu::CommandEncoder,
    output: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
}

impl GpuFrame<'_> {
    /// Submit the recorded passes and show the frame
    pub fn present(self) {
        self.gpu.queue.submit(std::iter::once(self.encoder.finish()));
        self.output.present();
    }

    fn solid_buffers(&self, mesh: &SolidMesh, label: &str) -> (wgpu::Buffer, wgpu::Buffer) {
        let device = &self.gpu.device;
        let vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        (vertices, indices)
    }
}

impl RenderBackend for GpuFrame<'_> {
    type Error = Infallible;

    fn render_mask(&mut self, mesh: &SolidMesh) -> Result<(), Self::Error> {
        let buffers = (!mesh.is_empty()).then(|| self.solid_buffers(mesh, "Mask Mesh Buffer"));
        let renderer = &*self.renderer;

        {
            let mut pass = self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Mask Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: renderer.mask.base_view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let Some((vertices, indices)) = &buffers {
                pass.set_pipeline(&renderer.mask_pipeline.pipeline);
                pass.set_vertex_buffer(0, vertices.slice(..));
                pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..mesh.indices.len() as u32, 0, 0..1);
            }
        }

        renderer
            .mips
            .generate(&self.gpu.device, &mut self.encoder, &renderer.mask);
        Ok(())
    }

    fn render_scene(&mut self, scene: &SceneDescriptor) -> Result<(), Self::Error> {
        let device = &self.gpu.device;
        let renderer = &*self.renderer;

        let uniforms = SceneUniforms::new(scene, 1.0);
        self.gpu.queue.write_buffer(
            &renderer.scene_pipeline.uniform_buffer,
            0,
            bytemuck::bytes_of(&uniforms),
        );

        let vertices = build_scene_mesh(scene);
        let vertex_buffer = (!vertices.is_empty()).then(|| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Scene Vertex Buffer"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            })
        });

        {
            let mut pass = self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: renderer.color.base_view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &renderer.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let Some(buffer) = &vertex_buffer {
                pass.set_pipeline(&renderer.scene_pipeline.pipeline);
                pass.set_bind_group(0, &renderer.scene_pipeline.bind_group, &[]);
                pass.set_vertex_buffer(0, buffer.slice(..));
                pass.draw(0..vertices.len() as u32, 0..1);
            }
        }

        renderer.mips.generate(device, &mut self.encoder, &renderer.color);
        Ok(())
    }

    fn render_surface(
        &mut self,
        surface: &QuadSurface,
        params: CompositeParams,
        overlay: &SolidMesh,
    ) -> Result<(), Self::Error> {
        let queue = &self.gpu.queue;
        self.renderer.bind_sources(&self.gpu.device, surface);

        if self.renderer.uploaded_revision != Some(surface.revision()) {
            queue.write_buffer(
                &self.renderer.surface_vertex_buffer,
                0,
                bytemuck::cast_slice(&surface.vertices()),
            );
            self.renderer.uploaded_revision = Some(surface.revision());
        }
        queue.write_buffer(
            &self.renderer.composite_pipeline.uniform_buffer,
            0,
            bytemuck::bytes_of(&params.to_uniforms()),
        );

        let overlay_buffers =
            (!overlay.is_empty()).then(|| self.solid_buffers(overlay, "Overlay Mesh Buffer"));
        let renderer = &*self.renderer;

        let mut pass = self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Surface Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(renderer.clear_color),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&renderer.composite_pipeline.pipeline);
        pass.set_bind_group(0, &renderer.composite_bind_group, &[]);
        pass.set_vertex_buffer(0, renderer.surface_vertex_buffer.slice(..));
        pass.set_index_buffer(
            renderer.surface_index_buffer.slice(..),
            wgpu::IndexFormat::Uint32,
        );
        pass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, 0..1);

        if let Some((vertices, indices)) = &overlay_buffers {
            pass.set_pipeline(&renderer.overlay_pipeline.pipeline);
            pass.set_vertex_buffer(0, vertices.slice(..));
            pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..overlay.indices.len() as u32, 0, 0..1);
        }

        Ok(())
    }
}
