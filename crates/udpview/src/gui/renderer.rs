//! Draws a frame texture onto a window with wgpu.

use std::rc::Rc;

use wgpu::*;
use winit::{dpi::PhysicalSize, event_loop::EventLoopWindowTarget, window::WindowBuilder};

use crate::frame::{Resolution, BYTES_PER_PIXEL};

use super::gpu::Gpu;

const BACKGROUND: Color = Color::BLACK;

pub struct Window {
    pub(crate) win: winit::window::Window,
    resolution: Resolution,
}

impl Window {
    pub fn open<T>(
        event_loop: &EventLoopWindowTarget<T>,
        title: &str,
        resolution: Resolution,
    ) -> anyhow::Result<Self> {
        let win = WindowBuilder::new()
            // Frame size dictates the window size.
            .with_resizable(false)
            .with_inner_size(PhysicalSize::new(resolution.width(), resolution.height()))
            .with_title(title)
            .build(event_loop)?;
        Ok(Self { win, resolution })
    }
}

struct Texture {
    inner: wgpu::Texture,
    size: Extent3d,
    label: String,
}

impl Texture {
    const FORMAT: TextureFormat = TextureFormat::Rgba8UnormSrgb;

    fn empty(gpu: &Gpu, label: &str) -> Self {
        let size = Extent3d::default();
        Self {
            label: label.to_string(),
            inner: Self::create(gpu, label, size),
            size,
        }
    }

    fn create(gpu: &Gpu, label: &str, size: Extent3d) -> wgpu::Texture {
        gpu.device().create_texture(&TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: Self::FORMAT,
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        })
    }

    /// Uploads `data`, reallocating the texture if `size` changed. Returns whether it did.
    fn update(&mut self, gpu: &Gpu, size: Extent3d, data: &[u8]) -> bool {
        assert_eq!(
            size.width as usize * size.height as usize * BYTES_PER_PIXEL,
            data.len()
        );

        let mut reallocated = false;
        if self.size != size {
            log::trace!(
                "reallocating texture '{}' ({}x{} -> {}x{})",
                self.label,
                self.size.width,
                self.size.height,
                size.width,
                size.height
            );
            reallocated = true;
            self.inner = Self::create(gpu, &self.label, size);
            self.size = size;
        }

        gpu.queue().write_texture(
            ImageCopyTexture {
                texture: &self.inner,
                mip_level: 0,
                origin: Origin3d::ZERO,
                aspect: TextureAspect::All,
            },
            data,
            ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(size.width * BYTES_PER_PIXEL as u32),
                rows_per_image: None,
            },
            size,
        );

        reallocated
    }
}

fn create_bind_group(device: &Device, layout: &BindGroupLayout, texture: &Texture) -> BindGroup {
    let sampler = device.create_sampler(&SamplerDescriptor::default());
    device.create_bind_group(&BindGroupDescriptor {
        label: Some("frame_bind_group"),
        layout,
        entries: &[
            BindGroupEntry {
                binding: 0,
                resource: BindingResource::TextureView(
                    &texture.inner.create_view(&Default::default()),
                ),
            },
            BindGroupEntry {
                binding: 1,
                resource: BindingResource::Sampler(&sampler),
            },
        ],
    })
}

/// Renders the most recent frame of a single window.
pub struct Renderer {
    gpu: Rc<Gpu>,
    surface: Surface,
    surface_format: TextureFormat,
    pipeline: RenderPipeline,

    texture: Texture,
    bind_group_layout: BindGroupLayout,
    bind_group: BindGroup,

    /// Surface must be destroyed before `Window`.
    window: Window,
}

impl Renderer {
    pub fn new(window: Window, gpu: Rc<Gpu>) -> anyhow::Result<Self> {
        // SAFETY: `window` is stored in the `Renderer` and dropped after `surface`.
        let surface = unsafe { gpu.instance().create_surface(&window.win)? };
        let surface_format = *surface
            .get_capabilities(gpu.adapter())
            .formats
            .first()
            .ok_or_else(|| anyhow::anyhow!("adapter cannot render to window surface"))?;

        let device = gpu.device();
        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("frame shader"),
            source: ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("frame_bind_group_layout"),
            entries: &[
                BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Texture {
                        sample_type: TextureSampleType::Float { filterable: false },
                        view_dimension: TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(SamplerBindingType::NonFiltering),
                    count: None,
                },
            ],
        });

        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("textured_quad"),
            layout: Some(&device.create_pipeline_layout(&PipelineLayoutDescriptor {
                label: None,
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            })),
            vertex: VertexState {
                module: &shader,
                entry_point: "vert",
                buffers: &[],
            },
            fragment: Some(FragmentState {
                module: &shader,
                entry_point: "frag",
                targets: &[Some(ColorTargetState {
                    format: surface_format,
                    write_mask: ColorWrites::ALL,
                    blend: None,
                })],
            }),
            primitive: PrimitiveState::default(),
            depth_stencil: None,
            multisample: Default::default(),
            multiview: None,
        });

        let texture = Texture::empty(&gpu, "frame");
        let bind_group = create_bind_group(device, &bind_group_layout, &texture);

        let mut this = Self {
            gpu,
            surface,
            surface_format,
            pipeline,
            texture,
            bind_group_layout,
            bind_group,
            window,
        };
        this.configure_surface();
        Ok(this)
    }

    pub fn window(&self) -> &winit::window::Window {
        &self.window.win
    }

    pub fn redraw(&mut self) {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(err @ (SurfaceError::Outdated | SurfaceError::Lost)) => {
                log::debug!("surface error: {}", err);
                self.configure_surface();
                match self.surface.get_current_texture() {
                    Ok(frame) => frame,
                    Err(e) => {
                        log::error!("failed to acquire frame after reconfiguring surface: {e}");
                        return;
                    }
                }
            }
            Err(e) => {
                log::warn!("failed to acquire frame: {e}");
                return;
            }
        };
        let view = frame.texture.create_view(&TextureViewDescriptor::default());
        let mut encoder = self
            .gpu
            .device()
            .create_command_encoder(&CommandEncoderDescriptor { label: None });
        {
            let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: None,
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(BACKGROUND),
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });

            rpass.set_pipeline(&self.pipeline);
            rpass.set_bind_group(0, &self.bind_group, &[]);
            rpass.draw(0..3, 0..1);
        }

        self.gpu.queue().submit([encoder.finish()]);
        frame.present();
    }

    /// Uploads a new frame. If its resolution differs from the last one, the window is resized
    /// to match.
    pub fn update_texture(&mut self, res: Resolution, data: &[u8]) {
        let size = Extent3d {
            width: res.width(),
            height: res.height(),
            depth_or_array_layers: 1,
        };
        if self.texture.update(&self.gpu, size, data) {
            // The bind group refers to the old texture and has to be recreated.
            self.bind_group =
                create_bind_group(self.gpu.device(), &self.bind_group_layout, &self.texture);
        }

        if res != self.window.resolution {
            log::debug!(
                "frame resolution changed from {} to {}, resizing window",
                self.window.resolution,
                res,
            );
            self.window.resolution = res;
            self.window
                .win
                .set_inner_size(PhysicalSize::new(res.width(), res.height()));
            self.configure_surface();
        }
    }

    fn configure_surface(&mut self) {
        let res = self.window.resolution;
        log::debug!(
            "configuring target surface at {} (format: {:?})",
            res,
            self.surface_format,
        );
        let config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: self.surface_format,
            width: res.width(),
            height: res.height(),
            present_mode: PresentMode::Fifo,
            alpha_mode: CompositeAlphaMode::Auto,
            view_formats: Vec::new(),
        };

        self.surface.configure(self.gpu.device(), &config);
    }
}
