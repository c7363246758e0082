// Offscreen color target, optionally multisampled with a single-sample resolve.

/// 8-bit unorm, non-sRGB: picking ids survive the round trip bit-exactly.
pub const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

pub struct RenderTarget {
    /// Single-sample texture that ends up holding the frame (copyable, sampleable).
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    msaa_view: Option<wgpu::TextureView>,
    sample_count: u32,
    width: u32,
    height: u32,
}

impl RenderTarget {
    pub fn new(device: &wgpu::Device, width: u32, height: u32, sample_count: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("render_target"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let msaa_view = (sample_count > 1).then(|| {
            device
                .create_texture(&wgpu::TextureDescriptor {
                    label: Some("render_target_msaa"),
                    size,
                    mip_level_count: 1,
                    sample_count,
                    dimension: wgpu::TextureDimension::D2,
                    format: TARGET_FORMAT,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                })
                .create_view(&wgpu::TextureViewDescriptor::default())
        });

        Self {
            texture,
            view,
            msaa_view,
            sample_count,
            width,
            height,
        }
    }

    /// Highest supported of 4x or 1x for `TARGET_FORMAT` on this adapter.
    pub fn pick_sample_count(adapter: &wgpu::Adapter, antialias: bool) -> u32 {
        if !antialias {
            return 1;
        }
        let features = adapter.get_texture_format_features(TARGET_FORMAT);
        if features.flags.sample_count_supported(4) {
            4
        } else {
            log::info!("4x MSAA unsupported for {TARGET_FORMAT:?}; rendering single-sampled");
            1
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Returns true if the textures were recreated.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) -> bool {
        if self.width == width.max(1) && self.height == height.max(1) {
            return false;
        }
        *self = Self::new(device, width, height, self.sample_count);
        true
    }

    /// Clears to `clear` when given, otherwise loads what the target holds.
    /// The multisampled texture is stored too, so later passes keep building on it.
    pub fn color_attachment(&self, clear: Option<wgpu::Color>) -> wgpu::RenderPassColorAttachment<'_> {
        let (view, resolve_target) = match &self.msaa_view {
            Some(msaa) => (msaa, Some(&self.view)),
            None => (&self.view, None),
        };
        wgpu::RenderPassColorAttachment {
            view,
            resolve_target,
            ops: wgpu::Operations {
                load: match clear {
                    Some(color) => wgpu::LoadOp::Clear(color),
                    None => wgpu::LoadOp::Load,
                },
                store: wgpu::StoreOp::Store,
            },
        }
    }
}
