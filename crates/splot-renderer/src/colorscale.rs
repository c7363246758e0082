// 256x1 RGBA lookup texture holding the active colorscale gamut.

use splot_core::{Gamut, GAMUT_SIZE};

pub const COLORSCALE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

pub struct ColorScaleTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl ColorScaleTexture {
    pub fn new(device: &wgpu::Device) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("colorscale"),
            size: Self::extent(),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: COLORSCALE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        // Nearest lookup, clamped at both ends of the gamut.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("colorscale_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }

    fn extent() -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: GAMUT_SIZE as u32,
            height: 1,
            depth_or_array_layers: 1,
        }
    }

    pub fn upload(&self, queue: &wgpu::Queue, gamut: &Gamut) {
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            gamut.as_bytes(),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(GAMUT_SIZE as u32 * 4),
                rows_per_image: Some(1),
            },
            Self::extent(),
        );
    }
}
