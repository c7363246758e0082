// GPU mirrors of the attribute columns: one vertex buffer per attribute.

use splot_core::{BackendTier, PrimitiveKind, RenderError, RenderResult};

use crate::vertex::{self, VERTICES_PER_INSTANCE};

/// Repeat every `stride`-byte element `times` times in a row.
pub fn replicate(bytes: &[u8], stride: usize, times: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() * times);
    for element in bytes.chunks_exact(stride) {
        for _ in 0..times {
            out.extend_from_slice(element);
        }
    }
    out
}

pub struct GpuAttributeBuffers {
    kind: PrimitiveKind,
    tier: BackendTier,
    capacity: usize,
    buffers: Vec<wgpu::Buffer>,
}

/// Byte size of the largest attribute buffer for `capacity` instances, checked
/// against `max_buffer_size`. Legacy buffers hold one copy per vertex.
pub fn checked_buffer_size(
    kind: PrimitiveKind,
    tier: BackendTier,
    capacity: usize,
    max_buffer_size: u64,
) -> RenderResult<u64> {
    let per_instance = match tier {
        BackendTier::Legacy => VERTICES_PER_INSTANCE as u64,
        _ => 1,
    };
    let widest = vertex::attributes(kind)
        .iter()
        .map(|attribute| attribute.format.size())
        .max()
        .unwrap_or(0);
    // Never zero-sized, so binding an empty batch stays valid.
    let size = u64::try_from(capacity.max(1))
        .ok()
        .and_then(|n| n.checked_mul(per_instance))
        .and_then(|n| n.checked_mul(widest));
    match size {
        Some(size) if size <= max_buffer_size => Ok(size),
        _ => {
            log::warn!(
                "{kind} batch of {capacity} instances needs more than the {max_buffer_size}-byte buffer limit"
            );
            Err(RenderError::CapacityTooLarge { kind, capacity })
        }
    }
}

impl GpuAttributeBuffers {
    pub fn new(
        device: &wgpu::Device,
        kind: PrimitiveKind,
        tier: BackendTier,
        capacity: usize,
    ) -> RenderResult<Self> {
        let buffers = Self::allocate(device, kind, tier, capacity)?;
        Ok(Self {
            kind,
            tier,
            capacity,
            buffers,
        })
    }

    fn allocate(
        device: &wgpu::Device,
        kind: PrimitiveKind,
        tier: BackendTier,
        capacity: usize,
    ) -> RenderResult<Vec<wgpu::Buffer>> {
        checked_buffer_size(kind, tier, capacity, device.limits().max_buffer_size)?;
        let instances = capacity.max(1) as u64;
        let per_instance = match tier {
            BackendTier::Legacy => VERTICES_PER_INSTANCE as u64,
            _ => 1,
        };

        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let buffers = vertex::attributes(kind)
            .iter()
            .map(|attribute| {
                let label = format!("{kind}_attr{}", attribute.shader_location);
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(&label),
                    size: instances * per_instance * attribute.format.size(),
                    usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                })
            })
            .collect();
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            log::error!("Allocating {kind} buffers for {capacity} instances failed: {err}");
            return Err(RenderError::CapacityTooLarge { kind, capacity });
        }
        Ok(buffers)
    }

    /// Reallocate for a new capacity; old buffers are dropped. On failure the
    /// old buffers stay in place.
    pub fn resize(&mut self, device: &wgpu::Device, capacity: usize) -> RenderResult<()> {
        self.buffers = Self::allocate(device, self.kind, self.tier, capacity)?;
        self.capacity = capacity;
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Upload the filled prefix of each column (already trimmed to the batch count).
    pub fn upload(&self, queue: &wgpu::Queue, columns: &[&[u8]]) {
        for ((buffer, bytes), attribute) in self
            .buffers
            .iter()
            .zip(columns)
            .zip(vertex::attributes(self.kind))
        {
            if bytes.is_empty() {
                continue;
            }
            match self.tier {
                BackendTier::Legacy => {
                    let stride = attribute.format.size() as usize;
                    let expanded = replicate(bytes, stride, VERTICES_PER_INSTANCE as usize);
                    queue.write_buffer(buffer, 0, &expanded);
                }
                _ => queue.write_buffer(buffer, 0, bytes),
            }
        }
    }

    pub fn bind(&self, pass: &mut wgpu::RenderPass<'_>) {
        for (slot, buffer) in self.buffers.iter().enumerate() {
            pass.set_vertex_buffer(slot as u32, buffer.slice(..));
        }
    }
}
