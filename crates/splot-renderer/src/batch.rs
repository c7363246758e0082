// Struct-of-arrays instance storage and the per-frame state machine.
//
// Every attribute lives in its own contiguous column so the renderer can upload
// exactly the first `count` entries of each one.

use std::ops::Range;

use bytemuck::Pod;
use splot_core::{
    BackendTier, DotInstance, LineInstance, PrimitiveKind, PrimitiveSink, RectInstance,
    RenderError, RenderResult,
};

use crate::vertex::VERTICES_PER_INSTANCE;

/// Instance carries a scalar for colorscale mapping.
pub const FLAG_HAS_VALUE: u32 = 1 << 0;
/// Instance bypasses blending and is written at full opacity.
pub const FLAG_OPAQUE: u32 = 1 << 1;

fn instance_flags(value: Option<f32>, opaque: bool) -> u32 {
    let mut flags = 0;
    if value.is_some() {
        flags |= FLAG_HAS_VALUE;
    }
    if opaque {
        flags |= FLAG_OPAQUE;
    }
    flags
}

// ──────────────────────────────────────────────
// AttributeArray
// ──────────────────────────────────────────────

/// One fixed-size attribute column.
#[derive(Debug, Clone, Default)]
pub struct AttributeArray<T> {
    data: Vec<T>,
}

impl<T: Pod> AttributeArray<T> {
    /// Zero-filled column, or `None` when the allocation is refused.
    pub fn new(capacity: usize) -> Option<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(capacity).ok()?;
        data.resize(capacity, T::zeroed());
        Some(Self { data })
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Callers stay below `capacity()`; an out-of-bounds write is dropped.
    pub fn put(&mut self, index: usize, value: T) {
        debug_assert!(index < self.data.len(), "attribute write at {index} past capacity {}", self.data.len());
        if let Some(slot) = self.data.get_mut(index) {
            *slot = value;
        }
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.data.get(index).copied()
    }

    /// The first `count` entries.
    pub fn filled(&self, count: usize) -> &[T] {
        &self.data[..count.min(self.data.len())]
    }

    pub fn filled_bytes(&self, count: usize) -> &[u8] {
        bytemuck::cast_slice(self.filled(count))
    }
}

// ──────────────────────────────────────────────
// Per-kind columns
// ──────────────────────────────────────────────

/// Column set for one primitive kind. `column_bytes` lists columns in shader
/// location order, matching `vertex::attributes(Self::KIND)`.
pub trait InstanceColumns {
    type Instance;
    const KIND: PrimitiveKind;

    /// Fails with `CapacityTooLarge` when any column cannot be allocated.
    fn allocate(capacity: usize) -> RenderResult<Self>
    where
        Self: Sized;
    fn write(&mut self, index: usize, instance: &Self::Instance);
    fn column_bytes(&self, count: usize) -> Vec<&[u8]>;
    fn validate(instance: &Self::Instance) -> RenderResult<()>;
}

fn column<T: Pod>(kind: PrimitiveKind, capacity: usize) -> RenderResult<AttributeArray<T>> {
    AttributeArray::new(capacity).ok_or(RenderError::CapacityTooLarge { kind, capacity })
}

#[derive(Debug, Clone, Default)]
pub struct LineColumns {
    pub start: AttributeArray<[f32; 2]>,
    pub end: AttributeArray<[f32; 2]>,
    pub width: AttributeArray<f32>,
    pub color: AttributeArray<[f32; 4]>,
    pub value: AttributeArray<f32>,
    pub flags: AttributeArray<u32>,
}

impl InstanceColumns for LineColumns {
    type Instance = LineInstance;
    const KIND: PrimitiveKind = PrimitiveKind::Line;

    fn allocate(capacity: usize) -> RenderResult<Self> {
        Ok(Self {
            start: column(Self::KIND, capacity)?,
            end: column(Self::KIND, capacity)?,
            width: column(Self::KIND, capacity)?,
            color: column(Self::KIND, capacity)?,
            value: column(Self::KIND, capacity)?,
            flags: column(Self::KIND, capacity)?,
        })
    }

    fn write(&mut self, i: usize, line: &LineInstance) {
        self.start.put(i, line.start.to_array());
        self.end.put(i, line.end.to_array());
        self.width.put(i, line.width);
        self.color.put(i, line.color.to_array());
        self.value.put(i, line.value.unwrap_or(0.0));
        self.flags.put(i, instance_flags(line.value, line.opaque));
    }

    fn column_bytes(&self, count: usize) -> Vec<&[u8]> {
        vec![
            self.start.filled_bytes(count),
            self.end.filled_bytes(count),
            self.width.filled_bytes(count),
            self.color.filled_bytes(count),
            self.value.filled_bytes(count),
            self.flags.filled_bytes(count),
        ]
    }

    fn validate(line: &LineInstance) -> RenderResult<()> {
        line.validate()
    }
}

#[derive(Debug, Clone, Default)]
pub struct DotColumns {
    pub position: AttributeArray<[f32; 2]>,
    pub size: AttributeArray<f32>,
    pub color: AttributeArray<[f32; 4]>,
    pub symbol: AttributeArray<u32>,
    pub value: AttributeArray<f32>,
    pub flags: AttributeArray<u32>,
}

impl InstanceColumns for DotColumns {
    type Instance = DotInstance;
    const KIND: PrimitiveKind = PrimitiveKind::Dot;

    fn allocate(capacity: usize) -> RenderResult<Self> {
        Ok(Self {
            position: column(Self::KIND, capacity)?,
            size: column(Self::KIND, capacity)?,
            color: column(Self::KIND, capacity)?,
            symbol: column(Self::KIND, capacity)?,
            value: column(Self::KIND, capacity)?,
            flags: column(Self::KIND, capacity)?,
        })
    }

    fn write(&mut self, i: usize, dot: &DotInstance) {
        self.position.put(i, dot.position.to_array());
        self.size.put(i, dot.size);
        self.color.put(i, dot.color.to_array());
        self.symbol.put(i, dot.symbol.code());
        self.value.put(i, dot.value.unwrap_or(0.0));
        self.flags.put(i, instance_flags(dot.value, dot.opaque));
    }

    fn column_bytes(&self, count: usize) -> Vec<&[u8]> {
        vec![
            self.position.filled_bytes(count),
            self.size.filled_bytes(count),
            self.color.filled_bytes(count),
            self.symbol.filled_bytes(count),
            self.value.filled_bytes(count),
            self.flags.filled_bytes(count),
        ]
    }

    fn validate(dot: &DotInstance) -> RenderResult<()> {
        dot.validate()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RectColumns {
    pub start: AttributeArray<[f32; 2]>,
    pub end: AttributeArray<[f32; 2]>,
    pub color: AttributeArray<[f32; 4]>,
    pub value: AttributeArray<f32>,
    pub flags: AttributeArray<u32>,
}

impl InstanceColumns for RectColumns {
    type Instance = RectInstance;
    const KIND: PrimitiveKind = PrimitiveKind::Rect;

    fn allocate(capacity: usize) -> RenderResult<Self> {
        Ok(Self {
            start: column(Self::KIND, capacity)?,
            end: column(Self::KIND, capacity)?,
            color: column(Self::KIND, capacity)?,
            value: column(Self::KIND, capacity)?,
            flags: column(Self::KIND, capacity)?,
        })
    }

    fn write(&mut self, i: usize, rect: &RectInstance) {
        self.start.put(i, rect.start.to_array());
        self.end.put(i, rect.end.to_array());
        self.color.put(i, rect.color.to_array());
        self.value.put(i, rect.value.unwrap_or(0.0));
        self.flags.put(i, instance_flags(rect.value, rect.opaque));
    }

    fn column_bytes(&self, count: usize) -> Vec<&[u8]> {
        vec![
            self.start.filled_bytes(count),
            self.end.filled_bytes(count),
            self.color.filled_bytes(count),
            self.value.filled_bytes(count),
            self.flags.filled_bytes(count),
        ]
    }

    fn validate(rect: &RectInstance) -> RenderResult<()> {
        rect.validate()
    }
}

// ──────────────────────────────────────────────
// Batch
// ──────────────────────────────────────────────

/// Fixed-capacity batch of one primitive kind. `count` never exceeds `capacity`.
#[derive(Debug, Clone)]
pub struct Batch<C> {
    columns: C,
    count: usize,
    capacity: usize,
}

impl<C: InstanceColumns + Default> Batch<C> {
    pub fn new(capacity: usize) -> RenderResult<Self> {
        Ok(Self {
            columns: C::allocate(capacity)?,
            count: 0,
            capacity,
        })
    }

    /// Zero-capacity batch; every push is rejected.
    pub fn empty() -> Self {
        Self {
            columns: C::default(),
            count: 0,
            capacity: 0,
        }
    }

    pub fn push(&mut self, instance: &C::Instance) -> RenderResult<()> {
        C::validate(instance)?;
        if self.count >= self.capacity {
            return Err(RenderError::CapacityExceeded {
                kind: C::KIND,
                capacity: self.capacity,
            });
        }
        self.columns.write(self.count, instance);
        self.count += 1;
        Ok(())
    }

    /// Stale entries past `count` stay in memory but are never uploaded.
    pub fn reset(&mut self) {
        self.count = 0;
    }

    /// Reallocates every column; unflushed instances are dropped. On failure
    /// the batch keeps its old columns and contents.
    pub fn resize(&mut self, capacity: usize) -> RenderResult<()> {
        self.columns = C::allocate(capacity)?;
        self.capacity = capacity;
        self.count = 0;
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn columns(&self) -> &C {
        &self.columns
    }

    pub fn column_bytes(&self) -> Vec<&[u8]> {
        self.columns.column_bytes(self.count)
    }
}

// ──────────────────────────────────────────────
// Draw plan
// ──────────────────────────────────────────────

/// One instanced draw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    pub kind: PrimitiveKind,
    pub instances: u32,
}

impl DrawCall {
    /// Vertex and instance ranges dispatched for this call on `tier`.
    /// The legacy tier replicates attributes per vertex and draws one
    /// instance covering every quad.
    pub fn ranges(&self, tier: BackendTier) -> (Range<u32>, Range<u32>) {
        match tier {
            BackendTier::Legacy => (0..VERTICES_PER_INSTANCE * self.instances, 0..1),
            _ => (0..VERTICES_PER_INSTANCE, 0..self.instances),
        }
    }
}

/// What a `draw()` actually issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameStats {
    pub tier: BackendTier,
    pub calls: Vec<DrawCall>,
}

impl FrameStats {
    pub fn call_count(&self) -> usize {
        self.calls.len()
    }

    pub fn instances(&self, kind: PrimitiveKind) -> u32 {
        self.calls
            .iter()
            .filter(|c| c.kind == kind)
            .map(|c| c.instances)
            .sum()
    }

    pub fn total_instances(&self) -> u32 {
        self.calls.iter().map(|c| c.instances).sum()
    }
}

// ──────────────────────────────────────────────
// FrameBatches
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Idle,
    Building,
    Flushing,
}

/// The three batches of a frame plus the Idle -> Building -> Flushing -> Idle cycle.
#[derive(Debug, Clone)]
pub struct FrameBatches {
    pub lines: Batch<LineColumns>,
    pub dots: Batch<DotColumns>,
    pub rects: Batch<RectColumns>,
    state: FrameState,
}

impl FrameBatches {
    pub fn new(max_lines: usize, max_dots: usize, max_rects: usize) -> RenderResult<Self> {
        Ok(Self {
            lines: Batch::new(max_lines)?,
            dots: Batch::new(max_dots)?,
            rects: Batch::new(max_rects)?,
            state: FrameState::Idle,
        })
    }

    /// Batches of an inert renderer: zero capacity everywhere.
    pub fn empty() -> Self {
        Self {
            lines: Batch::empty(),
            dots: Batch::empty(),
            rects: Batch::empty(),
            state: FrameState::Idle,
        }
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn count(&self, kind: PrimitiveKind) -> usize {
        match kind {
            PrimitiveKind::Line => self.lines.count(),
            PrimitiveKind::Dot => self.dots.count(),
            PrimitiveKind::Rect => self.rects.count(),
        }
    }

    pub fn capacity(&self, kind: PrimitiveKind) -> usize {
        match kind {
            PrimitiveKind::Line => self.lines.capacity(),
            PrimitiveKind::Dot => self.dots.capacity(),
            PrimitiveKind::Rect => self.rects.capacity(),
        }
    }

    pub fn column_bytes(&self, kind: PrimitiveKind) -> Vec<&[u8]> {
        match kind {
            PrimitiveKind::Line => self.lines.column_bytes(),
            PrimitiveKind::Dot => self.dots.column_bytes(),
            PrimitiveKind::Rect => self.rects.column_bytes(),
        }
    }

    pub fn resize(&mut self, kind: PrimitiveKind, capacity: usize) -> RenderResult<()> {
        match kind {
            PrimitiveKind::Line => self.lines.resize(capacity)?,
            PrimitiveKind::Dot => self.dots.resize(capacity)?,
            PrimitiveKind::Rect => self.rects.resize(capacity)?,
        }
        log::info!("Resized {kind} batch to {capacity} instances");
        Ok(())
    }

    /// Enter Flushing and plan one draw call per non-empty kind, in draw order.
    pub fn begin_flush(&mut self) -> Vec<DrawCall> {
        self.state = FrameState::Flushing;
        PrimitiveKind::DRAW_ORDER
            .iter()
            .filter_map(|&kind| {
                let count = self.count(kind);
                (count > 0).then_some(DrawCall {
                    kind,
                    instances: count as u32,
                })
            })
            .collect()
    }

    /// Reset every count and return to Idle.
    pub fn finish_flush(&mut self) {
        self.lines.reset();
        self.dots.reset();
        self.rects.reset();
        self.state = FrameState::Idle;
    }

    fn mark_building(&mut self) {
        self.state = FrameState::Building;
    }
}

impl PrimitiveSink for FrameBatches {
    fn push_line(&mut self, line: LineInstance) -> RenderResult<()> {
        self.lines.push(&line)?;
        self.mark_building();
        Ok(())
    }

    fn push_dot(&mut self, dot: DotInstance) -> RenderResult<()> {
        self.dots.push(&dot)?;
        self.mark_building();
        Ok(())
    }

    fn push_rect(&mut self, rect: RectInstance) -> RenderResult<()> {
        self.rects.push(&rect)?;
        self.mark_building();
        Ok(())
    }
}
