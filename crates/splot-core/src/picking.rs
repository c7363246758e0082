// Picking ids: 24-bit integers encoded as RGB colors.
// Id 0 is reserved for "nothing here" so a cleared black target reads as empty.

use crate::{Color, RenderError, RenderResult};

pub const MAX_PICK_ID: u32 = 0x00FF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PickId(u32);

impl PickId {
    pub fn new(raw: u32) -> Option<Self> {
        (raw != 0 && raw <= MAX_PICK_ID).then_some(Self(raw))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn to_rgb(self) -> [u8; 3] {
        [(self.0 >> 16) as u8, (self.0 >> 8) as u8, self.0 as u8]
    }

    /// Flat color carrying this id; exact once written to an 8-bit unorm target.
    pub fn to_color(self) -> Color {
        let [r, g, b] = self.to_rgb();
        Color::from_rgba8([r, g, b, 255])
    }

    /// Decode a read-back pixel. Black (the clear color) decodes to `None`.
    pub fn from_rgb(rgb: [u8; 3]) -> Option<Self> {
        Self::new(((rgb[0] as u32) << 16) | ((rgb[1] as u32) << 8) | rgb[2] as u32)
    }
}

/// Hands out monotonically increasing ids. Owned by the caller and reset
/// explicitly, typically whenever the picked data set is rebuilt.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: u32,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn allocate(&mut self) -> RenderResult<PickId> {
        let id = PickId::new(self.next).ok_or(RenderError::IdsExhausted)?;
        self.next += 1;
        Ok(id)
    }

    pub fn reset(&mut self) {
        self.next = 1;
    }

    /// Number of ids handed out since the last reset.
    pub fn allocated(&self) -> u32 {
        self.next - 1
    }
}
