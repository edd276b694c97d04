//! Split-screen layout: channel → panel rectangle.
//!
//! ```text
//!  ┌──────────┬─────────────────────┐
//!  │ clock    │                     │
//!  │ date     │                     │
//!  │ weather  │     right page      │
//!  │ sensor   │                     │
//!  │ battery  │                     │
//!  │ message  │                     │
//!  └──────────┴─────────────────────┘
//!   ½ width below 600 px, ⅓ otherwise
//! ```

use super::channel::ChannelId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: u16,
    pub y: u16,
    pub w: u16,
    pub h: u16,
}

impl Rect {
    pub const fn new(x: u16, y: u16, w: u16, h: u16) -> Self {
        Self { x, y, w, h }
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// Clip to a `width` × `height` screen.
    fn clipped(self, width: u16, height: u16) -> Self {
        let x = self.x.min(width);
        let y = self.y.min(height);
        Self {
            x,
            y,
            w: self.w.min(width - x),
            h: self.h.min(height - y),
        }
    }
}

/// (y, h) bands for the left column, in `ChannelId` order up to `Message`.
const SHORT_BANDS: [(u16, u16); 6] = [(0, 90), (90, 30), (120, 70), (190, 50), (240, 30), (270, 30)];
const TALL_BANDS: [(u16, u16); 6] = [(0, 150), (150, 60), (210, 110), (320, 80), (400, 40), (440, 40)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub width: u16,
    pub height: u16,
    pub left_width: u16,
    regions: [Rect; ChannelId::COUNT],
    animation: Rect,
}

impl Layout {
    pub fn new(width: u16, height: u16) -> Self {
        let left_width = if width < 600 { width / 2 } else { width / 3 };
        let right_width = width - left_width;
        let short = height < 400;
        let bands = if short { SHORT_BANDS } else { TALL_BANDS };

        let mut regions = [Rect::default(); ChannelId::COUNT];
        for (slot, (y, h)) in regions.iter_mut().zip(bands) {
            *slot = Rect::new(0, y, left_width, h).clipped(width, height);
        }
        regions[ChannelId::RightPage as usize] = Rect::new(left_width, 0, right_width, height);

        let badge = if short { 24 } else { 40 };
        let animation =
            Rect::new(left_width.saturating_sub(badge), 0, badge, badge).clipped(width, height);

        Self {
            width,
            height,
            left_width,
            regions,
            animation,
        }
    }

    pub fn region(&self, id: ChannelId) -> Rect {
        self.regions[id as usize]
    }

    /// Where the new-message animation is drawn (top-right of the left panel).
    pub fn animation_region(&self) -> Rect {
        self.animation
    }

    pub fn full_screen(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }
}
