use crate::foundation::core::FrameSize;

/// Axis-aligned region in the video's native pixel coordinate space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Geometry {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
}

impl Geometry {
    /// Construct a geometry from its four components.
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Return `true` when both dimensions are strictly greater than `min_extent`.
    pub fn exceeds(&self, min_extent: i32) -> bool {
        self.width > min_extent && self.height > min_extent
    }

    /// Convert to a kurbo rectangle.
    pub fn to_rect(&self) -> kurbo::Rect {
        kurbo::Rect::new(
            f64::from(self.x),
            f64::from(self.y),
            f64::from(self.x) + f64::from(self.width),
            f64::from(self.y) + f64::from(self.height),
        )
    }

    /// Clip to the frame bounds; `None` when nothing of the region is inside the frame.
    pub fn clip_to(&self, size: FrameSize) -> Option<Self> {
        let r = self.to_rect().intersect(size.bounds());
        if r.width() <= 0.0 || r.height() <= 0.0 {
            return None;
        }
        // Inputs are integral and the frame is anchored at 0, so the intersection stays integral.
        Some(Self {
            x: r.x0 as i32,
            y: r.y0 as i32,
            width: r.width() as i32,
            height: r.height() as i32,
        })
    }
}
