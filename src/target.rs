use std::fmt;

use crate::error::LocatorError;
use crate::frame::Frame;

/// Integer pixel coordinate, origin top-left, y growing downwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl PixelPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for PixelPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Axis-aligned box in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Center with integer division, so a 5px wide box at x=0 centers on 2.
    pub fn center(&self) -> PixelPoint {
        PixelPoint::new(self.x + self.width / 2, self.y + self.height / 2)
    }

    pub fn area(&self) -> i64 {
        i64::from(self.width.max(0)) * i64::from(self.height.max(0))
    }
}

/// One detection, recomputed for every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetCandidate {
    pub id: u32,
    pub bounding_box: BoundingBox,
    pub center: PixelPoint,
    /// Detector score in [0, 1].
    pub confidence: f32,
}

impl TargetCandidate {
    pub fn from_bounding_box(id: u32, bounding_box: BoundingBox, confidence: f32) -> Self {
        Self {
            id,
            bounding_box,
            center: bounding_box.center(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// Finds targets in a frame.
///
/// Candidates are returned in locator-defined order; the tracking loop
/// follows the first one. An empty vector means nothing was found.
pub trait TargetLocator {
    fn locate(&mut self, frame: &Frame) -> Result<Vec<TargetCandidate>, LocatorError>;
}

impl<L: TargetLocator + ?Sized> TargetLocator for Box<L> {
    fn locate(&mut self, frame: &Frame) -> Result<Vec<TargetCandidate>, LocatorError> {
        (**self).locate(frame)
    }
}
