use std::fmt;
use std::time::Instant;

/// One captured 8-bit grayscale image.
///
/// Frames are moved, never shared: the producer owns a frame while filling it
/// and gives it up to the consumer through `FrameChannel`.
#[derive(Debug)]
pub struct Frame {
    sequence: u64,
    captured_at: Instant,
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Frame {
    pub fn new(sequence: u64, width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            sequence,
            captured_at: Instant::now(),
            width,
            height,
            pixels,
        }
    }

    /// A frame with every pixel set to `value`.
    pub fn filled(sequence: u64, width: u32, height: u32, value: u8) -> Self {
        Self::new(
            sequence,
            width,
            height,
            vec![value; width as usize * height as usize],
        )
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row-major pixel data, `width * height` bytes.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// True when the buffer length matches the declared dimensions.
    pub fn is_well_formed(&self) -> bool {
        self.pixels.len() == self.width as usize * self.height as usize
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame #{} ({}x{})", self.sequence, self.width, self.height)
    }
}
