//! Bench stand-ins for the camera and the detector.
//!
//! `SyntheticSource` renders a bright disc wandering over a dark background
//! at camera cadence; `BrightBlobLocator` finds it again by thresholding.
//! Together they let the whole loop run on a desk without a camera.

use std::f64::consts::TAU;
use std::thread;
use std::time::{Duration, Instant};

use crate::acquisition::FrameSource;
use crate::error::{AcquisitionError, LocatorError};
use crate::frame::Frame;
use crate::target::{BoundingBox, PixelPoint, TargetCandidate, TargetLocator};

const BACKGROUND: u8 = 20;
const FOREGROUND: u8 = 240;
/// Lissajous frequencies (Hz) of the simulated target.
const FREQ_X: f64 = 0.11;
const FREQ_Y: f64 = 0.07;

/// Renders frames of a disc moving on a Lissajous path.
pub struct SyntheticSource {
    width: u32,
    height: u32,
    fps: f64,
    radius: u32,
    sequence: u64,
    frame_limit: Option<u64>,
    paced: bool,
    next_due: Instant,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32, fps: f64) -> Self {
        Self {
            width,
            height,
            fps,
            radius: (width.min(height) / 16).max(2),
            sequence: 0,
            frame_limit: None,
            paced: true,
            next_due: Instant::now(),
        }
    }

    /// End the stream after `frames` frames.
    pub fn with_frame_limit(mut self, frames: u64) -> Self {
        self.frame_limit = Some(frames);
        self
    }

    /// Produce frames as fast as possible instead of at `fps`.
    pub fn unpaced(mut self) -> Self {
        self.paced = false;
        self
    }

    /// Where the disc is drawn in frame `sequence`.
    pub fn target_at(&self, sequence: u64) -> PixelPoint {
        let t = sequence as f64 / self.fps;
        let half_w = f64::from(self.width) / 2.0;
        let half_h = f64::from(self.height) / 2.0;
        let amp_x = (half_w - f64::from(self.radius)) * 0.8;
        let amp_y = (half_h - f64::from(self.radius)) * 0.8;

        let x = half_w + amp_x * (TAU * FREQ_X * t).sin();
        let y = half_h + amp_y * (TAU * FREQ_Y * t + 1.0).sin();
        PixelPoint::new(x.round() as i32, y.round() as i32)
    }

    fn render(&self, center: PixelPoint) -> Vec<u8> {
        let mut pixels = vec![BACKGROUND; self.width as usize * self.height as usize];
        let r = self.radius as i32;

        for y in (center.y - r).max(0)..=(center.y + r).min(self.height as i32 - 1) {
            for x in (center.x - r).max(0)..=(center.x + r).min(self.width as i32 - 1) {
                let (dx, dy) = (x - center.x, y - center.y);
                if dx * dx + dy * dy <= r * r {
                    pixels[y as usize * self.width as usize + x as usize] = FOREGROUND;
                }
            }
        }
        pixels
    }
}

impl FrameSource for SyntheticSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, AcquisitionError> {
        if self.frame_limit.is_some_and(|limit| self.sequence >= limit) {
            return Ok(None);
        }

        if self.paced {
            let now = Instant::now();
            if self.next_due > now {
                thread::sleep(self.next_due - now);
            }
            self.next_due = self.next_due.max(now) + Duration::from_secs_f64(1.0 / self.fps);
        }

        let center = self.target_at(self.sequence);
        let frame = Frame::new(self.sequence, self.width, self.height, self.render(center));
        self.sequence += 1;
        Ok(Some(frame))
    }
}

/// Finds the single bright blob in a grayscale frame.
///
/// Confidence is how much of the blob's bounding box is filled, so a solid
/// disc scores about 0.78 and scattered noise scores low.
#[derive(Debug, Clone)]
pub struct BrightBlobLocator {
    threshold: u8,
    min_pixels: usize,
    confidence_threshold: f32,
}

impl BrightBlobLocator {
    pub fn new(confidence_threshold: f32) -> Self {
        Self {
            threshold: 128,
            min_pixels: 9,
            confidence_threshold,
        }
    }

    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }
}

impl TargetLocator for BrightBlobLocator {
    fn locate(&mut self, frame: &Frame) -> Result<Vec<TargetCandidate>, LocatorError> {
        if !frame.is_well_formed() {
            return Err(LocatorError::MalformedFrame {
                width: frame.width(),
                height: frame.height(),
                expected: frame.width() as usize * frame.height() as usize,
                actual: frame.pixels().len(),
            });
        }

        let width = frame.width() as usize;
        let (mut min_x, mut min_y) = (usize::MAX, usize::MAX);
        let (mut max_x, mut max_y) = (0usize, 0usize);
        let mut count = 0usize;

        for (i, _) in frame
            .pixels()
            .iter()
            .enumerate()
            .filter(|&(_, &p)| p >= self.threshold)
        {
            let (x, y) = (i % width, i / width);
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);
            count += 1;
        }

        if count < self.min_pixels {
            return Ok(Vec::new());
        }

        let bounding_box = BoundingBox::new(
            min_x as i32,
            min_y as i32,
            (max_x - min_x + 1) as i32,
            (max_y - min_y + 1) as i32,
        );
        let confidence = count as f32 / bounding_box.area() as f32;
        if confidence < self.confidence_threshold {
            return Ok(Vec::new());
        }

        Ok(vec![TargetCandidate::from_bounding_box(
            0,
            bounding_box,
            confidence,
        )])
    }
}
