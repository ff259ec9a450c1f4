//! Sender-side photo compression to a hard byte ceiling.
//!
//! The search is deterministic: clamp the longer edge to 600 px, encode at
//! quality 0.8, step quality down by 0.1 to a floor of 0.1, then shrink the
//! canvas by 0.8 and retry from quality 0.6 until the width reaches 200 px.
//! A payload is only ever returned when it fits the budget.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};

use crate::{Error, PhotoPayload, Result, PHOTO_BYTE_BUDGET};

pub const MAX_EDGE_PX: u32 = 600;
pub const MIN_WIDTH_PX: u32 = 200;
pub const SHRINK_FACTOR: f64 = 0.8;

// Qualities are kept in tenths so the step-down is exact.
const INITIAL_QUALITY: u8 = 8;
const RETRY_QUALITY: u8 = 6;
const MIN_QUALITY: u8 = 1;

/// Encodes one RGB frame at a quality in `1..=100`.
pub trait FrameEncoder: Send + Sync {
    fn encode(&self, frame: &RgbImage, quality: u8) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JpegFrameEncoder;

impl FrameEncoder for JpegFrameEncoder {
    fn encode(&self, frame: &RgbImage, quality: u8) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut out, quality);
        encoder.encode_image(frame)?;
        Ok(out)
    }
}

#[derive(Debug, Clone)]
pub struct MediaBudgeter<E = JpegFrameEncoder> {
    budget: usize,
    encoder: E,
}

impl Default for MediaBudgeter {
    fn default() -> Self {
        Self::new(PHOTO_BYTE_BUDGET)
    }
}

impl MediaBudgeter {
    pub fn new(budget: usize) -> Self {
        Self {
            budget,
            encoder: JpegFrameEncoder,
        }
    }
}

impl<E: FrameEncoder> MediaBudgeter<E> {
    pub fn with_encoder(budget: usize, encoder: E) -> Self {
        Self { budget, encoder }
    }

    /// Decode `source` (any format the `image` crate recognises) and compress it.
    pub fn compress(&self, source: &[u8]) -> Result<PhotoPayload> {
        let image = image::load_from_memory(source)?;
        self.compress_image(&image)
    }

    pub fn compress_image(&self, image: &DynamicImage) -> Result<PhotoPayload> {
        let (mut width, mut height) = clamp_to_edge(image.width(), image.height(), MAX_EDGE_PX);
        let mut quality = INITIAL_QUALITY;
        let mut smallest = usize::MAX;

        loop {
            let frame = render(image, width, height);
            let mut encoded = self.encoder.encode(&frame, quality * 10)?;
            while encoded.len() > self.budget && quality > MIN_QUALITY {
                quality -= 1;
                encoded = self.encoder.encode(&frame, quality * 10)?;
            }
            smallest = smallest.min(encoded.len());

            if encoded.len() <= self.budget {
                tracing::debug!(
                    width,
                    height,
                    quality = quality * 10,
                    bytes = encoded.len(),
                    "photo fits budget"
                );
                return Ok(PhotoPayload::new(encoded));
            }
            if width <= MIN_WIDTH_PX {
                return Err(Error::PayloadTooLarge {
                    budget: self.budget,
                    smallest,
                });
            }

            width = shrink(width);
            height = shrink(height);
            quality = RETRY_QUALITY;
        }
    }
}

/// Clamp the longer edge to `max_edge`, keeping the aspect ratio. Never upscales.
pub fn clamp_to_edge(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    let longer = width.max(height);
    if longer <= max_edge {
        return (width.max(1), height.max(1));
    }
    let ratio = max_edge as f64 / longer as f64;
    (
        ((width as f64 * ratio).round() as u32).max(1),
        ((height as f64 * ratio).round() as u32).max(1),
    )
}

fn shrink(edge: u32) -> u32 {
    ((edge as f64 * SHRINK_FACTOR).round() as u32).max(1)
}

fn render(image: &DynamicImage, width: u32, height: u32) -> RgbImage {
    if image.width() == width && image.height() == height {
        image.to_rgb8()
    } else {
        image
            .resize_exact(width, height, FilterType::Triangle)
            .to_rgb8()
    }
}
