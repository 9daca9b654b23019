//! Pixel capture and image encoding.
//!
//! Captured pixels come from the root drawable; this module only defines the
//! carrier types and turns a [`PixelBuffer`] into an encoded image for the
//! host's capture API.

use std::fmt;

use crate::root::DrawError;

/// Sub-rectangle of the surface, in physical pixels.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CaptureRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Tightly packed RGBA8 pixels, rows top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl PixelBuffer {
    /// Builds a buffer from raw RGBA bytes; `None` when the byte count does
    /// not match `width * height * 4`.
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        if rgba.len() != width as usize * height as usize * 4 {
            return None;
        }
        Some(Self { width, height, rgba })
    }

    /// Zero-filled (transparent black) buffer.
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            rgba: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    /// RGBA of one pixel; `None` outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([self.rgba[i], self.rgba[i + 1], self.rgba[i + 2], self.rgba[i + 3]])
    }
}

/// Output format for encoded captures.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EncodedImageFormat {
    Png,
    /// Alpha is dropped; `quality` selects the JPEG quality (0–100).
    Jpeg,
}

/// Failure of a capture operation.
#[derive(Debug)]
pub enum CaptureError {
    /// No GPU context is live; there is nothing to read pixels from.
    NoContext,
    /// No root drawable is attached.
    NoRoot,
    /// The root drawable failed to produce pixels.
    Root(DrawError),
    /// Encoding the pixels failed.
    Encode(String),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoContext => write!(f, "capture requires a live GPU context"),
            Self::NoRoot => write!(f, "capture requires an attached root drawable"),
            Self::Root(err) => write!(f, "root drawable capture failed: {err}"),
            Self::Encode(msg) => write!(f, "image encoding failed: {msg}"),
        }
    }
}

impl std::error::Error for CaptureError {}

/// Encodes `pixels` as `format`. `quality` only affects JPEG output.
pub fn encode(
    pixels: &PixelBuffer,
    format: EncodedImageFormat,
    quality: u8,
) -> Result<Vec<u8>, CaptureError> {
    use image::ImageEncoder;

    let mut out = Vec::new();
    match format {
        EncodedImageFormat::Png => {
            image::codecs::png::PngEncoder::new(&mut out)
                .write_image(
                    pixels.rgba(),
                    pixels.width(),
                    pixels.height(),
                    image::ExtendedColorType::Rgba8,
                )
                .map_err(|e| CaptureError::Encode(e.to_string()))?;
        }
        EncodedImageFormat::Jpeg => {
            // JPEG has no alpha channel.
            let rgb: Vec<u8> = pixels
                .rgba()
                .chunks_exact(4)
                .flat_map(|p| [p[0], p[1], p[2]])
                .collect();
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality.min(100))
                .write_image(
                    &rgb,
                    pixels.width(),
                    pixels.height(),
                    image::ExtendedColorType::Rgb8,
                )
                .map_err(|e| CaptureError::Encode(e.to_string()))?;
        }
    }
    Ok(out)
}
