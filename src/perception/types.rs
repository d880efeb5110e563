use std::io::Cursor;

use base64::Engine as _;
use chrono::{DateTime, Utc};
use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::errors::OmniPilotResult;

/// One captured screen, in physical pixels. Immutable for the lifetime of
/// the loop iteration that captured it.
#[derive(Debug, Clone)]
pub struct ScreenFrame {
    pub image: RgbaImage,
    pub captured_at: DateTime<Utc>,
}

impl ScreenFrame {
    pub fn new(image: RgbaImage) -> Self {
        Self {
            image,
            captured_at: Utc::now(),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn to_png_bytes(&self) -> OmniPilotResult<Vec<u8>> {
        let mut buf = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(self.image.clone())
            .write_to(&mut buf, image::ImageFormat::Png)?;
        Ok(buf.into_inner())
    }

    pub fn to_png_base64(&self) -> OmniPilotResult<String> {
        let bytes = self.to_png_bytes()?;
        Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
    }
}

/// A recognized piece of on-screen text with its *logical* center, i.e. a
/// clickable target candidate. Never persisted across iterations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UIElement {
    pub text: String,
    pub center: (i32, i32),
}

impl UIElement {
    pub fn new(text: impl Into<String>, center: (i32, i32)) -> Self {
        Self {
            text: text.into(),
            center,
        }
    }
}

/// Raw recognizer output: bounding quadrilateral in physical pixels,
/// recognized text, and the recognizer's confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct TextDetection {
    /// Corners in recognizer order; the quad center is taken as the average
    /// of corners 0 and 2.
    pub quad: [(f32, f32); 4],
    pub text: String,
    pub confidence: f32,
}

impl TextDetection {
    pub fn new(quad: [(f32, f32); 4], text: impl Into<String>, confidence: f32) -> Self {
        Self {
            quad,
            text: text.into(),
            confidence,
        }
    }

    /// Axis-aligned rectangle as a detection quad.
    pub fn from_rect(x: f32, y: f32, w: f32, h: f32, text: impl Into<String>, confidence: f32) -> Self {
        Self::new(
            [(x, y), (x + w, y), (x + w, y + h), (x, y + h)],
            text,
            confidence,
        )
    }
}
