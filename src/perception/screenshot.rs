//! Primary-monitor capture and display-scale query via xcap.

use async_trait::async_trait;
use image::RgbaImage;

use crate::errors::{OmniPilotError, OmniPilotResult};
use crate::perception::types::ScreenFrame;

/// Frame-producing capability. The production implementation grabs the
/// primary monitor; tests substitute synthetic frames.
#[async_trait]
pub trait FrameSource: Send + Sync {
    async fn capture(&self) -> OmniPilotResult<ScreenFrame>;
}

/// xcap-backed capture of the primary monitor.
pub struct ScreenCapturer;

impl ScreenCapturer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ScreenCapturer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FrameSource for ScreenCapturer {
    async fn capture(&self) -> OmniPilotResult<ScreenFrame> {
        // Capture is a blocking OS call.
        let image = tokio::task::spawn_blocking(capture_primary_image)
            .await
            .map_err(|e| OmniPilotError::Perception(format!("capture join: {e}")))??;
        tracing::debug!(
            width = image.width(),
            height = image.height(),
            "frame captured"
        );
        Ok(ScreenFrame::new(image))
    }
}

fn primary_monitor() -> OmniPilotResult<xcap::Monitor> {
    let monitors =
        xcap::Monitor::all().map_err(|e| OmniPilotError::Perception(e.to_string()))?;
    monitors
        .into_iter()
        .find(|m| m.is_primary())
        .ok_or_else(|| OmniPilotError::Perception("no primary monitor".into()))
}

fn capture_primary_image() -> OmniPilotResult<RgbaImage> {
    let monitor = primary_monitor()?;
    let capture = monitor
        .capture_image()
        .map_err(|e| OmniPilotError::Perception(e.to_string()))?;

    let (width, height) = (capture.width(), capture.height());
    RgbaImage::from_raw(width, height, capture.into_raw())
        .ok_or_else(|| OmniPilotError::Perception("capture buffer size mismatch".into()))
}

/// Display-scale capability: ratio of physical capture pixels to logical
/// pointer units on the primary monitor. Always positive.
pub fn primary_scale_factor() -> OmniPilotResult<f64> {
    let monitor = primary_monitor()?;
    let scale = monitor.scale_factor() as f64;
    if scale <= 0.0 {
        return Err(OmniPilotError::Perception(format!(
            "display reported non-positive scale factor {scale}"
        )));
    }
    tracing::debug!(scale, "display scale factor");
    Ok(scale)
}
