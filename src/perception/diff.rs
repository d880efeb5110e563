//! Post-action stall detection: fraction of pixels that visibly changed
//! between two frames. Advisory telemetry only — it never blocks or alters
//! an action that already executed.

use image::imageops::{self, FilterType};

use crate::perception::types::ScreenFrame;

/// Per-channel intensity delta (out of 255) below which a pixel counts as
/// unchanged. Suppresses sensor/compression noise.
const NOISE_THRESHOLD: u8 = 25;

/// Normalized change ratio in `[0.0, 1.0]` between two frames.
///
/// Policy: an absent frame means "no information", reported as 0.0. A
/// dimension mismatch resizes the second frame to match the first instead of
/// erroring. Both frames are reduced to single-channel intensity, diffed per
/// pixel, and binarized at [`NOISE_THRESHOLD`].
pub fn calculate_diff(before: Option<&ScreenFrame>, after: Option<&ScreenFrame>) -> f64 {
    let (before, after) = match (before, after) {
        (Some(a), Some(b)) => (a, b),
        _ => return 0.0,
    };

    let gray_before = imageops::grayscale(&before.image);
    let mut gray_after = imageops::grayscale(&after.image);

    if gray_after.dimensions() != gray_before.dimensions() {
        tracing::debug!(
            before = ?gray_before.dimensions(),
            after = ?gray_after.dimensions(),
            "frame dimensions differ, resizing second frame"
        );
        gray_after = imageops::resize(
            &gray_after,
            gray_before.width(),
            gray_before.height(),
            FilterType::Triangle,
        );
    }

    let total = (gray_before.width() as u64) * (gray_before.height() as u64);
    if total == 0 {
        return 0.0;
    }

    let changed = gray_before
        .pixels()
        .zip(gray_after.pixels())
        .filter(|(a, b)| a.0[0].abs_diff(b.0[0]) > NOISE_THRESHOLD)
        .count() as u64;

    changed as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn solid_frame(w: u32, h: u32, rgb: [u8; 3]) -> ScreenFrame {
        ScreenFrame::new(RgbaImage::from_pixel(
            w,
            h,
            image::Rgba([rgb[0], rgb[1], rgb[2], 255]),
        ))
    }

    #[test]
    fn identical_frames_report_zero() {
        let frame = solid_frame(64, 48, [200, 200, 200]);
        assert_eq!(calculate_diff(Some(&frame), Some(&frame)), 0.0);
    }

    #[test]
    fn absent_frame_reports_zero() {
        let frame = solid_frame(64, 48, [200, 200, 200]);
        assert_eq!(calculate_diff(None, Some(&frame)), 0.0);
        assert_eq!(calculate_diff(Some(&frame), None), 0.0);
        assert_eq!(calculate_diff(None, None), 0.0);
    }

    #[test]
    fn inverted_frame_reports_near_one() {
        let white = solid_frame(64, 48, [255, 255, 255]);
        let black = solid_frame(64, 48, [0, 0, 0]);
        let ratio = calculate_diff(Some(&white), Some(&black));
        assert!(ratio > 0.99, "got {ratio}");
    }

    #[test]
    fn sub_threshold_noise_is_ignored() {
        let a = solid_frame(64, 48, [100, 100, 100]);
        let b = solid_frame(64, 48, [110, 110, 110]);
        assert_eq!(calculate_diff(Some(&a), Some(&b)), 0.0);
    }

    #[test]
    fn mismatched_dimensions_resize_instead_of_error() {
        let a = solid_frame(64, 48, [255, 255, 255]);
        let b = solid_frame(32, 24, [255, 255, 255]);
        assert_eq!(calculate_diff(Some(&a), Some(&b)), 0.0);

        let c = solid_frame(32, 24, [0, 0, 0]);
        let ratio = calculate_diff(Some(&a), Some(&c));
        assert!(ratio > 0.99, "got {ratio}");
    }
}
