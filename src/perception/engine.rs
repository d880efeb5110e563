//! Turns raw frames into clickable targets: full-frame text scan, text-based
//! element lookup, and the vision-based coordinate-estimation fallback.

use std::sync::Arc;

use crate::llm::provider::VisionLocator;
use crate::perception::geometry::{quad_center, to_logical};
use crate::perception::traits::TextRecognizer;
use crate::perception::types::{ScreenFrame, UIElement};

pub struct PerceptionEngine {
    recognizer: Option<Arc<dyn TextRecognizer>>,
    locator: Option<Arc<dyn VisionLocator>>,
    /// Physical-to-logical ratio, read once at construction. Re-read only
    /// through [`refresh_scale_factor`](Self::refresh_scale_factor).
    scale_factor: f64,
}

impl PerceptionEngine {
    pub fn new(
        recognizer: Option<Arc<dyn TextRecognizer>>,
        locator: Option<Arc<dyn VisionLocator>>,
        scale_factor: f64,
    ) -> Self {
        debug_assert!(scale_factor > 0.0);
        Self {
            recognizer,
            locator,
            scale_factor,
        }
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    /// Re-reads the display scale. The only supported way to pick up a
    /// display-topology change mid-run.
    pub fn refresh_scale_factor(&mut self) -> crate::errors::OmniPilotResult<f64> {
        self.scale_factor = crate::perception::screenshot::primary_scale_factor()?;
        Ok(self.scale_factor)
    }

    /// One recognizer pass over the frame, returning elements with logical
    /// centers in the recognizer's native order. That order is not
    /// semantically meaningful; it is only used as a first-match tie-break
    /// downstream. Returns an empty list — never an error — when nothing is
    /// detected or no recognizer is configured.
    pub async fn scan_full(&self, frame: &ScreenFrame) -> Vec<UIElement> {
        let Some(recognizer) = &self.recognizer else {
            tracing::debug!("no text recognizer configured, scan yields no elements");
            return Vec::new();
        };

        let detections = match recognizer.recognize(frame).await {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(error = %e, "text recognition failed, treating as empty scan");
                return Vec::new();
            }
        };

        detections
            .into_iter()
            .map(|det| {
                let (px, py) = quad_center(&det.quad);
                UIElement::new(det.text, to_logical(px, py, self.scale_factor))
            })
            .collect()
    }

    /// Case-insensitive substring lookup over an already-computed scan.
    /// First match in list order wins. Pure; never re-invokes recognition.
    pub fn find_element_in_list(elements: &[UIElement], target_text: &str) -> Option<(i32, i32)> {
        let needle = target_text.to_lowercase();
        elements
            .iter()
            .find(|e| e.text.to_lowercase().contains(&needle))
            .map(|e| e.center)
    }

    /// Single-target lookup for callers that do not already hold a scan
    /// result. Re-runs recognition.
    pub async fn find_element(&self, frame: &ScreenFrame, target_text: &str) -> Option<(i32, i32)> {
        let elements = self.scan_full(frame).await;
        Self::find_element_in_list(&elements, target_text)
    }

    /// Vision-based fallback when text lookup fails: ship the frame and a
    /// natural-language description to the vision-reasoning capability and
    /// convert its physical-pixel answer to logical coordinates. Every
    /// failure mode (capability unconfigured, call error, unparseable reply)
    /// collapses to `None`.
    pub async fn estimate_coordinates(
        &self,
        frame: &ScreenFrame,
        description: &str,
    ) -> Option<(i32, i32)> {
        let Some(locator) = &self.locator else {
            tracing::debug!("no vision locator configured, fallback unavailable");
            return None;
        };

        let image_b64 = match frame.to_png_base64() {
            Ok(b64) => b64,
            Err(e) => {
                tracing::warn!(error = %e, "frame encoding for vision fallback failed");
                return None;
            }
        };

        match locator.locate(&image_b64, description).await {
            Ok(Some((px, py))) => {
                let logical = to_logical(px as f64, py as f64, self.scale_factor);
                tracing::info!(
                    description,
                    physical = ?(px, py),
                    logical = ?logical,
                    "vision fallback located target"
                );
                Some(logical)
            }
            Ok(None) => {
                tracing::warn!(description, "vision fallback found no coordinates");
                None
            }
            Err(e) => {
                tracing::warn!(description, error = %e, "vision fallback call failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use image::RgbaImage;

    use crate::errors::{OmniPilotError, OmniPilotResult};
    use crate::perception::types::TextDetection;

    struct FixedRecognizer(Vec<TextDetection>);

    #[async_trait]
    impl TextRecognizer for FixedRecognizer {
        async fn recognize(&self, _frame: &ScreenFrame) -> OmniPilotResult<Vec<TextDetection>> {
            Ok(self.0.clone())
        }
    }

    struct FailingRecognizer;

    #[async_trait]
    impl TextRecognizer for FailingRecognizer {
        async fn recognize(&self, _frame: &ScreenFrame) -> OmniPilotResult<Vec<TextDetection>> {
            Err(OmniPilotError::Perception("model exploded".into()))
        }
    }

    fn blank_frame() -> ScreenFrame {
        ScreenFrame::new(RgbaImage::new(8, 8))
    }

    fn sample_elements() -> Vec<UIElement> {
        vec![
            UIElement::new("File", (100, 20)),
            UIElement::new("Save", (100, 50)),
        ]
    }

    #[test]
    fn lookup_is_case_insensitive_substring() {
        let elements = sample_elements();
        assert_eq!(
            PerceptionEngine::find_element_in_list(&elements, "save"),
            Some((100, 50))
        );
        assert_eq!(PerceptionEngine::find_element_in_list(&elements, "Quit"), None);
    }

    #[test]
    fn lookup_returns_first_match_in_recognizer_order() {
        let elements = vec![
            UIElement::new("Save As", (10, 10)),
            UIElement::new("Save", (20, 20)),
        ];
        assert_eq!(
            PerceptionEngine::find_element_in_list(&elements, "save"),
            Some((10, 10))
        );
    }

    #[tokio::test]
    async fn scan_converts_quad_centers_to_logical() {
        // "File" spans physical (180,20)–(220,60): center (200,40), logical (100,20) at 2x.
        let recognizer = FixedRecognizer(vec![TextDetection::from_rect(
            180.0, 20.0, 40.0, 40.0, "File", 0.9,
        )]);
        let engine = PerceptionEngine::new(Some(Arc::new(recognizer)), None, 2.0);
        let elements = engine.scan_full(&blank_frame()).await;
        assert_eq!(elements, vec![UIElement::new("File", (100, 20))]);
    }

    #[tokio::test]
    async fn find_element_scans_then_looks_up() {
        let recognizer = FixedRecognizer(vec![TextDetection::from_rect(
            180.0, 20.0, 40.0, 40.0, "File", 0.9,
        )]);
        let engine = PerceptionEngine::new(Some(Arc::new(recognizer)), None, 2.0);
        assert_eq!(
            engine.find_element(&blank_frame(), "file").await,
            Some((100, 20))
        );
        assert_eq!(engine.find_element(&blank_frame(), "Quit").await, None);
    }

    #[tokio::test]
    async fn scan_without_recognizer_is_empty_not_error() {
        let engine = PerceptionEngine::new(None, None, 1.0);
        assert!(engine.scan_full(&blank_frame()).await.is_empty());
    }

    #[tokio::test]
    async fn recognizer_failure_degrades_to_empty_scan() {
        let engine = PerceptionEngine::new(Some(Arc::new(FailingRecognizer)), None, 1.0);
        assert!(engine.scan_full(&blank_frame()).await.is_empty());
    }

    #[tokio::test]
    async fn fallback_without_locator_is_none() {
        let engine = PerceptionEngine::new(None, None, 1.0);
        assert_eq!(engine.estimate_coordinates(&blank_frame(), "Settings").await, None);
    }
}
