//! Tesseract-backed text recognition (optional `ocr` feature, requires a
//! system tesseract installation).

use async_trait::async_trait;
use tesseract::Tesseract;

use crate::errors::{OmniPilotError, OmniPilotResult};
use crate::perception::traits::TextRecognizer;
use crate::perception::types::{ScreenFrame, TextDetection};

pub struct TesseractRecognizer {
    language: String,
}

impl TesseractRecognizer {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
        }
    }
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self::new("eng")
    }
}

#[async_trait]
impl TextRecognizer for TesseractRecognizer {
    async fn recognize(&self, frame: &ScreenFrame) -> OmniPilotResult<Vec<TextDetection>> {
        // Grayscale input recognizes more reliably on anti-aliased UI text.
        let gray = image::DynamicImage::ImageRgba8(frame.image.clone()).to_luma8();
        let mut png = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageLuma8(gray).write_to(&mut png, image::ImageFormat::Png)?;
        let png = png.into_inner();
        let language = self.language.clone();

        // Recognition is CPU-bound; the Tesseract handle is created per call
        // on a blocking thread because it is not Send.
        let detections = tokio::task::spawn_blocking(move || run_tesseract(&language, &png))
            .await
            .map_err(|e| OmniPilotError::Perception(format!("ocr join: {e}")))??;

        tracing::debug!(count = detections.len(), "ocr detections");
        Ok(detections)
    }
}

fn run_tesseract(language: &str, png: &[u8]) -> OmniPilotResult<Vec<TextDetection>> {
    let mut tess = Tesseract::new(None, Some(language))
        .map_err(|e| OmniPilotError::Perception(format!("tesseract init: {e}")))?
        .set_image_from_mem(png)
        .map_err(|e| OmniPilotError::Perception(format!("tesseract set image: {e}")))?;

    let tsv = tess
        .get_tsv_text(0)
        .map_err(|e| OmniPilotError::Perception(format!("tesseract tsv: {e}")))?;

    Ok(parse_tsv(&tsv))
}

/// Parses tesseract's 12-column TSV output into word-level detections.
/// Word rows carry level 5; columns 7–10 are left/top/width/height and
/// column 11 the confidence (0–100, -1 for non-text rows).
fn parse_tsv(tsv: &str) -> Vec<TextDetection> {
    let mut detections = Vec::new();
    for line in tsv.lines() {
        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() < 12 || cols[0] != "5" {
            continue;
        }
        let text = cols[11].trim();
        if text.is_empty() {
            continue;
        }
        let parsed: Option<(f32, f32, f32, f32, f32)> = (|| {
            Some((
                cols[6].parse().ok()?,
                cols[7].parse().ok()?,
                cols[8].parse().ok()?,
                cols[9].parse().ok()?,
                cols[10].parse().ok()?,
            ))
        })();
        let Some((left, top, width, height, conf)) = parsed else {
            continue;
        };
        if conf < 0.0 {
            continue;
        }
        detections.push(TextDetection::from_rect(
            left,
            top,
            width,
            height,
            text,
            conf / 100.0,
        ));
    }
    detections
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_word_rows_only() {
        let tsv = "\
1\t1\t0\t0\t0\t0\t0\t0\t600\t400\t-1\t
4\t1\t1\t1\t1\t0\t90\t80\t200\t40\t-1\t
5\t1\t1\t1\t1\t1\t100\t90\t80\t20\t96.5\tShell
5\t1\t1\t1\t1\t2\t200\t90\t60\t20\t-1\t
5\t1\t1\t1\t1\t3\t300\t90\t60\t20\t88.0\tSave";
        let detections = parse_tsv(tsv);
        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].text, "Shell");
        assert_eq!(detections[0].quad[0], (100.0, 90.0));
        assert_eq!(detections[0].quad[2], (180.0, 110.0));
        assert!((detections[0].confidence - 0.965).abs() < 1e-6);
        assert_eq!(detections[1].text, "Save");
    }
}
