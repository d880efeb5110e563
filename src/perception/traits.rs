use async_trait::async_trait;

use crate::errors::OmniPilotResult;
use crate::perception::types::{ScreenFrame, TextDetection};

/// Text-recognition capability: raw pixels in, detected text with bounding
/// quads (physical pixels) out. The recognition model itself is an opaque
/// collaborator behind this seam.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize(&self, frame: &ScreenFrame) -> OmniPilotResult<Vec<TextDetection>>;
}
