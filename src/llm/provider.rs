use async_trait::async_trait;

use crate::errors::OmniPilotResult;
use crate::llm::types::Plan;
use crate::perception::types::UIElement;

/// Planning capability: goal plus the current element scan in, one [`Plan`]
/// out. Whether the implementation uses a strict-JSON channel or a
/// schema-constrained function call is invisible to callers.
#[async_trait]
pub trait PlanningProvider: Send + Sync {
    async fn decide_next_step(
        &self,
        goal: &str,
        elements: &[UIElement],
    ) -> OmniPilotResult<Plan>;
}

/// Vision-reasoning fallback capability: encoded frame plus a
/// natural-language description in, *physical-pixel* coordinates out.
/// `Ok(None)` means the reply did not contain a usable coordinate.
#[async_trait]
pub trait VisionLocator: Send + Sync {
    async fn locate(
        &self,
        image_b64: &str,
        description: &str,
    ) -> OmniPilotResult<Option<(u32, u32)>>;
}
