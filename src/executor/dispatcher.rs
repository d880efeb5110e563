//! Maps a [`Plan`] onto concrete pointer/keyboard operations.

use std::sync::Arc;

use crate::agent_engine::state::{LoopSignal, StepReport};
use crate::executor::input::InputBackend;
use crate::llm::types::Plan;
use crate::perception::engine::PerceptionEngine;
use crate::perception::types::{ScreenFrame, UIElement};

pub struct ActionExecutor {
    input: Arc<dyn InputBackend>,
}

impl ActionExecutor {
    pub fn new(input: Arc<dyn InputBackend>) -> Self {
        Self { input }
    }

    /// Executes one plan against the current scan. Malformed plans (e.g. a
    /// click with no target) degrade to failed-action reports — this path
    /// never crashes the loop.
    pub async fn execute(
        &self,
        plan: &Plan,
        elements: &[UIElement],
        frame: &ScreenFrame,
        perception: &PerceptionEngine,
    ) -> StepReport {
        match plan {
            Plan::Click { target_text, .. } => {
                let Some(target) = target_text.as_deref().filter(|t| !t.is_empty()) else {
                    tracing::warn!("click plan without target_text");
                    return StepReport::failed("click plan carried no target_text");
                };
                self.click(target, elements, frame, perception).await
            }

            Plan::Type {
                text_to_type,
                target_text,
                ..
            } => {
                // text_to_type preferred; target_text covers a confused planner.
                let text = text_to_type
                    .as_deref()
                    .filter(|t| !t.is_empty())
                    .or_else(|| target_text.as_deref().filter(|t| !t.is_empty()));
                let Some(text) = text else {
                    tracing::warn!("type plan without any text");
                    return StepReport::failed("type plan carried no text");
                };
                tracing::info!(chars = text.chars().count(), "typing");
                match self.input.type_text(text).await {
                    Ok(()) => StepReport::acted(format!("typed {} characters", text.chars().count())),
                    Err(e) => StepReport::failed(format!("typing failed: {e}")),
                }
            }

            Plan::Done { .. } => StepReport::terminal(LoopSignal::Finished, "goal reported done"),

            Plan::Fail { .. } => StepReport::terminal(LoopSignal::GaveUp, "planner gave up"),

            Plan::Error { thought } => {
                tracing::warn!(thought = %thought, "planner error, continuing");
                StepReport::failed(format!("planner error: {thought}"))
            }
        }
    }

    /// Click resolution order: already-scanned element list, then the vision
    /// fallback, then a failure report with no action taken.
    async fn click(
        &self,
        target: &str,
        elements: &[UIElement],
        frame: &ScreenFrame,
        perception: &PerceptionEngine,
    ) -> StepReport {
        let coords = match PerceptionEngine::find_element_in_list(elements, target) {
            Some(c) => Some(c),
            None => {
                tracing::info!(target, "target not in scan, trying vision fallback");
                perception.estimate_coordinates(frame, target).await
            }
        };

        let Some((x, y)) = coords else {
            tracing::warn!(target, "target not resolvable, no action taken");
            return StepReport::failed(format!("could not locate \"{target}\""));
        };

        tracing::info!(target, x, y, "clicking");
        match self.input.click_at(x, y).await {
            Ok(()) => StepReport::acted(format!("clicked \"{target}\" at ({x}, {y})")),
            Err(e) => StepReport::failed(format!("click failed: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use image::RgbaImage;

    use crate::errors::OmniPilotResult;
    use crate::llm::provider::VisionLocator;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Move(i32, i32),
        Click,
        Type(String),
    }

    #[derive(Default)]
    struct RecordingInput {
        events: StdMutex<Vec<Event>>,
    }

    impl RecordingInput {
        fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl InputBackend for RecordingInput {
        async fn move_to(&self, x: i32, y: i32) -> OmniPilotResult<()> {
            self.events.lock().unwrap().push(Event::Move(x, y));
            Ok(())
        }
        async fn click(&self) -> OmniPilotResult<()> {
            self.events.lock().unwrap().push(Event::Click);
            Ok(())
        }
        async fn type_text(&self, text: &str) -> OmniPilotResult<()> {
            self.events.lock().unwrap().push(Event::Type(text.into()));
            Ok(())
        }
    }

    struct FixedLocator(Option<(u32, u32)>);

    #[async_trait]
    impl VisionLocator for FixedLocator {
        async fn locate(
            &self,
            _image_b64: &str,
            _description: &str,
        ) -> OmniPilotResult<Option<(u32, u32)>> {
            Ok(self.0)
        }
    }

    fn frame() -> ScreenFrame {
        ScreenFrame::new(RgbaImage::new(8, 8))
    }

    fn menu_elements() -> Vec<UIElement> {
        vec![
            UIElement::new("File", (100, 20)),
            UIElement::new("Save", (100, 50)),
        ]
    }

    #[tokio::test]
    async fn click_resolves_from_scanned_list() {
        let input = Arc::new(RecordingInput::default());
        let executor = ActionExecutor::new(input.clone());
        let perception = PerceptionEngine::new(None, None, 1.0);

        let plan = Plan::Click {
            thought: "save".into(),
            target_text: Some("Save".into()),
        };
        let report = executor
            .execute(&plan, &menu_elements(), &frame(), &perception)
            .await;

        assert!(report.success);
        assert_eq!(report.signal, LoopSignal::Continue);
        assert_eq!(input.events(), vec![Event::Move(100, 50), Event::Click]);
    }

    #[tokio::test]
    async fn click_falls_back_to_vision_and_normalizes() {
        let input = Arc::new(RecordingInput::default());
        let executor = ActionExecutor::new(input.clone());
        // Locator answers physical (400, 300); at scale 2.0 that is logical (200, 150).
        let perception =
            PerceptionEngine::new(None, Some(Arc::new(FixedLocator(Some((400, 300))))), 2.0);

        let plan = Plan::Click {
            thought: "open settings".into(),
            target_text: Some("Settings".into()),
        };
        let report = executor
            .execute(&plan, &menu_elements(), &frame(), &perception)
            .await;

        assert!(report.success);
        assert_eq!(input.events(), vec![Event::Move(200, 150), Event::Click]);
    }

    #[tokio::test]
    async fn unresolvable_click_fails_without_acting() {
        let input = Arc::new(RecordingInput::default());
        let executor = ActionExecutor::new(input.clone());
        let perception = PerceptionEngine::new(None, Some(Arc::new(FixedLocator(None))), 1.0);

        let plan = Plan::Click {
            thought: "hm".into(),
            target_text: Some("Quit".into()),
        };
        let report = executor
            .execute(&plan, &menu_elements(), &frame(), &perception)
            .await;

        assert!(!report.success);
        assert_eq!(report.signal, LoopSignal::Continue);
        assert!(input.events().is_empty());
    }

    #[tokio::test]
    async fn click_without_target_degrades_to_failure() {
        let input = Arc::new(RecordingInput::default());
        let executor = ActionExecutor::new(input.clone());
        let perception = PerceptionEngine::new(None, None, 1.0);

        let plan = Plan::Click {
            thought: "?".into(),
            target_text: None,
        };
        let report = executor
            .execute(&plan, &menu_elements(), &frame(), &perception)
            .await;

        assert!(!report.success);
        assert!(input.events().is_empty());
    }

    #[tokio::test]
    async fn type_prefers_text_to_type_and_falls_back_to_target() {
        let input = Arc::new(RecordingInput::default());
        let executor = ActionExecutor::new(input.clone());
        let perception = PerceptionEngine::new(None, None, 1.0);

        let plan = Plan::Type {
            thought: String::new(),
            text_to_type: Some("hello".into()),
            target_text: Some("ignored".into()),
        };
        executor.execute(&plan, &[], &frame(), &perception).await;

        let plan = Plan::Type {
            thought: String::new(),
            text_to_type: None,
            target_text: Some("fallback".into()),
        };
        executor.execute(&plan, &[], &frame(), &perception).await;

        assert_eq!(
            input.events(),
            vec![Event::Type("hello".into()), Event::Type("fallback".into())]
        );
    }

    #[tokio::test]
    async fn done_and_fail_are_terminal_without_input() {
        let input = Arc::new(RecordingInput::default());
        let executor = ActionExecutor::new(input.clone());
        let perception = PerceptionEngine::new(None, None, 1.0);

        let done = executor
            .execute(
                &Plan::Done { thought: "ok".into() },
                &[],
                &frame(),
                &perception,
            )
            .await;
        assert_eq!(done.signal, LoopSignal::Finished);

        let fail = executor
            .execute(
                &Plan::Fail { thought: "stuck".into() },
                &[],
                &frame(),
                &perception,
            )
            .await;
        assert_eq!(fail.signal, LoopSignal::GaveUp);
        assert!(input.events().is_empty());
    }
}
