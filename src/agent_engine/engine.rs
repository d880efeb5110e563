//! The orchestrating state machine: observe → decide → act → verify.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::agent_engine::history::{HistoryEntry, SessionHistory};
use crate::agent_engine::loop_control::LoopController;
use crate::agent_engine::state::{LoopSignal, PhaseTimings, RunOutcome, StepReport};
use crate::errors::OmniPilotResult;
use crate::executor::dispatcher::ActionExecutor;
use crate::executor::input::InputBackend;
use crate::llm::provider::PlanningProvider;
use crate::llm::types::Plan;
use crate::narration::Narrator;
use crate::perception::diff::calculate_diff;
use crate::perception::engine::PerceptionEngine;
use crate::perception::screenshot::FrameSource;
use crate::perception::types::{ScreenFrame, UIElement};

/// Loop timing and thresholds. Defaults match the production loop; tests
/// shrink the delays.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Wait after Act before the verification capture, so the UI can react.
    pub settle_delay: Duration,
    /// Pause after a recoverable planner error before re-entering Observe.
    pub error_pause: Duration,
    /// Change ratio below which a completed action is reported as a stall.
    pub stall_threshold: f64,
    pub max_iterations: Option<u64>,
    pub max_consecutive_failures: Option<u32>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(2000),
            error_pause: Duration::from_millis(1000),
            stall_threshold: 0.001,
            max_iterations: None,
            max_consecutive_failures: None,
        }
    }
}

pub struct AgentLoop {
    frames: Arc<dyn FrameSource>,
    perception: PerceptionEngine,
    planner: Option<Arc<dyn PlanningProvider>>,
    executor: ActionExecutor,
    narrator: Arc<dyn Narrator>,
    history: SessionHistory,
    config: LoopConfig,
    /// External interrupt, observed only at iteration boundaries.
    interrupted: Arc<AtomicBool>,
}

impl AgentLoop {
    pub fn new(
        frames: Arc<dyn FrameSource>,
        perception: PerceptionEngine,
        planner: Option<Arc<dyn PlanningProvider>>,
        input: Arc<dyn InputBackend>,
        narrator: Arc<dyn Narrator>,
        config: LoopConfig,
        interrupted: Arc<AtomicBool>,
    ) -> Self {
        Self {
            frames,
            perception,
            planner,
            executor: ActionExecutor::new(input),
            narrator,
            history: SessionHistory::new(),
            config,
            interrupted,
        }
    }

    /// The session transcript accumulated so far.
    pub fn history(&self) -> &SessionHistory {
        &self.history
    }

    pub async fn run(&mut self, goal: &str) -> OmniPilotResult<RunOutcome> {
        tracing::info!(goal, session = %self.history.session_id, "mission started");
        self.narrator.speak(&format!("Starting: {goal}"));

        let mut ctrl = LoopController::new(
            self.config.max_iterations,
            self.config.max_consecutive_failures,
        );

        let outcome = loop {
            if self.interrupted.load(Ordering::SeqCst) {
                tracing::info!("external interrupt observed at iteration boundary");
                break RunOutcome::Interrupted;
            }
            if ctrl.should_stop() {
                break RunOutcome::LimitReached;
            }

            let mut timings = PhaseTimings::default();

            // ── Observe ───────────────────────────────────────────────────
            let t0 = Instant::now();
            let frame = match self.frames.capture().await {
                Ok(f) => f,
                Err(e) => {
                    tracing::warn!(error = %e, "capture failed, retrying next iteration");
                    tokio::time::sleep(self.config.error_pause).await;
                    continue;
                }
            };
            timings.capture = t0.elapsed();

            let t0 = Instant::now();
            let elements = self.perception.scan_full(&frame).await;
            timings.scan = t0.elapsed();
            tracing::info!(elements = elements.len(), "screen scanned");

            // ── Decide ────────────────────────────────────────────────────
            let t0 = Instant::now();
            let plan = self.decide(goal, &elements).await;
            timings.think = t0.elapsed();
            tracing::info!(action = plan.action_name(), thought = %plan.thought(), "plan received");
            if !plan.thought().is_empty() {
                self.narrator.speak(plan.thought());
            }

            // ── Act ───────────────────────────────────────────────────────
            let t0 = Instant::now();
            let report = self
                .executor
                .execute(&plan, &elements, &frame, &self.perception)
                .await;
            timings.act = t0.elapsed();

            // Terminal plans end the run after Act; no further phase runs.
            if report.signal != LoopSignal::Continue {
                ctrl.record_iteration(report.success);
                self.record(&ctrl, &plan, &report, None, false, &timings);
                break match report.signal {
                    LoopSignal::Finished => RunOutcome::Completed,
                    _ => RunOutcome::GaveUp,
                };
            }

            // ── Verify ────────────────────────────────────────────────────
            let t0 = Instant::now();
            let change_ratio = self.verify(&frame).await;
            timings.verify = t0.elapsed();

            // A below-threshold ratio means the screen did not visibly react
            // to the iteration, whether or not an action landed. Advisory
            // only; the next Decide sees the fresh screen either way.
            let stalled = match change_ratio {
                Some(ratio) if ratio < self.config.stall_threshold => {
                    tracing::warn!(
                        change_ratio = ratio,
                        detail = %report.detail,
                        "iteration produced no visible screen change (stall)"
                    );
                    true
                }
                _ => false,
            };

            tracing::info!(
                capture_ms = timings.capture.as_millis() as u64,
                scan_ms = timings.scan.as_millis() as u64,
                think_ms = timings.think.as_millis() as u64,
                act_ms = timings.act.as_millis() as u64,
                verify_ms = timings.verify.as_millis() as u64,
                total_ms = timings.total().as_millis() as u64,
                "iteration complete"
            );

            ctrl.record_iteration(report.success);
            self.record(&ctrl, &plan, &report, change_ratio, stalled, &timings);

            if matches!(plan, Plan::Error { .. }) {
                tokio::time::sleep(self.config.error_pause).await;
            }
        };

        tracing::info!(?outcome, iterations = ctrl.iterations(), "mission ended");
        self.narrator.speak(match outcome {
            RunOutcome::Completed => "Task completed.",
            RunOutcome::GaveUp => "Giving up.",
            RunOutcome::Interrupted => "Interrupted.",
            RunOutcome::LimitReached => "Loop limit reached.",
        });
        Ok(outcome)
    }

    /// Decide phase: an unconfigured or failing planning capability never
    /// crashes the loop — it degrades to a recoverable error plan.
    async fn decide(&self, goal: &str, elements: &[UIElement]) -> Plan {
        let Some(planner) = &self.planner else {
            return Plan::error("planning capability unconfigured (missing API key)");
        };
        match planner.decide_next_step(goal, elements).await {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!(error = %e, "planner call failed");
                Plan::error(format!("no reply from planner: {e}"))
            }
        }
    }

    /// Verify phase: settle, re-capture, and compare. Returns `None` when
    /// the verification capture failed and no ratio is known.
    async fn verify(&self, before: &ScreenFrame) -> Option<f64> {
        tokio::time::sleep(self.config.settle_delay).await;

        let after = match self.frames.capture().await {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(error = %e, "verification capture failed");
                return None;
            }
        };

        let ratio = calculate_diff(Some(before), Some(&after));
        tracing::debug!(change_ratio = ratio, "post-action screen change");
        Some(ratio)
    }

    fn record(
        &mut self,
        ctrl: &LoopController,
        plan: &Plan,
        report: &StepReport,
        change_ratio: Option<f64>,
        stalled: bool,
        timings: &PhaseTimings,
    ) {
        self.history.push(HistoryEntry {
            ts: chrono::Utc::now().timestamp_millis(),
            iteration: ctrl.iterations(),
            plan: serde_json::to_value(plan).unwrap_or_default(),
            success: report.success,
            detail: report.detail.clone(),
            change_ratio,
            stalled,
            timings_ms: Some(timings.as_millis_json()),
        });
        if let Err(e) = self.history.flush() {
            tracing::warn!(error = %e, "history flush failed");
        }
    }
}
