use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Control-flow outcome of one Act phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopSignal {
    Continue,
    /// Terminal: goal accomplished.
    Finished,
    /// Terminal: planner gave up.
    GaveUp,
}

/// Result of dispatching one plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    pub signal: LoopSignal,
    pub success: bool,
    pub detail: String,
}

impl StepReport {
    pub fn acted(detail: impl Into<String>) -> Self {
        Self {
            signal: LoopSignal::Continue,
            success: true,
            detail: detail.into(),
        }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            signal: LoopSignal::Continue,
            success: false,
            detail: detail.into(),
        }
    }

    pub fn terminal(signal: LoopSignal, detail: impl Into<String>) -> Self {
        Self {
            signal,
            success: true,
            detail: detail.into(),
        }
    }
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    GaveUp,
    Interrupted,
    /// An optional loop cap (iterations / consecutive failures) fired.
    LimitReached,
}

/// Wall-clock durations of one iteration's phases. Observability only —
/// never consulted by control flow.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhaseTimings {
    pub capture: Duration,
    pub scan: Duration,
    pub think: Duration,
    pub act: Duration,
    pub verify: Duration,
}

impl PhaseTimings {
    pub fn total(&self) -> Duration {
        self.capture + self.scan + self.think + self.act + self.verify
    }

    pub fn as_millis_json(&self) -> serde_json::Value {
        serde_json::json!({
            "capture": self.capture.as_millis() as u64,
            "scan": self.scan.as_millis() as u64,
            "think": self.think.as_millis() as u64,
            "act": self.act.as_millis() as u64,
            "verify": self.verify.as_millis() as u64,
            "total": self.total().as_millis() as u64,
        })
    }
}
