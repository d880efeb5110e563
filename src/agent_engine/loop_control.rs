/// Iteration and failure accounting with optional caps. Both caps default
/// off: a planner that errors forever keeps the loop alive by design, and
/// only an explicit configuration bounds it.
pub struct LoopController {
    max_iterations: Option<u64>,
    max_consecutive_failures: Option<u32>,
    iterations: u64,
    consecutive_failures: u32,
}

impl LoopController {
    pub fn new(max_iterations: Option<u64>, max_consecutive_failures: Option<u32>) -> Self {
        Self {
            max_iterations,
            max_consecutive_failures,
            iterations: 0,
            consecutive_failures: 0,
        }
    }

    pub fn record_iteration(&mut self, success: bool) {
        self.iterations += 1;
        if success {
            self.consecutive_failures = 0;
        } else {
            self.consecutive_failures += 1;
        }
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn should_stop(&self) -> bool {
        if let Some(max) = self.max_iterations {
            if self.iterations >= max {
                tracing::warn!(iterations = self.iterations, "iteration cap reached");
                return true;
            }
        }
        if let Some(max) = self.max_consecutive_failures {
            if self.consecutive_failures >= max {
                tracing::warn!(
                    failures = self.consecutive_failures,
                    "consecutive-failure cap reached"
                );
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncapped_controller_never_stops() {
        let mut ctrl = LoopController::new(None, None);
        for _ in 0..1000 {
            ctrl.record_iteration(false);
        }
        assert!(!ctrl.should_stop());
    }

    #[test]
    fn iteration_cap_fires() {
        let mut ctrl = LoopController::new(Some(3), None);
        ctrl.record_iteration(true);
        ctrl.record_iteration(true);
        assert!(!ctrl.should_stop());
        ctrl.record_iteration(true);
        assert!(ctrl.should_stop());
    }

    #[test]
    fn success_resets_failure_streak() {
        let mut ctrl = LoopController::new(None, Some(2));
        ctrl.record_iteration(false);
        ctrl.record_iteration(true);
        ctrl.record_iteration(false);
        assert!(!ctrl.should_stop());
        ctrl.record_iteration(false);
        assert!(ctrl.should_stop());
    }
}
