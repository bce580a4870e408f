//! Per-task execution budgets derived from task complexity.

use std::time::Duration;

/// Step, retry, and wall-clock budgets for a single task attempt.
///
/// A budget is derived once per attempt from the complexity rating the
/// environment reports for the task instance, and is handed to the agent
/// runtime unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    /// Maximum number of agent steps.
    pub max_steps: u32,

    /// Maximum number of retries for a failing agent step.
    pub max_retries: u32,

    /// Wall-clock limit for the whole agent run.
    pub timeout: Duration,
}

impl Budget {
    /// Derive a budget from a complexity rating and the two caller-supplied
    /// multipliers.
    ///
    /// Rounding is always ceiling so that any task with nonzero complexity
    /// receives at least one step and a nonzero timeout. Callers must
    /// guarantee `complexity > 0`; the rating comes from the environment and
    /// is positive for every defined task instance.
    pub fn compute(complexity: f64, max_steps_multiplier: u32, timeout_multiplier: u32) -> Self {
        let max_steps = (complexity * f64::from(max_steps_multiplier)).ceil() as u32;
        let timeout_secs = (complexity * f64::from(timeout_multiplier)).ceil() as u64;
        let max_retries = max_steps.div_ceil(10);

        Self {
            max_steps,
            max_retries,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Timeout in whole seconds, as used in log lines and failure reasons.
    pub fn timeout_secs(&self) -> u64 {
        self.timeout.as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_reference_values() {
        let budget = Budget::compute(2.0, 15, 300);
        assert_eq!(budget.max_steps, 30);
        assert_eq!(budget.timeout, Duration::from_secs(600));
        assert_eq!(budget.max_retries, 3);
    }

    #[test]
    fn test_compute_rounds_up() {
        // 0.5 * 15 = 7.5 -> 8 steps, 0.5 * 300 = 150s, ceil(8/10) = 1 retry
        let budget = Budget::compute(0.5, 15, 300);
        assert_eq!(budget.max_steps, 8);
        assert_eq!(budget.timeout, Duration::from_secs(150));
        assert_eq!(budget.max_retries, 1);
    }

    #[test]
    fn test_tiny_complexity_gets_at_least_one_step() {
        let budget = Budget::compute(0.01, 15, 300);
        assert_eq!(budget.max_steps, 1);
        assert_eq!(budget.timeout, Duration::from_secs(3));
        assert_eq!(budget.max_retries, 1);
    }

    #[test]
    fn test_exact_multiples_do_not_round() {
        let budget = Budget::compute(3.0, 10, 100);
        assert_eq!(budget.max_steps, 30);
        assert_eq!(budget.timeout, Duration::from_secs(300));
        assert_eq!(budget.max_retries, 3);
    }

    #[test]
    fn test_retries_are_ceil_of_steps_over_ten() {
        for (complexity, expected_retries) in [(1.0, 2), (0.6, 1), (4.0, 6)] {
            let budget = Budget::compute(complexity, 15, 300);
            assert_eq!(budget.max_retries, expected_retries, "complexity {complexity}");
            assert_eq!(budget.max_retries, budget.max_steps.div_ceil(10));
        }
    }
}
