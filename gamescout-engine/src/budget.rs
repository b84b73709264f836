//! The budget governor: step and wall-clock caps, adaptive extensions,
//! and the synthesis reserve.
//!
//! Exploration and synthesis have separate budgets on purpose.
//! Under-provisioned synthesis is the dominant cause of truncated JSON,
//! so the governor carves the reserve out of the total up front and
//! exploration can never eat it.

use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Smallest allowed synthesis reserve.
pub const MIN_SYNTHESIS_RESERVE: Duration = Duration::from_secs(2 * 60);

/// Default synthesis reserve.
pub const DEFAULT_SYNTHESIS_RESERVE: Duration = Duration::from_secs(3 * 60);


/// Budget configuration for one session.
#[derive(Debug, Clone)]
pub struct BudgetConfig {
    /// Steps the exploration loop may use before asking for more.
    pub max_steps: u32,
    /// Ceiling adaptive step grants can never exceed. Ignored unless
    /// `adaptive_steps` is set.
    pub hard_cap_steps: u32,
    /// Total session wall-clock budget.
    pub total_timeout: Duration,
    /// Ceiling adaptive time grants can never push the total past.
    /// Ignored unless `adaptive_time` is set.
    pub timeout_hard_cap: Duration,
    /// Wall-clock reserved for synthesis; clamped to at least
    /// [`MIN_SYNTHESIS_RESERVE`].
    pub synthesis_reserve: Duration,
    /// Whether the model may request more steps.
    pub adaptive_steps: bool,
    /// Whether the model may request more time.
    pub adaptive_time: bool,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_steps: 40,
            hard_cap_steps: 60,
            total_timeout: Duration::from_secs(20 * 60),
            timeout_hard_cap: Duration::from_secs(30 * 60),
            synthesis_reserve: DEFAULT_SYNTHESIS_RESERVE,
            adaptive_steps: false,
            adaptive_time: false,
        }
    }
}

/// Verdict of an admission check, taken before every model turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAdmission {
    /// Run the step.
    Admitted,
    /// The step budget is spent.
    StepsExhausted,
    /// The exploration deadline has passed.
    DeadlinePassed,
}

/// Tracks and enforces the session budget.
#[derive(Debug)]
pub struct BudgetGovernor {
    steps_used: u32,
    steps_max: u32,
    steps_hard_cap: u32,
    started_at: Instant,
    total_deadline: Instant,
    exploration_deadline: Instant,
    timeout_hard_cap: Instant,
    reserve: Duration,
    adaptive_steps: bool,
    adaptive_time: bool,
}

impl BudgetGovernor {
    /// Start the budget clock now.
    pub fn new(config: &BudgetConfig) -> Self {
        let started_at = Instant::now();
        let reserve = config.synthesis_reserve.max(MIN_SYNTHESIS_RESERVE);
        let total_deadline = started_at + config.total_timeout;
        // If the whole budget is smaller than the reserve, exploration
        // gets nothing and synthesis gets everything.
        let exploration_deadline = total_deadline
            .checked_sub(reserve)
            .filter(|d| *d > started_at)
            .unwrap_or(started_at);
        let steps_hard_cap = if config.adaptive_steps {
            config.hard_cap_steps.max(config.max_steps)
        } else {
            config.max_steps
        };
        let timeout_hard_cap = started_at + config.timeout_hard_cap.max(config.total_timeout);

        Self {
            steps_used: 0,
            steps_max: config.max_steps,
            steps_hard_cap,
            started_at,
            total_deadline,
            exploration_deadline,
            timeout_hard_cap,
            reserve,
            adaptive_steps: config.adaptive_steps,
            adaptive_time: config.adaptive_time,
        }
    }

    /// Check whether another exploration step may run.
    pub fn admit_step(&self) -> StepAdmission {
        if Instant::now() >= self.exploration_deadline {
            StepAdmission::DeadlinePassed
        } else if self.steps_used >= self.steps_max {
            StepAdmission::StepsExhausted
        } else {
            StepAdmission::Admitted
        }
    }

    /// Record completed steps.
    pub fn record_step(&mut self, count: u32) {
        self.steps_used += count;
        debug_assert!(self.steps_used <= self.steps_hard_cap);
    }

    /// Steps used so far.
    pub fn steps_used(&self) -> u32 {
        self.steps_used
    }

    /// Current step limit.
    pub fn steps_max(&self) -> u32 {
        self.steps_max
    }

    /// Raise the step limit toward the hard cap. The hard cap silently
    /// truncates the grant, and a disabled extension grants zero.
    /// Never fails.
    pub fn request_more_steps(&mut self, requested: u32) -> u32 {
        if !self.adaptive_steps {
            return 0;
        }
        let old = self.steps_max;
        self.steps_max = old.saturating_add(requested).min(self.steps_hard_cap);
        let granted = self.steps_max - old;
        debug!(requested, granted, limit = self.steps_max, "step extension");
        granted
    }

    /// Extend both the total and exploration deadlines, capped at the
    /// timeout hard cap. Returns the duration actually granted.
    pub fn request_more_time(&mut self, requested: Duration) -> Duration {
        if !self.adaptive_time {
            return Duration::ZERO;
        }
        let new_total = (self.total_deadline + requested).min(self.timeout_hard_cap);
        let granted = new_total.duration_since(self.total_deadline);
        self.total_deadline = new_total;
        self.exploration_deadline += granted;
        debug!(granted_ms = granted.as_millis() as u64, "time extension");
        granted
    }

    /// Deadline for the exploration loop.
    pub fn exploration_deadline(&self) -> Instant {
        self.exploration_deadline
    }

    /// Deadline handed to the synthesizer: the total deadline, or the
    /// full reserve from now, whichever is later. Early-terminated
    /// exploration therefore never starves synthesis.
    pub fn synthesis_deadline(&self) -> Instant {
        self.total_deadline.max(Instant::now() + self.reserve)
    }

    /// Wall-clock spent so far.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}
