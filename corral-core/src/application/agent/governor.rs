use crate::constants::{DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_TOTAL_OUTPUT_TOKENS, DEFAULT_TIMEOUT_SECS};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetLimits {
    pub max_iterations: u32,
    pub max_total_output_tokens: u64,
    pub timeout: Duration,
}

impl Default for BudgetLimits {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_total_output_tokens: DEFAULT_MAX_TOTAL_OUTPUT_TOKENS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetKind {
    Iterations,
    OutputTokens,
    WallClock,
}

impl fmt::Display for BudgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BudgetKind::Iterations => "iterations",
            BudgetKind::OutputTokens => "output tokens",
            BudgetKind::WallClock => "wall clock",
        })
    }
}

/// What a session has consumed so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BudgetUsage {
    pub iterations: u32,
    pub output_tokens: u64,
    pub elapsed: Duration,
}

/// Per-session budget tracker. The clock starts at construction.
#[derive(Debug)]
pub struct SafetyGovernor {
    limits: BudgetLimits,
    started: Instant,
    iterations: u32,
    output_tokens: u64,
}

impl SafetyGovernor {
    pub fn new(limits: BudgetLimits) -> Self {
        Self {
            limits,
            started: Instant::now(),
            iterations: 0,
            output_tokens: 0,
        }
    }

    /// Counts one provider call.
    pub fn begin_iteration(&mut self) {
        self.iterations = self.iterations.saturating_add(1);
    }

    pub fn record_output_tokens(&mut self, tokens: u64) {
        self.output_tokens = self.output_tokens.saturating_add(tokens);
    }

    /// The first exhausted budget, checked as iterations, output tokens, then
    /// wall clock.
    pub fn exhausted(&self) -> Option<BudgetKind> {
        let kind = if self.iterations >= self.limits.max_iterations {
            BudgetKind::Iterations
        } else if self.output_tokens >= self.limits.max_total_output_tokens {
            BudgetKind::OutputTokens
        } else if self.started.elapsed() >= self.limits.timeout {
            BudgetKind::WallClock
        } else {
            return None;
        };
        let usage = self.usage();
        warn!(
            budget = %kind,
            iterations = usage.iterations,
            output_tokens = usage.output_tokens,
            elapsed_ms = usage.elapsed.as_millis() as u64,
            "Session budget exhausted"
        );
        Some(kind)
    }

    pub fn usage(&self) -> BudgetUsage {
        BudgetUsage {
            iterations: self.iterations,
            output_tokens: self.output_tokens,
            elapsed: self.started.elapsed(),
        }
    }
}
