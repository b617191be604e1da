//! Saga state machine.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::SagaError;

/// The state of a saga in its lifecycle.
///
/// State transitions:
/// ```text
/// Running ──┬──────────────────────► Completed
///           ├──────────────────────► Failed
///           └──► Compensating ─────► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SagaState {
    /// Saga steps are being executed.
    #[default]
    Running,

    /// A step failed and compensating calls are in progress.
    Compensating,

    /// All steps completed successfully (terminal state).
    Completed,

    /// The flow ended with an error surfaced to the caller (terminal state).
    Failed,
}

impl SagaState {
    /// Returns true if the saga can begin compensation.
    pub fn can_compensate(&self) -> bool {
        matches!(self, SagaState::Running)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaState::Running => "Running",
            SagaState::Compensating => "Compensating",
            SagaState::Completed => "Completed",
            SagaState::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for SagaState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Bookkeeping for one flow execution. Nothing is persisted; transitions
/// go to the log and the metrics recorder.
#[derive(Debug)]
pub(crate) struct SagaRun {
    saga_type: &'static str,
    state: SagaState,
    started: Instant,
}

impl SagaRun {
    pub(crate) fn start(saga_type: &'static str) -> Self {
        metrics::counter!("saga_executions_total", "saga_type" => saga_type).increment(1);
        Self {
            saga_type,
            state: SagaState::Running,
            started: Instant::now(),
        }
    }

    /// Enters compensation after `failed_step`.
    pub(crate) fn compensate(&mut self, failed_step: &'static str) {
        if self.state.can_compensate() {
            self.state = SagaState::Compensating;
            tracing::warn!(saga_type = self.saga_type, failed_step, "saga compensating");
        }
    }

    /// Records one compensating call.
    pub(crate) fn compensation(&self, step: &'static str, succeeded: bool) {
        let outcome = if succeeded { "completed" } else { "failed" };
        metrics::counter!(
            "compensations_total",
            "saga_type" => self.saga_type,
            "step" => step,
            "outcome" => outcome
        )
        .increment(1);
    }

    /// Moves to a terminal state according to the flow's result.
    pub(crate) fn finish<T>(mut self, result: &Result<T, SagaError>) -> SagaState {
        let duration = self.started.elapsed().as_secs_f64();
        metrics::histogram!("saga_duration_seconds", "saga_type" => self.saga_type)
            .record(duration);

        match result {
            Ok(_) => {
                self.state = SagaState::Completed;
                metrics::counter!("saga_completed", "saga_type" => self.saga_type).increment(1);
                tracing::info!(saga_type = self.saga_type, duration, "saga completed successfully");
            }
            Err(e) => {
                let compensated = self.state == SagaState::Compensating;
                self.state = SagaState::Failed;
                metrics::counter!("saga_failed", "saga_type" => self.saga_type).increment(1);
                tracing::warn!(
                    saga_type = self.saga_type,
                    duration,
                    compensated,
                    step = e.step_label(),
                    error = %e,
                    "saga failed"
                );
            }
        }
        self.state
    }
}
