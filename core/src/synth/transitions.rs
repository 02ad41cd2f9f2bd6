//! Pipeline phases and the legal moves between them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisPhase {
    Idle,
    ContextBuilt,
    GenerationRequested,
    Validated,
    Executed,
    Rejected,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Invalid transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: SynthesisPhase,
        to: SynthesisPhase,
    },
    #[error("Cannot transition from terminal state {state:?}")]
    FromTerminalState { state: SynthesisPhase },
}

pub struct PhaseTransition;

impl PhaseTransition {
    pub fn validate(from: SynthesisPhase, to: SynthesisPhase) -> Result<(), TransitionError> {
        if Self::is_terminal(from) {
            return Err(TransitionError::FromTerminalState { state: from });
        }

        let is_valid = matches!(
            (from, to),
            (SynthesisPhase::Idle, SynthesisPhase::ContextBuilt)
                | (SynthesisPhase::ContextBuilt, SynthesisPhase::GenerationRequested)
                | (SynthesisPhase::GenerationRequested, SynthesisPhase::Validated)
                | (SynthesisPhase::GenerationRequested, SynthesisPhase::Rejected)
                | (SynthesisPhase::Validated, SynthesisPhase::Executed)
        );

        if is_valid {
            Ok(())
        } else {
            Err(TransitionError::InvalidTransition { from, to })
        }
    }

    pub fn is_terminal(phase: SynthesisPhase) -> bool {
        matches!(phase, SynthesisPhase::Executed | SynthesisPhase::Rejected)
    }

    pub fn phase_description(phase: SynthesisPhase) -> &'static str {
        match phase {
            SynthesisPhase::Idle => "waiting for a request",
            SynthesisPhase::ContextBuilt => "schema context assembled",
            SynthesisPhase::GenerationRequested => "waiting for the generated plan",
            SynthesisPhase::Validated => "plan passed static checks",
            SynthesisPhase::Executed => "query executed",
            SynthesisPhase::Rejected => "plan rejected",
        }
    }
}

/// Current phase of one pipeline run, with its history.
#[derive(Debug, Clone)]
pub struct PhaseTracker {
    current: SynthesisPhase,
    history: Vec<SynthesisPhase>,
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self {
            current: SynthesisPhase::Idle,
            history: vec![SynthesisPhase::Idle],
        }
    }
}

impl PhaseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> SynthesisPhase {
        self.current
    }

    pub fn history(&self) -> &[SynthesisPhase] {
        &self.history
    }

    pub fn advance(&mut self, to: SynthesisPhase) -> Result<(), TransitionError> {
        PhaseTransition::validate(self.current, to)?;
        tracing::debug!(
            target: "querysmith.synth",
            from = ?self.current,
            to = ?to,
            "{}",
            PhaseTransition::phase_description(to)
        );
        self.current = to;
        self.history.push(to);
        Ok(())
    }
}
