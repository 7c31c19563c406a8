use serde::{Deserialize, Serialize};

use wizard_core::{WizardError, WizardResult};

/// Where a conversation stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatPhase {
    Waiting,
    AwaitingGoal,
    AwaitingPriority,
    Analyzing,
    Complete,
}

/// Describes a single valid phase change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub from: ChatPhase,
    pub to: ChatPhase,
    pub trigger: String,
}

/// Guards a conversation by enforcing a finite set of valid phase changes.
/// Reset is always allowed and bypasses the table.
#[derive(Debug, Clone)]
pub struct PhaseMachine {
    state: ChatPhase,
    transitions: Vec<PhaseTransition>,
}

impl PhaseMachine {
    /// Starts in `Waiting` with every valid transition pre-configured.
    pub fn new() -> Self {
        let t = |from, to, trigger: &str| PhaseTransition {
            from,
            to,
            trigger: trigger.to_string(),
        };
        let transitions = vec![
            // Waiting ->
            t(ChatPhase::Waiting, ChatPhase::AwaitingGoal, "task_selected"),
            t(ChatPhase::Waiting, ChatPhase::Analyzing, "goal_understood"),
            // AwaitingGoal ->
            t(ChatPhase::AwaitingGoal, ChatPhase::AwaitingPriority, "goal_received"),
            t(ChatPhase::AwaitingGoal, ChatPhase::Analyzing, "goal_understood"),
            t(ChatPhase::AwaitingGoal, ChatPhase::Complete, "proactive_findings"),
            // AwaitingPriority ->
            t(ChatPhase::AwaitingPriority, ChatPhase::Analyzing, "priority_selected"),
            // Analyzing ->
            t(ChatPhase::Analyzing, ChatPhase::Complete, "analysis_finished"),
            // Complete ->
            t(ChatPhase::Complete, ChatPhase::Analyzing, "new_goal"),
            t(ChatPhase::Complete, ChatPhase::AwaitingGoal, "goal_unclear"),
        ];
        Self {
            state: ChatPhase::Waiting,
            transitions,
        }
    }

    pub fn state(&self) -> ChatPhase {
        self.state
    }

    pub fn can_transition(&self, from: ChatPhase, to: ChatPhase) -> bool {
        self.transitions.iter().any(|t| t.from == from && t.to == to)
    }

    /// Move to `to`. Staying in the current phase is a no-op.
    pub fn transition(&mut self, to: ChatPhase) -> WizardResult<()> {
        if self.state == to {
            return Ok(());
        }
        if self.can_transition(self.state, to) {
            self.state = to;
            Ok(())
        } else {
            Err(WizardError::InvalidTransition(format!(
                "{:?} -> {:?}",
                self.state, to
            )))
        }
    }

    pub fn reset(&mut self) {
        self.state = ChatPhase::Waiting;
    }
}

impl Default for PhaseMachine {
    fn default() -> Self {
        Self::new()
    }
}
