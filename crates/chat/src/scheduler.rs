//! Timed replay of scripted conversations.
//!
//! A simulator builds a [`Script`] of cues up front and a [`Player`] replays
//! it into an [`EventSink<ChatEvent>`], sleeping on a [`Clock`] between cues.
//! Reasoning lines are revealed one character at a time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use wizard_core::EventSink;

use crate::blocks::Block;
use crate::phase::ChatPhase;

/// A worker shown in the agent panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRef {
    pub key: String,
    pub name: String,
    pub icon: String,
}

impl AgentRef {
    pub fn new(key: &str, name: &str, icon: &str) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            icon: icon.to_string(),
        }
    }
}

/// Everything a chat simulator tells its view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatEvent {
    UserMessage(String),
    AssistantMessage(Vec<Block>),
    Typing,
    AgentActivated(AgentRef),
    AgentCompleted(String),
    ReasoningCleared,
    ReasoningLineStarted { agent: String, sub: bool },
    ReasoningChar(char),
    ReasoningLineFinished { agent: String, text: String },
    ReasoningToggled { agent: String, expanded: bool },
    OrchestratorActive,
    OrchestratorDone,
    ModeChanged(String),
    PhaseChanged(ChatPhase),
    Reset,
}

/// One step of a script.
#[derive(Debug, Clone, PartialEq)]
pub enum Cue {
    Pause(Duration),
    Typing,
    Activate(AgentRef),
    ClearReasoning,
    /// A reasoning line typed out under `agent`. Lines starting with `•` or
    /// `→` are sub-steps.
    Think { agent: String, text: String },
    Message(Vec<Block>),
    Complete(String),
    OrchestratorActive,
    OrchestratorDone,
}

pub fn is_sub_step(line: &str) -> bool {
    line.starts_with('•') || line.starts_with('→')
}

/// Per-character and per-line delays for typed reasoning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypingSpeed {
    pub char_delay: Duration,
    pub line_pause: Duration,
}

impl TypingSpeed {
    pub fn from_millis(char_delay_ms: u64, line_pause_ms: u64) -> Self {
        Self {
            char_delay: Duration::from_millis(char_delay_ms),
            line_pause: Duration::from_millis(line_pause_ms),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Script {
    cues: Vec<Cue>,
    speed: TypingSpeed,
}

impl Script {
    pub fn new(speed: TypingSpeed) -> Self {
        Self {
            cues: Vec::new(),
            speed,
        }
    }

    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    pub fn push(&mut self, cue: Cue) -> &mut Self {
        self.cues.push(cue);
        self
    }

    pub fn pause_ms(&mut self, ms: u64) -> &mut Self {
        self.push(Cue::Pause(Duration::from_millis(ms)))
    }

    pub fn typing(&mut self) -> &mut Self {
        self.push(Cue::Typing)
    }

    pub fn activate(&mut self, agent: AgentRef) -> &mut Self {
        self.push(Cue::Activate(agent))
    }

    pub fn clear_reasoning(&mut self) -> &mut Self {
        self.push(Cue::ClearReasoning)
    }

    pub fn think<S: AsRef<str>>(&mut self, agent: &str, lines: &[S]) -> &mut Self {
        for line in lines {
            self.push(Cue::Think {
                agent: agent.to_string(),
                text: line.as_ref().to_string(),
            });
        }
        self
    }

    pub fn message(&mut self, blocks: Vec<Block>) -> &mut Self {
        self.push(Cue::Message(blocks))
    }

    pub fn complete(&mut self, agent: &str) -> &mut Self {
        self.push(Cue::Complete(agent.to_string()))
    }

    /// Total time the script spends waiting when played.
    pub fn duration(&self) -> Duration {
        self.cues
            .iter()
            .map(|cue| match cue {
                Cue::Pause(d) => *d,
                Cue::Think { text, .. } => {
                    self.speed.char_delay * text.chars().count() as u32 + self.speed.line_pause
                }
                _ => Duration::ZERO,
            })
            .sum()
    }

    /// Messages in the script, in order.
    pub fn messages(&self) -> impl Iterator<Item = &Vec<Block>> {
        self.cues.iter().filter_map(|c| match c {
            Cue::Message(blocks) => Some(blocks),
            _ => None,
        })
    }
}

/// Source of delays.
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real time.
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Returns immediately and adds up the time it was asked to wait.
#[derive(Default)]
pub struct VirtualClock {
    elapsed_nanos: AtomicU64,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_nanos.load(Ordering::Relaxed))
    }
}

#[async_trait]
impl Clock for VirtualClock {
    async fn sleep(&self, duration: Duration) {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        self.elapsed_nanos.fetch_add(nanos, Ordering::Relaxed);
    }
}

/// Replays scripts in real or virtual time.
#[derive(Clone)]
pub struct Player {
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EventSink<ChatEvent>>,
}

impl Player {
    pub fn new(clock: Arc<dyn Clock>, sink: Arc<dyn EventSink<ChatEvent>>) -> Self {
        Self { clock, sink }
    }

    pub fn emit(&self, event: ChatEvent) {
        self.sink.emit(event);
    }

    pub async fn play(&self, script: &Script) {
        let speed = script.speed;
        for cue in &script.cues {
            match cue {
                Cue::Pause(d) => self.clock.sleep(*d).await,
                Cue::Typing => self.emit(ChatEvent::Typing),
                Cue::Activate(agent) => self.emit(ChatEvent::AgentActivated(agent.clone())),
                Cue::ClearReasoning => self.emit(ChatEvent::ReasoningCleared),
                Cue::Think { agent, text } => {
                    self.emit(ChatEvent::ReasoningLineStarted {
                        agent: agent.clone(),
                        sub: is_sub_step(text),
                    });
                    for c in text.chars() {
                        self.emit(ChatEvent::ReasoningChar(c));
                        self.clock.sleep(speed.char_delay).await;
                    }
                    self.emit(ChatEvent::ReasoningLineFinished {
                        agent: agent.clone(),
                        text: text.clone(),
                    });
                    self.clock.sleep(speed.line_pause).await;
                }
                Cue::Message(blocks) => self.emit(ChatEvent::AssistantMessage(blocks.clone())),
                Cue::Complete(agent) => self.emit(ChatEvent::AgentCompleted(agent.clone())),
                Cue::OrchestratorActive => self.emit(ChatEvent::OrchestratorActive),
                Cue::OrchestratorDone => self.emit(ChatEvent::OrchestratorDone),
            }
        }
    }
}
