//! Scripted marketing chat: intent detection, typed message blocks, a timed
//! cue player, and the two simulators built on them.

pub mod blocks;
pub mod expert;
pub mod intent;
pub mod marketing;
pub mod phase;
pub mod rng;
pub mod scheduler;

pub use blocks::{render_text, Block, ChatOption, Reply};
pub use expert::ExpertSimulator;
pub use intent::{detect_intent, Intent, IntentKind};
pub use marketing::{ChatAction, ChatMode, MarketingSimulator, Priority};
pub use phase::{ChatPhase, PhaseMachine};
pub use rng::{RangeRng, SeededRng};
pub use scheduler::{ChatEvent, Clock, Player, Script, TokioClock, TypingSpeed, VirtualClock};
