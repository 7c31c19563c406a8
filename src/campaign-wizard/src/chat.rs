//! `expert` and `chat`: the two simulators on stdin/stdout.

use std::sync::Arc;

use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use wizard_chat::{
    ChatAction, Clock, ExpertSimulator, MarketingSimulator, Player, Priority, SeededRng,
    TokioClock, TypingSpeed, VirtualClock,
};
use wizard_core::AppConfig;

use crate::render::ChatView;

#[derive(Args, Debug)]
pub struct ExpertArgs {
    /// Goal to analyze; reads goals from stdin when omitted
    pub goal: Option<String>,

    /// Seed for the generated metrics
    #[arg(long)]
    pub seed: Option<u64>,

    /// Skip every delay
    #[arg(long, default_value_t = false)]
    pub instant: bool,
}

#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Start with one of the predefined tasks (crosssell, retention, ...)
    #[arg(long, conflicts_with = "custom")]
    pub task: Option<String>,

    /// Start with a free-text goal
    #[arg(long)]
    pub custom: Option<String>,

    /// Skip every delay
    #[arg(long, default_value_t = false)]
    pub instant: bool,
}

/// One line of input to a chat loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Quit,
    Reset,
    Task(String),
    Action(ChatAction),
    Priority(Priority),
    Toggle(String),
    Activate,
    Say(String),
    Unknown(String),
}

impl Input {
    pub fn parse(line: &str) -> Input {
        let line = line.trim();
        let Some(command) = line.strip_prefix('/') else {
            return Input::Say(line.to_string());
        };
        let (name, arg) = command
            .split_once(char::is_whitespace)
            .map(|(n, a)| (n, a.trim()))
            .unwrap_or((command, ""));
        match name {
            "quit" | "exit" => Input::Quit,
            "reset" => Input::Reset,
            "activate" => Input::Activate,
            "task" if !arg.is_empty() => Input::Task(arg.to_string()),
            "toggle" if !arg.is_empty() => Input::Toggle(arg.to_string()),
            "action" => ChatAction::parse(arg)
                .map(Input::Action)
                .unwrap_or_else(|| Input::Unknown(line.to_string())),
            "priority" => Priority::parse(arg)
                .map(Input::Priority)
                .unwrap_or_else(|| Input::Unknown(line.to_string())),
            _ => Input::Unknown(line.to_string()),
        }
    }
}

fn player(instant: bool) -> Player {
    let clock: Arc<dyn Clock> = if instant {
        Arc::new(VirtualClock::new())
    } else {
        Arc::new(TokioClock)
    };
    Player::new(clock, Arc::new(ChatView))
}

fn speed(instant: bool, char_delay_ms: u64, line_pause_ms: u64) -> TypingSpeed {
    if instant {
        TypingSpeed::from_millis(0, 0)
    } else {
        TypingSpeed::from_millis(char_delay_ms, line_pause_ms)
    }
}

pub async fn expert(args: ExpertArgs, config: AppConfig) -> anyhow::Result<()> {
    let speed = speed(
        args.instant,
        config.chat.expert_char_delay_ms,
        config.chat.expert_line_pause_ms,
    );
    let rng = SeededRng::new(args.seed.or(config.chat.seed));
    let mut sim = ExpertSimulator::new(player(args.instant), rng, speed);
    sim.reset_conversation();

    if let Some(goal) = args.goal {
        sim.send(&goal).await?;
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match Input::parse(&line) {
            Input::Quit => break,
            Input::Reset => sim.reset_conversation(),
            Input::Say(text) => {
                if let Err(e) = sim.send(&text).await {
                    warn!(error = %e, "Message rejected");
                }
            }
            other => println!("Not available here: {other:?}"),
        }
    }
    Ok(())
}

pub async fn chat(args: ChatArgs, config: AppConfig) -> anyhow::Result<()> {
    let speed = speed(
        args.instant,
        config.chat.marketing_char_delay_ms,
        config.chat.marketing_line_pause_ms,
    );
    let mut sim = MarketingSimulator::new(player(args.instant), speed);
    sim.welcome();
    if let Some(task) = &args.task {
        sim.start_task(task).await?;
    } else if let Some(query) = &args.custom {
        sim.start_custom(query).await?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let result = match Input::parse(&line) {
            Input::Quit => break,
            Input::Reset => {
                sim.reset_chat();
                Ok(())
            }
            Input::Task(key) => {
                sim.reset_chat();
                sim.start_task(&key).await
            }
            Input::Action(action) => sim.handle_action(action).await,
            Input::Priority(priority) => sim.select_priority(priority).await,
            Input::Toggle(agent) => {
                match sim.toggle_reasoning(&agent) {
                    Some(true) => {
                        if let Some(panel) = sim.panel(&agent) {
                            for line in &panel.lines {
                                println!("    {line}");
                            }
                        }
                    }
                    Some(false) => {}
                    None => println!("No reasoning recorded for '{agent}'"),
                }
                Ok(())
            }
            Input::Activate => sim.activate_campaign().await,
            Input::Say(text) => sim.send(&text).await,
            Input::Unknown(text) => {
                println!("Unknown command: {text}");
                Ok(())
            }
        };
        if let Err(e) = result {
            warn!(error = %e, "Chat input rejected");
        }
    }
    Ok(())
}
