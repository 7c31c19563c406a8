//! Orchestration chat: a goal and a priority, then seven agents reason in
//! turn and post their findings. Proactive tasks skip the questions and open
//! with findings.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use wizard_core::{WizardError, WizardResult};

use crate::blocks::{Block, ChatOption, Metric, Reply};
use crate::phase::{ChatPhase, PhaseMachine};
use crate::scheduler::{AgentRef, ChatEvent, Cue, Player, Script, TypingSpeed};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    Reactive,
    Proactive,
}

impl ChatMode {
    pub fn label(self) -> &'static str {
        match self {
            ChatMode::Reactive => "Reactive Mode",
            ChatMode::Proactive => "Proactive Mode",
        }
    }
}

/// A starting point picked from the expert home page.
#[derive(Debug)]
pub struct Task {
    pub key: &'static str,
    pub name: &'static str,
    pub mode: ChatMode,
    headline: &'static str,
    question: &'static str,
    examples: &'static [&'static str],
}

pub static TASKS: [Task; 7] = [
    Task {
        key: "crosssell",
        name: "Discover Cross-sell Segments",
        mode: ChatMode::Reactive,
        headline: "Discover Cross-Sell Opportunities",
        question: "Please describe your business goal. For example:",
        examples: &[
            "Increase adoption of content bundle packs",
            "Cross-sell data add-ons to voice-heavy users",
            "Promote family plans to multi-device households",
        ],
    },
    Task {
        key: "retention",
        name: "Design Retention Program",
        mode: ChatMode::Proactive,
        headline: "Design Retention Program",
        question: "",
        examples: &[],
    },
    Task {
        key: "optimize",
        name: "Optimise Campaign Performance",
        mode: ChatMode::Reactive,
        headline: "Optimise Campaign Performance",
        question: "Which campaign would you like me to analyze?",
        examples: &[],
    },
    Task {
        key: "revenue",
        name: "Accelerate Revenue Growth",
        mode: ChatMode::Reactive,
        headline: "Accelerate Revenue Growth",
        question: "What's your revenue growth objective?",
        examples: &[],
    },
    Task {
        key: "winback",
        name: "Reactivate Dormant Customers",
        mode: ChatMode::Proactive,
        headline: "Reactivate Dormant Customers",
        question: "",
        examples: &[],
    },
    Task {
        key: "engagement",
        name: "Improve Customer Engagement",
        mode: ChatMode::Reactive,
        headline: "Improve Customer Engagement",
        question: "What engagement challenge would you like to address?",
        examples: &[],
    },
    Task {
        key: "newproduct",
        name: "Launch New Product Campaign",
        mode: ChatMode::Reactive,
        headline: "Launch New Product Campaign",
        question: "Tell me about the product you want to launch.",
        examples: &[],
    },
];

pub fn find_task(key: &str) -> Option<&'static Task> {
    TASKS.iter().find(|t| t.key.eq_ignore_ascii_case(key.trim()))
}

impl Task {
    /// Opening message of a reactive task.
    pub fn welcome(&self) -> Vec<Block> {
        let intro = Block::paragraph(format!("You've selected {}.", self.headline));
        if self.examples.is_empty() {
            vec![intro, Block::paragraph(self.question)]
        } else {
            vec![intro, Block::list(self.question, self.examples)]
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Revenue,
    Engagement,
    Retention,
}

impl Priority {
    pub fn parse(s: &str) -> Option<Priority> {
        match s.trim().to_ascii_lowercase().as_str() {
            "revenue" => Some(Priority::Revenue),
            "engagement" => Some(Priority::Engagement),
            "retention" => Some(Priority::Retention),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Revenue => "revenue",
            Priority::Engagement => "engagement",
            Priority::Retention => "retention",
        }
    }

    /// What the user is shown saying when the button is picked.
    pub fn description(self) -> &'static str {
        match self {
            Priority::Revenue => "Revenue with minimal churn risk",
            Priority::Engagement => "Engagement with sustainable growth",
            Priority::Retention => "Retention with minimal revenue impact",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatAction {
    Design,
    Review,
    Refine,
}

impl ChatAction {
    pub fn parse(s: &str) -> Option<ChatAction> {
        match s.trim().to_ascii_lowercase().as_str() {
            "design" => Some(ChatAction::Design),
            "review" => Some(ChatAction::Review),
            "refine" => Some(ChatAction::Refine),
            _ => None,
        }
    }
}

pub fn welcome() -> Vec<Block> {
    vec![Block::paragraph(
        "Hello! I'm your Marketing Expert. What would you like to work on today?",
    )]
}

fn priority_prompt() -> Vec<Block> {
    vec![
        Block::paragraph(
            "Understood. I will identify cross-sell opportunities across your subscriber base and design targeted interventions.",
        ),
        Block::paragraph(
            "Before I proceed, what priority should I optimise for: revenue, engagement, or retention?",
        ),
        Block::options(vec![
            ChatOption::new("💰", "Revenue", Reply::Priority("revenue".into())),
            ChatOption::new("📱", "Engagement", Reply::Priority("engagement".into())),
            ChatOption::new("🛡️", "Retention", Reply::Priority("retention".into())),
        ]),
    ]
}

fn noted() -> Vec<Block> {
    vec![
        Block::paragraph("Ok, noted."),
        Block::paragraph(
            "I will discover subscriber cohorts where bundle adoption increases ARPU without increasing downgrade or churn probability.",
        ),
    ]
}

struct Stage {
    agent: AgentRef,
    reasoning: &'static [&'static str],
    output: Option<Vec<Block>>,
}

fn stages() -> Vec<Stage> {
    vec![
        Stage {
            agent: AgentRef::new("planner", "Outcome Planner Agent", "🎯"),
            reasoning: &[
                "Translate vague business goal → measurable outcome",
                "Define success metric: Incremental ARPU uplift + stable churn probability",
                "Define candidate population: Postpaid non-bundle subscribers",
                "Define constraints: Avoid price-sensitive segments",
            ],
            output: None,
        },
        Stage {
            agent: AgentRef::new("segment", "Segment Discovery Agent", "👥"),
            reasoning: &[
                "Identify natural affinity signals instead of demographics:",
                "• OTT consumption patterns",
                "• Data usage bursts during streaming hours",
                "• App category affinity",
                "• Roaming & weekend behavior",
                "• Historical add-on purchases",
            ],
            output: Some(vec![
                Block::heading("3 high-propensity micro-segments discovered:"),
                Block::table(
                    &["Segment", "Behaviour Signature", "Bundle Fit"],
                    &[
                        &["Night Streamers", "High 11pm-2am video usage", "Entertainment Pack"],
                        &["Family Sharers", "Multi-device usage", "Family Content Pack"],
                        &["Sports Event Spikers", "Usage spikes during match days", "Sports Pack"],
                    ],
                ),
            ]),
        },
        Stage {
            agent: AgentRef::new("elasticity", "Elasticity Intelligence Agent", "📊"),
            reasoning: &[
                "Determine willingness-to-pay and downgrade risk",
                "Analyze price sensitivity across discovered segments",
                "Calculate churn probability under different offer scenarios",
                "Identify upsell headroom for each cohort",
            ],
            output: Some(vec![Block::table(
                &["Segment", "Price Sensitivity", "Churn Risk", "Upsell Headroom"],
                &[
                    &["Night Streamers", "Medium", "Low", "High"],
                    &["Family Sharers", "Low", "Very Low", "Very High"],
                    &["Sports Spikers", "High", "Medium", "Moderate"],
                ],
            )]),
        },
        Stage {
            agent: AgentRef::new("offer", "Offer Advisor Agent", "🎁"),
            reasoning: &[
                "Not just recommend a bundle",
                "→ Recommend WHO + WHAT + WHEN + HOW",
                "Match offer intensity to segment price sensitivity",
                "Design entry points for cautious segments",
            ],
            output: Some(vec![Block::table(
                &["Segment", "Recommended Bundle", "Strategy"],
                &[
                    &["Night Streamers", "Entertainment Lite Pack", "Entry upgrade"],
                    &["Family Sharers", "Premium Family Pack", "Value expansion"],
                    &["Sports Spikers", "Event Pass", "Occasion-based offer"],
                ],
            )]),
        },
        Stage {
            agent: AgentRef::new("channel", "Channel Explorer Agent", "📡"),
            reasoning: &[
                "Find moment of highest receptivity",
                "Match channel to segment behavior patterns",
                "Optimize timing for maximum conversion probability",
            ],
            output: Some(vec![Block::table(
                &["Segment", "Best Channel", "Best Moment"],
                &[
                    &["Night Streamers", "In-app banner", "During buffering event"],
                    &["Family Sharers", "Email + App", "Billing cycle day 2"],
                    &["Sports Spikers", "Push notification", "2 hrs before match"],
                ],
            )]),
        },
        Stage {
            agent: AgentRef::new("campaign", "Campaign Design Agent", "✍️"),
            reasoning: &[
                "Construct contextual persuasion rather than generic promotion",
                "Personalize message based on observed behavior",
                "Create urgency through relevance, not pressure",
            ],
            output: Some(vec![Block::paragraph(
                "The campaign message has been generated.",
            )]),
        },
        Stage {
            agent: AgentRef::new("prediction", "Outcome Optimisation Agent", "🔮"),
            reasoning: &[
                "Simulate before execution",
                "Calculate expected lift across all segments",
                "Validate projected churn stays within safe threshold",
                "Generate confidence score for deployment",
            ],
            output: Some(vec![
                Block::heading("Projected impact:"),
                Block::table(
                    &["Metric", "Expected Change"],
                    &[
                        &["Bundle Adoption", "+18%"],
                        &["ARPU", "+6.4%"],
                        &["Churn", "+0.2% (within safe threshold)"],
                    ],
                ),
            ]),
        },
    ]
}

fn summary() -> Vec<Block> {
    vec![
        Block::paragraph(
            "I discovered three cross-sellable subscriber cohorts and designed targeted interventions.",
        ),
        Block::paragraph(
            "The campaign is predicted to increase bundle adoption by 18% with safe churn levels.",
        ),
        Block::paragraph("Would you like me to design, review creatives, or refine targeting?"),
        Block::options(vec![
            ChatOption::new("🎨", "Design", Reply::Action("design".into())),
            ChatOption::new("📋", "Show Campaign Details", Reply::Action("review".into())),
            ChatOption::new("🎯", "Refine Targeting", Reply::Action("refine".into())),
        ]),
    ]
}

fn blueprint() -> Vec<Block> {
    vec![
        Block::heading("📋 Campaign Blueprint"),
        Block::list(
            "🎯 Target Segments",
            &[
                "Night Streamers (45K subscribers)",
                "Family Sharers (32K subscribers)",
                "Sports Event Spikers (28K subscribers)",
            ],
        ),
        Block::list(
            "🎁 Recommended Bundles",
            &[
                "Entertainment Lite Pack → Night Streamers",
                "Premium Family Pack → Family Sharers",
                "Event Pass → Sports Spikers",
            ],
        ),
        Block::list(
            "💰 Pricing Strategy",
            &[
                "Entry pricing for price-sensitive Night Streamers",
                "Value bundling for high-headroom Family Sharers",
                "Occasion-based pricing for Sports Spikers",
            ],
        ),
        Block::list(
            "📱 Channel Plan",
            &[
                "In-app banners during buffering",
                "Email + App on billing day 2",
                "Push notifications 2hrs before matches",
            ],
        ),
        Block::paragraph("✉️ Messaging Creatives"),
        Block::Quote {
            text: "You watched 18 hours of entertainment this week. Upgrade to the Entertainment Pack and stream without limits tonight.".into(),
        },
        Block::list(
            "📊 Expected Impact",
            &["Bundle Adoption: +18%", "ARPU: +6.4%", "Churn: +0.2% (safe)"],
        ),
        Block::list(
            "⚠️ Risk Guardrails",
            &[
                "Max 3 contacts per subscriber per week",
                "Exclude recent complainers (NPS < 6)",
                "Budget cap per segment",
                "Auto-pause if churn exceeds +0.5%",
            ],
        ),
        Block::KeyValues {
            rows: vec![("Execution Readiness Score:".into(), "92%".into())],
        },
        Block::options(vec![
            ChatOption::new("🎨", "Design Campaign", Reply::Action("design".into())),
            ChatOption::new("🎯", "Refine Targeting", Reply::Action("refine".into())),
        ]),
    ]
}

fn canvas() -> Vec<Block> {
    vec![
        Block::heading("Campaign Canvas:"),
        Block::paragraph("Click on Activate button to launch campaign"),
        Block::options(vec![ChatOption::new("🚀", "Activate", Reply::Activate)]),
    ]
}

fn refine_options() -> Vec<Block> {
    vec![
        Block::paragraph("What would you like to adjust?"),
        Block::options(vec![
            ChatOption::new(
                "👨‍👩‍👧",
                "Focus on Family Sharers",
                Reply::Say("Focus only on Family Sharers - highest headroom".into()),
            ),
            ChatOption::new(
                "🛡️",
                "Exclude High Risk",
                Reply::Say("Exclude Sports Spikers - too risky".into()),
            ),
            ChatOption::new(
                "💰",
                "Adjust Pricing",
                Reply::Say("Increase discount for Night Streamers".into()),
            ),
        ]),
    ]
}

fn follow_up() -> Vec<Block> {
    vec![
        Block::paragraph("Understood. I'll adjust the campaign based on your feedback and re-optimize."),
        Block::paragraph("Would you like me to show the updated blueprint or proceed to design?"),
        Block::options(vec![
            ChatOption::new("🎨", "Design Updated Campaign", Reply::Action("design".into())),
            ChatOption::new("📋", "Review Updated Blueprint", Reply::Action("review".into())),
        ]),
    ]
}

fn activation() -> Vec<Block> {
    vec![
        Block::heading("🚀 Campaign Activated Successfully!"),
        Block::paragraph(
            "Your cross-sell campaign for Content Bundle Packs is now live and targeting postpaid subscribers.",
        ),
        Block::list(
            "Details:",
            &[
                "✅ Campaign ID: CSL_CNT_2024_0287",
                "✅ Target Segments: 3 segments (105K subscribers)",
                "✅ Status: Live",
                "⏱️ First messages will be sent within 15 minutes",
                "📊 Real-time performance tracking is now enabled",
            ],
        ),
        Block::Metrics {
            items: vec![
                Metric::new("👥", "105K", "Expected Reach"),
                Metric::new("🎯", "18%", "Conversion Target"),
                Metric::new("💰", "₹2.4Cr", "Revenue Impact"),
            ],
        },
    ]
}

fn proactive_findings(task_key: &str) -> Option<Vec<Block>> {
    match task_key {
        "retention" => Some(vec![
            Block::paragraph(
                "I have proactively analyzed current churn signals across your customer base.",
            ),
            Block::list(
                "🚨 Key Findings",
                &[
                    "32K customers showing early disengagement signals",
                    "Engagement dropped 45% in last 30 days",
                    "Potential revenue at risk: ₹4.2Cr/month",
                    "Churn probability increased 22% vs last month",
                ],
            ),
            Block::paragraph(
                "I recommend launching a targeted retention program. Would you like me to proceed?",
            ),
            Block::options(vec![
                ChatOption::new("📊", "Review Segments", Reply::Say("Show me the affected segments".into())),
                ChatOption::new("🚀", "Design Program", Reply::Say("Design the retention program".into())),
            ]),
        ]),
        "winback" => Some(vec![
            Block::paragraph("I have proactively identified winback opportunities in your dormant base."),
            Block::list(
                "🔄 Winback Opportunity",
                &[
                    "85K dormant customers in optimal winback window",
                    "Average historical ARPU: ₹380",
                    "Estimated winback success: 28%",
                    "Revenue recovery potential: ₹3.8Cr",
                ],
            ),
            Block::options(vec![
                ChatOption::new("📊", "Review Segments", Reply::Say("Review dormant segments".into())),
                ChatOption::new("🚀", "Design Campaign", Reply::Say("Design winback campaign".into())),
            ]),
        ]),
        _ => None,
    }
}

/// Reasoning recorded for one agent in the side panel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentPanel {
    pub lines: Vec<String>,
    pub expanded: bool,
}

pub struct MarketingSimulator {
    player: Player,
    speed: TypingSpeed,
    phase: PhaseMachine,
    mode: ChatMode,
    task: Option<&'static Task>,
    goal: String,
    priority: Option<String>,
    panels: HashMap<String, AgentPanel>,
}

impl MarketingSimulator {
    pub fn new(player: Player, speed: TypingSpeed) -> Self {
        Self {
            player,
            speed,
            phase: PhaseMachine::new(),
            mode: ChatMode::Reactive,
            task: None,
            goal: String::new(),
            priority: None,
            panels: HashMap::new(),
        }
    }

    pub fn phase(&self) -> ChatPhase {
        self.phase.state()
    }

    pub fn mode(&self) -> ChatMode {
        self.mode
    }

    pub fn task(&self) -> Option<&'static Task> {
        self.task
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    pub fn priority(&self) -> Option<&str> {
        self.priority.as_deref()
    }

    pub fn panel(&self, agent: &str) -> Option<&AgentPanel> {
        self.panels.get(agent)
    }

    fn script(&self) -> Script {
        Script::new(self.speed)
    }

    fn enter(&mut self, phase: ChatPhase) -> WizardResult<()> {
        let before = self.phase.state();
        self.phase.transition(phase)?;
        if before != phase {
            self.player.emit(ChatEvent::PhaseChanged(phase));
        }
        Ok(())
    }

    fn set_mode(&mut self, mode: ChatMode) {
        self.mode = mode;
        self.player.emit(ChatEvent::ModeChanged(mode.label().to_string()));
    }

    async fn reply(&self, typing_ms: u64, blocks: Vec<Block>) {
        let mut s = self.script();
        s.typing().pause_ms(typing_ms).message(blocks);
        self.player.play(&s).await;
    }

    /// Greeting shown when the page opens without a task.
    pub fn welcome(&self) {
        self.player.emit(ChatEvent::AssistantMessage(welcome()));
    }

    /// Open one of the predefined tasks.
    pub async fn start_task(&mut self, key: &str) -> WizardResult<()> {
        let task = find_task(key)
            .ok_or_else(|| WizardError::Validation(format!("Unknown task '{key}'")))?;
        info!(task = task.key, mode = ?task.mode, "Starting chat task");
        self.task = Some(task);
        self.set_mode(task.mode);
        self.enter(ChatPhase::AwaitingGoal)?;

        match task.mode {
            ChatMode::Proactive => self.run_proactive(task).await,
            ChatMode::Reactive => {
                self.player.emit(ChatEvent::AssistantMessage(task.welcome()));
                Ok(())
            }
        }
    }

    /// Open with a free-text goal from the home page.
    pub async fn start_custom(&mut self, query: &str) -> WizardResult<()> {
        self.set_mode(ChatMode::Reactive);
        self.enter(ChatPhase::AwaitingGoal)?;
        self.send(query).await
    }

    /// A message typed by the user. Blank input is ignored.
    pub async fn send(&mut self, text: &str) -> WizardResult<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        self.player.emit(ChatEvent::UserMessage(text.to_string()));
        self.process(text).await
    }

    async fn process(&mut self, text: &str) -> WizardResult<()> {
        match self.phase.state() {
            ChatPhase::Waiting => {
                self.enter(ChatPhase::AwaitingGoal)?;
                self.receive_goal(text).await
            }
            ChatPhase::AwaitingGoal => self.receive_goal(text).await,
            ChatPhase::AwaitingPriority => {
                self.priority = Some(text.to_string());
                self.analyze().await
            }
            ChatPhase::Analyzing => {
                debug!("Input ignored while agents are running");
                Ok(())
            }
            ChatPhase::Complete => {
                self.reply(1500, follow_up()).await;
                Ok(())
            }
        }
    }

    async fn receive_goal(&mut self, text: &str) -> WizardResult<()> {
        self.goal = text.to_string();
        self.enter(ChatPhase::AwaitingPriority)?;
        self.reply(1500, priority_prompt()).await;
        Ok(())
    }

    /// The priority buttons. Only valid while the question is open.
    pub async fn select_priority(&mut self, priority: Priority) -> WizardResult<()> {
        if self.phase.state() != ChatPhase::AwaitingPriority {
            return Err(WizardError::InvalidTransition(format!(
                "priority selected in {:?}",
                self.phase.state()
            )));
        }
        self.player
            .emit(ChatEvent::UserMessage(priority.description().to_string()));
        self.priority = Some(priority.as_str().to_string());
        let mut s = self.script();
        s.pause_ms(500);
        self.player.play(&s).await;
        self.analyze().await
    }

    async fn analyze(&mut self) -> WizardResult<()> {
        self.enter(ChatPhase::Analyzing)?;
        let mut s = self.script();
        s.typing().pause_ms(1200).message(noted()).pause_ms(1500);
        self.player.play(&s).await;
        self.run_orchestration().await;
        self.enter(ChatPhase::Complete)
    }

    async fn run_orchestration(&mut self) {
        let mut s = self.script();
        s.push(Cue::OrchestratorActive);
        for (i, stage) in stages().into_iter().enumerate() {
            if i > 0 {
                s.pause_ms(1500);
            }
            let key = stage.agent.key.clone();
            s.activate(stage.agent).think(&key, stage.reasoning);
            s.pause_ms(500).complete(&key);
            if let Some(blocks) = stage.output {
                s.typing().pause_ms(1000).message(blocks);
            }
            self.panels.insert(
                key,
                AgentPanel {
                    lines: stage.reasoning.iter().map(|l| l.to_string()).collect(),
                    expanded: false,
                },
            );
        }
        s.pause_ms(1500).typing().pause_ms(1500).message(summary());
        s.push(Cue::OrchestratorDone);
        self.player.play(&s).await;
    }

    async fn run_proactive(&mut self, task: &Task) -> WizardResult<()> {
        let mut s = self.script();
        s.push(Cue::OrchestratorActive);
        s.pause_ms(2000).typing().pause_ms(2000);
        if let Some(blocks) = proactive_findings(task.key) {
            s.message(blocks);
        }
        s.push(Cue::OrchestratorDone);
        self.player.play(&s).await;
        self.enter(ChatPhase::Complete)
    }

    fn require_complete(&self, what: &str) -> WizardResult<()> {
        let phase = self.phase.state();
        if phase != ChatPhase::Complete {
            return Err(WizardError::InvalidTransition(format!(
                "{what} requested in {phase:?}"
            )));
        }
        Ok(())
    }

    /// The design / review / refine buttons. Only offered once a run is
    /// complete.
    pub async fn handle_action(&mut self, action: ChatAction) -> WizardResult<()> {
        self.require_complete(&format!("{action:?}"))?;
        match action {
            ChatAction::Design => {
                self.player
                    .emit(ChatEvent::UserMessage("Design the campaign".into()));
                self.reply(1500, canvas()).await;
            }
            ChatAction::Review => {
                self.player
                    .emit(ChatEvent::UserMessage("Show me the campaign details".into()));
                self.reply(1500, blueprint()).await;
            }
            ChatAction::Refine => {
                self.player
                    .emit(ChatEvent::UserMessage("I want to refine the targeting".into()));
                self.reply(1000, refine_options()).await;
            }
        }
        Ok(())
    }

    pub async fn activate_campaign(&mut self) -> WizardResult<()> {
        self.require_complete("Activation")?;
        self.player
            .emit(ChatEvent::UserMessage("Activate the campaign".into()));
        self.reply(2000, activation()).await;
        Ok(())
    }

    /// Expand or collapse an agent's reasoning. `None` until the agent has
    /// run.
    pub fn toggle_reasoning(&mut self, agent: &str) -> Option<bool> {
        let panel = self.panels.get_mut(agent)?;
        if panel.lines.is_empty() {
            return None;
        }
        panel.expanded = !panel.expanded;
        let expanded = panel.expanded;
        self.player.emit(ChatEvent::ReasoningToggled {
            agent: agent.to_string(),
            expanded,
        });
        Some(expanded)
    }

    /// Start over from the welcome message.
    pub fn reset_chat(&mut self) {
        self.phase.reset();
        self.mode = ChatMode::Reactive;
        self.task = None;
        self.goal.clear();
        self.priority = None;
        self.panels.clear();
        self.player.emit(ChatEvent::Reset);
        self.player.emit(ChatEvent::PhaseChanged(ChatPhase::Waiting));
        self.welcome();
    }
}
