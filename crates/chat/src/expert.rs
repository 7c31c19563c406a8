//! Marketing expert: classify a goal, then walk seven agents through a
//! scripted analysis with intent-specific segments and impact numbers.

use tracing::{debug, info};

use wizard_core::WizardResult;

use crate::blocks::{Block, ChatOption, Metric, Reply, SegmentCard};
use crate::intent::{detect_intent, Intent, IntentKind};
use crate::phase::{ChatPhase, PhaseMachine};
use crate::rng::RangeRng;
use crate::scheduler::{AgentRef, ChatEvent, Cue, Player, Script, TypingSpeed};

const AGENTS: [(&str, &str, &str); 7] = [
    ("intent", "Intent Parser", "🎯"),
    ("planner", "Outcome Planner", "📋"),
    ("discovery", "Segment Discovery", "👥"),
    ("analyzer", "Behavior Analyzer", "🔍"),
    ("strategist", "Strategy Designer", "💡"),
    ("optimizer", "Channel Optimizer", "📡"),
    ("predictor", "Impact Predictor", "🔮"),
];

fn agent(key: &str) -> AgentRef {
    AGENTS
        .iter()
        .find(|(k, _, _)| *k == key)
        .map(|(k, name, icon)| AgentRef::new(k, name, icon))
        .unwrap_or_else(|| AgentRef::new(key, key, "🤖"))
}

const GOAL_ECHO_CHARS: usize = 50;

fn goal_options(arpu_goal: &str, adoption_goal: &str, winback_goal: &str) -> Block {
    Block::options(vec![
        ChatOption::new("📉", "Reduce Churn", Reply::Say("I want to reduce customer churn".into())),
        ChatOption::new("📈", "Increase ARPU", Reply::Say(arpu_goal.into())),
        ChatOption::new("📦", "Drive Adoption", Reply::Say(adoption_goal.into())),
        ChatOption::new("🔄", "Win Back", Reply::Say(winback_goal.into())),
    ])
}

/// Opening message with the four suggested goals.
pub fn greeting() -> Vec<Block> {
    vec![
        Block::paragraph("Hello! I'm your Marketing Expert. Tell me what you want to achieve."),
        goal_options(
            "I want to increase ARPU",
            "I want to drive bundle adoption",
            "I want to win back dormant customers",
        ),
    ]
}

/// Shown when the goal could not be classified.
pub fn clarification() -> Vec<Block> {
    vec![
        Block::paragraph(
            "I want to make sure I understand your goal correctly. What would you like to achieve?",
        ),
        goal_options(
            "I want to increase ARPU through upselling",
            "I want to drive content bundle adoption",
            "I want to reactivate dormant customers",
        ),
    ]
}

/// Three segments matched to the intent. Sizes and behaviors are drawn from
/// `rng`; names, signals, and actions are fixed.
pub fn generate_segments(kind: IntentKind, rng: &mut dyn RangeRng) -> Vec<SegmentCard> {
    let mut r = |min: u32, max: u32| rng.range(min, max);
    let seg = |name: &str, size: String, behavior: String, signal: &str, action: &str, priority: &str| {
        SegmentCard {
            name: name.to_string(),
            size,
            behavior,
            signal: signal.to_string(),
            action: action.to_string(),
            priority: priority.to_string(),
        }
    };
    match kind {
        IntentKind::Churn => vec![
            seg(
                "Silent Disengagers",
                format!("{}K", r(20, 40)),
                format!(
                    "App usage dropped {}% in last {} weeks with no complaints",
                    r(50, 70),
                    r(3, 5)
                ),
                "Quietly withdrawing - high flight risk without intervention",
                "Proactive outreach with personalized retention offer",
                "Critical",
            ),
            seg(
                "Vocal Complainers",
                format!("{}K", r(15, 30)),
                format!(
                    "{} support tickets in {} days, NPS below {}",
                    r(3, 6),
                    r(30, 60),
                    r(3, 5)
                ),
                "Expressing frustration openly - needs immediate service recovery",
                "Service recovery call + compensation + dedicated support",
                "High",
            ),
            seg(
                "Payment Defaulters",
                format!("{}K", r(10, 25)),
                format!("{} consecutive missed/failed payments, reducing usage", r(2, 4)),
                "Financial difficulty causing disengagement",
                "Flexible payment plan + temporary downgrade option",
                "Medium",
            ),
        ],
        IntentKind::Arpu => vec![
            seg(
                "Plan Limit Hitters",
                format!("{}K", r(30, 50)),
                format!("Consistently using {}% of plan quota, buying top-ups", r(85, 98)),
                "Already spending extra - upgrade makes economic sense",
                "Show total current spend vs upgrade cost savings",
                "High",
            ),
            seg(
                "Premium Device Owners",
                format!("{}K", r(20, 35)),
                format!(
                    "Device worth ₹{}K+ but on basic ₹{} plan",
                    r(25, 50),
                    r(199, 299)
                ),
                "Can afford more, device capabilities underutilized",
                "Premium plan trial with exclusive features",
                "High",
            ),
            seg(
                "Loyal Mid-Tier",
                format!("{}K", r(25, 45)),
                format!("{} months tenure, steady usage, mid-tier plan", r(18, 36)),
                "Loyal and stable - ready for loyalty-based upgrade",
                "Tenure reward + exclusive upgrade discount",
                "Medium",
            ),
        ],
        IntentKind::Adoption => vec![
            seg(
                "Content Streamers",
                format!("{}K", r(35, 55)),
                format!(
                    "Using {}GB monthly on YouTube/Netflix, no bundle subscription",
                    r(8, 15)
                ),
                "Already consuming content - bundle is natural fit",
                "Show value: current data cost vs all-inclusive bundle",
                "High",
            ),
            seg(
                "Weekend Bingers",
                format!("{}K", r(25, 40)),
                format!("{}% of data used on weekends for entertainment", r(60, 80)),
                "Clear leisure pattern - entertainment bundle resonates",
                "Weekend unlimited streaming offer",
                "High",
            ),
            seg(
                "Multi-Device Families",
                format!("{}K", r(20, 35)),
                format!("{} devices connected, shared usage patterns", r(3, 5)),
                "Family household needs family bundle",
                "Family pack with individual profiles",
                "Medium",
            ),
        ],
        IntentKind::Usage => vec![
            seg(
                "Sleeping Subscribers",
                format!("{}K", r(40, 70)),
                format!(
                    "Using only {}% of paid plan, {} logins/week",
                    r(15, 30),
                    r(1, 3)
                ),
                "Paying but not using - churn risk if not engaged",
                "Gamified usage challenge with rewards",
                "High",
            ),
            seg(
                "Feature Blind",
                format!("{}K", r(30, 50)),
                format!("Never accessed {}% of available features", r(60, 80)),
                "Don't know what they're missing",
                "Guided feature discovery tutorial",
                "High",
            ),
            seg(
                "Single-Use Customers",
                format!("{}K", r(25, 40)),
                format!("{}% usage on one feature only", r(80, 95)),
                "Narrow engagement - expand use cases",
                "Cross-feature recommendations based on behavior",
                "Medium",
            ),
        ],
        IntentKind::Winback => vec![
            seg(
                "Recent Churners",
                format!("{}K", r(15, 30)),
                format!("Left {} days ago after {}+ months", r(30, 60), r(12, 24)),
                "Fresh exit, emotional connection still exists",
                "Personal \"we miss you\" + comeback offer",
                "Critical",
            ),
            seg(
                "Competitor Switchers",
                format!("{}K", r(10, 25)),
                format!("Ported to competitor, now paying {}% more", r(10, 30)),
                "Grass wasn't greener - value comparison works",
                "Side-by-side comparison + switch-back bonus",
                "High",
            ),
            seg(
                "Seasonal Pausers",
                format!("{}K", r(8, 20)),
                "Usage dropped after specific life event/season".to_string(),
                "Temporary pause, not permanent exit intent",
                "Flexible reconnection with welcome-back credits",
                "Medium",
            ),
        ],
    }
}

/// Predicted outcome of the campaign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Impact {
    pub metrics: Vec<Metric>,
    pub confidence: u32,
}

pub fn generate_impact(kind: IntentKind, rng: &mut dyn RangeRng) -> Impact {
    let mut r = |min: u32, max: u32| rng.range(min, max);
    let (metrics, confidence) = match kind {
        IntentKind::Churn => (
            vec![
                Metric::new("📉", format!("-{}%", r(15, 25)), "Churn Reduction"),
                Metric::new("🛡️", format!("{}K", r(20, 40)), "Customers Saved"),
                Metric::new("💰", format!("₹{}Cr", r(3, 8)), "Revenue Protected"),
            ],
            r(82, 92),
        ),
        IntentKind::Arpu => (
            vec![
                Metric::new("📈", format!("+₹{}", r(45, 85)), "ARPU Uplift"),
                Metric::new("⬆️", format!("{}%", r(12, 22)), "Upgrade Rate"),
                Metric::new("💰", format!("₹{}Cr", r(4, 10)), "Revenue Gain"),
            ],
            r(78, 88),
        ),
        IntentKind::Adoption => (
            vec![
                Metric::new("📦", format!("+{}%", r(20, 35)), "Adoption Rate"),
                Metric::new("👥", format!("{}K", r(30, 60)), "New Subscribers"),
                Metric::new("💰", format!("₹{}Cr", r(2, 6)), "Bundle Revenue"),
            ],
            r(80, 90),
        ),
        IntentKind::Usage => (
            vec![
                Metric::new("📊", format!("+{}%", r(30, 50)), "Usage Increase"),
                Metric::new("📱", format!("+{}K", r(35, 60)), "Active Users"),
                Metric::new("🎯", format!("+{}", r(20, 35)), "Engagement Score"),
            ],
            r(75, 85),
        ),
        IntentKind::Winback => (
            vec![
                Metric::new("🔄", format!("{}%", r(25, 40)), "Win-back Rate"),
                Metric::new("🏆", format!("{}K", r(15, 30)), "Customers Returned"),
                Metric::new("💰", format!("₹{}Cr", r(2, 5)), "Recovered Revenue"),
            ],
            r(72, 82),
        ),
    };
    Impact {
        metrics,
        confidence,
    }
}

fn discovery_thinking(kind: IntentKind) -> [&'static str; 4] {
    match kind {
        IntentKind::Churn => [
            "Scanning for disengagement patterns in the base...",
            "Identifying customers with declining activity...",
            "Correlating complaint history with churn risk...",
            "Segmenting by risk level and value...",
        ],
        IntentKind::Arpu => [
            "Finding customers with upgrade potential...",
            "Analyzing usage vs plan capacity...",
            "Identifying willingness-to-pay signals...",
            "Segmenting by value headroom...",
        ],
        IntentKind::Adoption => [
            "Scanning for product affinity signals...",
            "Identifying consumption patterns matching bundles...",
            "Finding non-subscribers with high fit scores...",
            "Segmenting by adoption probability...",
        ],
        IntentKind::Usage => [
            "Profiling low-engagement customers...",
            "Identifying usage barriers and gaps...",
            "Finding feature discovery opportunities...",
            "Segmenting by activation potential...",
        ],
        IntentKind::Winback => [
            "Analyzing churned customer profiles...",
            "Identifying win-back opportunity windows...",
            "Finding customers with reactivation potential...",
            "Segmenting by recency and value...",
        ],
    }
}

fn echo_goal(text: &str) -> String {
    let head: String = text.chars().take(GOAL_ECHO_CHARS).collect();
    if text.chars().count() > GOAL_ECHO_CHARS {
        format!("{head}...")
    } else {
        head
    }
}

/// Each typed group replaces the previous one in the reasoning log.
fn think(script: &mut Script, key: &str, lines: &[&str]) {
    script.clear_reasoning().think(key, lines);
}

/// The full analysis run for an understood goal.
pub fn analysis_script(
    goal: &str,
    intent: &Intent,
    scope_k: u32,
    segments: &[SegmentCard],
    impact: &Impact,
    speed: TypingSpeed,
) -> Script {
    let mut s = Script::new(speed);

    s.activate(agent("intent"));
    let analyzing = format!("Analyzing: \"{}\"", echo_goal(goal));
    let detected = format!("Detected objective: {}", intent.label.to_uppercase());
    let about = format!("This is about: {}", intent.objective);
    think(&mut s, "intent", &[analyzing.as_str(), detected.as_str(), about.as_str()]);
    s.pause_ms(800);

    s.activate(agent("planner"));
    let framework = format!(
        "Setting up analysis framework for {} optimization...",
        intent.kind.as_str()
    );
    let metric = format!("Defining success metrics: {}", intent.metric);
    think(
        &mut s,
        "planner",
        &[
            framework.as_str(),
            metric.as_str(),
            "Preparing data queries for subscriber base...",
        ],
    );
    s.typing().pause_ms(1200);
    s.message(vec![
        Block::heading("Analysis Framework:"),
        Block::KeyValues {
            rows: vec![
                ("Objective".into(), intent.label.into()),
                ("Goal".into(), intent.objective.into()),
                ("Data Scope".into(), format!("{scope_k}K subscribers analyzed")),
                ("Success Metric".into(), intent.metric.into()),
            ],
        },
        Block::paragraph("Now discovering target segments..."),
    ]);
    s.pause_ms(1000);

    s.activate(agent("discovery"));
    think(&mut s, "discovery", &discovery_thinking(intent.kind));

    s.activate(agent("analyzer"));
    let found = format!("Found {} high-opportunity segments", segments.len());
    think(
        &mut s,
        "analyzer",
        &[
            found.as_str(),
            "Calculating propensity scores...",
            "Ranking by priority and impact...",
        ],
    );
    for (i, card) in segments.iter().enumerate() {
        s.typing().pause_ms(1000);
        s.message(vec![Block::Segment {
            index: i + 1,
            card: card.clone(),
        }]);
        if i + 1 < segments.len() {
            s.pause_ms(500);
        }
    }
    s.pause_ms(800);

    s.activate(agent("strategist"));
    think(
        &mut s,
        "strategist",
        &[
            "Designing intervention strategy per segment...",
            "Matching offers to segment characteristics...",
            "Optimizing messaging for each group...",
        ],
    );
    s.typing().pause_ms(1000);
    s.message(vec![
        Block::heading("Strategy Summary:"),
        Block::Table {
            headers: vec!["#".into(), "Segment".into(), "Action".into()],
            rows: segments
                .iter()
                .enumerate()
                .map(|(i, c)| vec![(i + 1).to_string(), c.name.clone(), c.action.clone()])
                .collect(),
        },
    ]);
    s.pause_ms(800);

    s.activate(agent("optimizer"));
    think(
        &mut s,
        "optimizer",
        &[
            "Analyzing channel preferences...",
            "Optimizing contact timing...",
            "Setting frequency caps...",
        ],
    );
    s.typing().pause_ms(1000);
    s.message(vec![
        Block::heading("Channel Strategy:"),
        Block::table(
            &["Channel", "When"],
            &[
                &["📱 In-App", "During active sessions"],
                &["💬 WhatsApp", "Evening 7-9 PM"],
                &["📧 Email", "Morning 9-11 AM"],
            ],
        ),
    ]);
    s.pause_ms(800);

    s.activate(agent("predictor"));
    think(
        &mut s,
        "predictor",
        &[
            "Running prediction models...",
            "Calculating expected impact...",
            "Validating against benchmarks...",
        ],
    );
    s.typing().pause_ms(1200);
    s.message(vec![
        Block::heading("Predicted Impact:"),
        Block::Metrics {
            items: impact.metrics.clone(),
        },
        Block::Confidence {
            pct: impact.confidence,
        },
        Block::paragraph("Campaign is ready. What would you like to do?"),
        Block::options(vec![
            ChatOption::new("🚀", "Deploy Campaign", Reply::Say("Deploy this campaign".into())),
            ChatOption::new(
                "📊",
                "Segment Details",
                Reply::Say("Show me more details about segment 1".into()),
            ),
            ChatOption::new("🎯", "Refine", Reply::Say("I want to refine the strategy".into())),
        ]),
    ]);
    s.push(Cue::OrchestratorDone);
    s
}

/// Conversation memory of the expert.
#[derive(Debug, Clone, Default)]
pub struct ExpertState {
    pub intent: Option<Intent>,
    pub goal: String,
    pub segments: Vec<SegmentCard>,
}

pub struct ExpertSimulator<R: RangeRng> {
    player: Player,
    rng: R,
    speed: TypingSpeed,
    phase: PhaseMachine,
    state: ExpertState,
}

impl<R: RangeRng> ExpertSimulator<R> {
    pub fn new(player: Player, rng: R, speed: TypingSpeed) -> Self {
        Self {
            player,
            rng,
            speed,
            phase: PhaseMachine::new(),
            state: ExpertState::default(),
        }
    }

    pub fn phase(&self) -> ChatPhase {
        self.phase.state()
    }

    pub fn state(&self) -> &ExpertState {
        &self.state
    }

    fn enter(&mut self, phase: ChatPhase) -> WizardResult<()> {
        let before = self.phase.state();
        self.phase.transition(phase)?;
        if before != phase {
            self.player.emit(ChatEvent::PhaseChanged(phase));
        }
        Ok(())
    }

    /// Clear everything and show the greeting.
    pub fn reset_conversation(&mut self) {
        self.state = ExpertState::default();
        self.phase.reset();
        self.player.emit(ChatEvent::Reset);
        self.player.emit(ChatEvent::PhaseChanged(ChatPhase::Waiting));
        self.player.emit(ChatEvent::AssistantMessage(greeting()));
    }

    /// A message typed by the user or picked from a suggestion. Blank input
    /// is ignored.
    pub async fn send(&mut self, text: &str) -> WizardResult<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        self.player.emit(ChatEvent::UserMessage(text.to_string()));
        self.state.goal = text.to_string();

        let Some(intent) = detect_intent(text) else {
            debug!(goal = %text, "Goal not understood, asking for clarification");
            if self.phase.state() != ChatPhase::AwaitingGoal {
                self.enter(ChatPhase::AwaitingGoal)?;
            }
            let mut s = Script::new(self.speed);
            s.typing().pause_ms(1000).message(clarification());
            self.player.play(&s).await;
            return Ok(());
        };

        info!(intent = intent.kind.as_str(), "Running expert analysis");
        self.enter(ChatPhase::Analyzing)?;
        self.state.intent = Some(intent);

        let scope_k = self.rng.range(500, 900);
        self.state.segments = generate_segments(intent.kind, &mut self.rng);
        let impact = generate_impact(intent.kind, &mut self.rng);
        let script = analysis_script(
            text,
            &intent,
            scope_k,
            &self.state.segments,
            &impact,
            self.speed,
        );
        self.player.play(&script).await;

        self.enter(ChatPhase::Complete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::SeededRng;
    use crate::scheduler::VirtualClock;
    use std::sync::Arc;
    use wizard_core::event_bus::{capture_sink, CaptureSink};

    /// Always returns the lower bound.
    struct LowRng;

    impl RangeRng for LowRng {
        fn range(&mut self, min: u32, _max: u32) -> u32 {
            min
        }
    }

    fn simulator<R: RangeRng>(rng: R) -> (ExpertSimulator<R>, Arc<CaptureSink<ChatEvent>>) {
        let sink = capture_sink::<ChatEvent>();
        let player = Player::new(Arc::new(VirtualClock::new()), sink.clone());
        (
            ExpertSimulator::new(player, rng, TypingSpeed::from_millis(12, 300)),
            sink,
        )
    }

    fn messages(sink: &CaptureSink<ChatEvent>) -> Vec<Vec<Block>> {
        sink.events()
            .into_iter()
            .filter_map(|e| match e {
                ChatEvent::AssistantMessage(b) => Some(b),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_segments_use_range_bounds() {
        let segs = generate_segments(IntentKind::Churn, &mut LowRng);
        assert_eq!(segs.len(), 3);
        assert_eq!(segs[0].size, "20K");
        assert_eq!(
            segs[0].behavior,
            "App usage dropped 50% in last 3 weeks with no complaints"
        );
        assert_eq!(segs[1].behavior, "3 support tickets in 30 days, NPS below 3");
        assert_eq!(segs[2].priority, "Medium");

        let segs = generate_segments(IntentKind::Arpu, &mut LowRng);
        assert_eq!(segs[1].behavior, "Device worth ₹25K+ but on basic ₹199 plan");
    }

    #[test]
    fn test_seeded_segments_stay_in_range() {
        let mut rng = SeededRng::from_seed(3);
        for _ in 0..50 {
            let segs = generate_segments(IntentKind::Winback, &mut rng);
            let size: u32 = segs[0].size.trim_end_matches('K').parse().unwrap();
            assert!((15..=30).contains(&size));
            let impact = generate_impact(IntentKind::Winback, &mut rng);
            assert!((72..=82).contains(&impact.confidence));
        }
    }

    #[test]
    fn test_impact_per_intent() {
        let impact = generate_impact(IntentKind::Usage, &mut LowRng);
        assert_eq!(impact.metrics[0].value, "+30%");
        assert_eq!(impact.metrics[2].label, "Engagement Score");
        assert_eq!(impact.confidence, 75);
    }

    #[test]
    fn test_goal_echo_truncates() {
        assert_eq!(echo_goal("short"), "short");
        let long = "x".repeat(60);
        assert_eq!(echo_goal(&long), format!("{}...", "x".repeat(50)));
    }

    #[test]
    fn test_script_structure() {
        let intent = detect_intent("reduce churn").unwrap();
        let segs = generate_segments(intent.kind, &mut LowRng);
        let impact = generate_impact(intent.kind, &mut LowRng);
        let script = analysis_script(
            "reduce churn",
            &intent,
            500,
            &segs,
            &impact,
            TypingSpeed::from_millis(12, 300),
        );
        // framework, three segments, strategy, channels, impact
        assert_eq!(script.messages().count(), 7);
        let activations = script
            .cues()
            .iter()
            .filter(|c| matches!(c, Cue::Activate(_)))
            .count();
        assert_eq!(activations, 7);
        assert!(script.duration() > std::time::Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_unmatched_goal_asks_for_clarification() {
        let (mut sim, sink) = simulator(LowRng);
        sim.send("hello there").await.unwrap();
        assert_eq!(sim.phase(), ChatPhase::AwaitingGoal);
        assert_eq!(messages(&sink), vec![clarification()]);

        sim.send("   ").await.unwrap();
        assert_eq!(messages(&sink).len(), 1);
    }

    #[tokio::test]
    async fn test_full_run_completes() {
        let (mut sim, sink) = simulator(LowRng);
        sim.reset_conversation();
        sim.send("I want to win back dormant customers").await.unwrap();

        assert_eq!(sim.phase(), ChatPhase::Complete);
        assert_eq!(sim.state().segments[0].name, "Recent Churners");
        let msgs = messages(&sink);
        assert_eq!(msgs[0], greeting());
        assert_eq!(msgs.len(), 8);
        assert!(matches!(
            msgs.last().unwrap()[2],
            Block::Confidence { pct: 72 }
        ));
        assert!(sink
            .events()
            .contains(&ChatEvent::PhaseChanged(ChatPhase::Complete)));

        // a second goal after completion runs again
        sim.send("now increase ARPU").await.unwrap();
        assert_eq!(sim.state().intent.unwrap().kind, IntentKind::Arpu);
        assert_eq!(sim.phase(), ChatPhase::Complete);
    }

    #[tokio::test]
    async fn test_clarification_after_completion() {
        let (mut sim, _sink) = simulator(LowRng);
        sim.send("reduce churn").await.unwrap();
        sim.send("Deploy this campaign").await.unwrap();
        assert_eq!(sim.phase(), ChatPhase::AwaitingGoal);
        sim.reset_conversation();
        assert_eq!(sim.phase(), ChatPhase::Waiting);
        assert!(sim.state().intent.is_none());
    }
}
