//! Terminal views: print wizard and chat events to stdout.

use std::io::Write;

use wizard_chat::{render_text, Block, ChatEvent};
use wizard_core::types::{ForecastView, TableView, ViewEvent};
use wizard_core::EventSink;

fn table_text(view: &TableView) -> String {
    if view.is_empty() {
        return format!("  {}\n", TableView::NO_DATA);
    }
    render_text(&[Block::Table {
        headers: view.columns.clone(),
        rows: view.rows.clone(),
    }])
}

fn forecast_text(view: &ForecastView) -> String {
    let mut out = String::new();
    for tile in &view.tiles {
        out.push_str(&format!("  {}: {} ({})\n", tile.id, tile.value, tile.badge));
    }
    for chart in &view.charts {
        let bars: Vec<String> = chart
            .labels
            .iter()
            .zip(&chart.data)
            .map(|(l, v)| format!("{l}={v:.2}"))
            .collect();
        out.push_str(&format!("  {}: {}\n", chart.id, bars.join(" ")));
    }
    out
}

/// Text for one wizard event, or `None` for events with nothing to show.
pub fn describe_view(event: &ViewEvent) -> Option<String> {
    let text = match event {
        ViewEvent::PaneShown {
            step,
            title,
            subtitle,
        } => format!("\n== Step {}: {title} ==\n{subtitle}", step.index()),
        ViewEvent::TrackerUpdated { progress_pct, .. } => {
            format!("Progress {progress_pct:.0}%")
        }
        ViewEvent::NavEnabled(_)
        | ViewEvent::ControlEnabled(_)
        | ViewEvent::OverlayHidden
        | ViewEvent::ChartsCleared => return None,
        ViewEvent::OverlayShown(o) => format!("{} {} {}", o.icon, o.title, o.subtitle),
        ViewEvent::Toast(text) => format!("» {text}"),
        ViewEvent::Modal(dialog) => {
            let mut out = format!("[{}]", dialog.title);
            for line in &dialog.lines {
                out.push_str("\n  ");
                out.push_str(line);
            }
            out
        }
        ViewEvent::SessionStarted { pill, .. } => format!("Session {pill}"),
        ViewEvent::TableRendered { table, view } => {
            format!("{table:?} preview\n{}", table_text(view).trim_end())
        }
        ViewEvent::OfferSummary {
            lobs,
            opportunities,
        } => format!("LOBs: {lobs} | Opportunities: {opportunities}"),
        ViewEvent::OfferConfig(cards) => {
            let cells: Vec<String> = cards
                .iter()
                .map(|c| format!("{} {} x{}", c.icon, c.opp_type, c.count))
                .collect();
            format!("Offers per opportunity: {}", cells.join(", "))
        }
        ViewEvent::OfferConfigPlaceholder(text) => text.clone(),
        ViewEvent::ForecastRendered(view) => {
            format!("Forecast\n{}", forecast_text(view).trim_end())
        }
        ViewEvent::ReviewSummary(v) | ViewEvent::PublishSummary(v) => {
            serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string())
        }
        ViewEvent::DownloadOpened(url) => format!("Download: {url}"),
    };
    Some(text)
}

/// Prints wizard events as they arrive.
pub struct WizardView;

impl EventSink<ViewEvent> for WizardView {
    fn emit(&self, event: ViewEvent) {
        if let Some(text) = describe_view(&event) {
            println!("{text}");
        }
    }
}

/// Text for one chat event. Typed reasoning characters are handled by the
/// view itself so they can be flushed one at a time.
pub fn describe_chat(event: &ChatEvent) -> Option<String> {
    let text = match event {
        ChatEvent::UserMessage(text) => format!("\n> {text}"),
        ChatEvent::AssistantMessage(blocks) => format!("\n{}", render_text(blocks).trim_end()),
        ChatEvent::AgentActivated(agent) => format!("▶ {} {}", agent.icon, agent.name),
        ChatEvent::AgentCompleted(key) => format!("✓ {key}"),
        ChatEvent::ReasoningToggled { agent, expanded } => format!(
            "{agent} reasoning {}",
            if *expanded { "expanded" } else { "collapsed" }
        ),
        ChatEvent::ModeChanged(mode) => format!("[{mode}]"),
        ChatEvent::Reset => "\n--- new conversation ---".to_string(),
        ChatEvent::Typing
        | ChatEvent::ReasoningCleared
        | ChatEvent::ReasoningChar(_)
        | ChatEvent::ReasoningLineStarted { .. }
        | ChatEvent::ReasoningLineFinished { .. }
        | ChatEvent::OrchestratorActive
        | ChatEvent::OrchestratorDone
        | ChatEvent::PhaseChanged(_) => return None,
    };
    Some(text)
}

/// Prints chat events, typing reasoning lines out character by character.
pub struct ChatView;

impl EventSink<ChatEvent> for ChatView {
    fn emit(&self, event: ChatEvent) {
        let mut out = std::io::stdout().lock();
        let _ = match &event {
            ChatEvent::ReasoningLineStarted { sub, .. } => {
                write!(out, "{}", if *sub { "      " } else { "    " })
            }
            ChatEvent::ReasoningChar(c) => write!(out, "{c}"),
            ChatEvent::ReasoningLineFinished { .. } => writeln!(out),
            ChatEvent::PhaseChanged(phase) => {
                tracing::debug!(phase = ?phase, "Chat phase changed");
                Ok(())
            }
            other => match describe_chat(other) {
                Some(text) => writeln!(out, "{text}"),
                None => Ok(()),
            },
        };
        let _ = out.flush();
    }
}
