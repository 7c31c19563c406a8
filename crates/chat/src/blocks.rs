//! Typed chat message content and its plain-text rendering.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// What a suggestion button does when chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Reply {
    /// Send the text as if the user typed it.
    Say(String),
    /// A named follow-up action (`design`, `review`, `refine`).
    Action(String),
    /// Answer the priority question.
    Priority(String),
    /// Launch the designed campaign.
    Activate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatOption {
    pub icon: String,
    pub label: String,
    pub reply: Reply,
}

impl ChatOption {
    pub fn new(icon: &str, label: &str, reply: Reply) -> Self {
        Self {
            icon: icon.to_string(),
            label: label.to_string(),
            reply,
        }
    }
}

/// A discovered audience segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentCard {
    pub name: String,
    pub size: String,
    pub behavior: String,
    pub signal: String,
    pub action: String,
    pub priority: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    pub icon: String,
    pub value: String,
    pub label: String,
}

impl Metric {
    pub fn new(icon: &str, value: impl Into<String>, label: &str) -> Self {
        Self {
            icon: icon.to_string(),
            value: value.into(),
            label: label.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Block {
    Paragraph { text: String },
    Heading { text: String },
    KeyValues { rows: Vec<(String, String)> },
    Table { headers: Vec<String>, rows: Vec<Vec<String>> },
    Segment { index: usize, card: SegmentCard },
    Metrics { items: Vec<Metric> },
    Confidence { pct: u32 },
    List { title: String, items: Vec<String> },
    Quote { text: String },
    Options { options: Vec<ChatOption> },
}

impl Block {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Block::Paragraph { text: text.into() }
    }

    pub fn heading(text: impl Into<String>) -> Self {
        Block::Heading { text: text.into() }
    }

    pub fn table(headers: &[&str], rows: &[&[&str]]) -> Self {
        Block::Table {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    pub fn list(title: &str, items: &[&str]) -> Self {
        Block::List {
            title: title.to_string(),
            items: items.iter().map(|i| i.to_string()).collect(),
        }
    }

    pub fn options(options: Vec<ChatOption>) -> Self {
        Block::Options { options }
    }
}

/// Every reply offered by the option blocks in `blocks`.
pub fn replies(blocks: &[Block]) -> Vec<&Reply> {
    blocks
        .iter()
        .filter_map(|b| match b {
            Block::Options { options } => Some(options.iter().map(|o| &o.reply)),
            _ => None,
        })
        .flatten()
        .collect()
}

const CONFIDENCE_WIDTH: usize = 20;

fn width(s: &str) -> usize {
    s.chars().count()
}

fn pad(s: &str, w: usize) -> String {
    let mut out = s.to_string();
    out.extend(std::iter::repeat(' ').take(w.saturating_sub(width(s))));
    out
}

fn render_table(out: &mut String, headers: &[String], rows: &[Vec<String>]) {
    let cols = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| width(h)).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(cols) {
            widths[i] = widths[i].max(width(cell));
        }
    }
    let line = |cells: &[String]| {
        let padded: Vec<String> = (0..cols)
            .map(|i| pad(cells.get(i).map(String::as_str).unwrap_or(""), widths[i]))
            .collect();
        format!("  {}", padded.join(" | ").trim_end())
    };
    let _ = writeln!(out, "{}", line(headers));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "  {}", rule.join("-+-"));
    for row in rows {
        let _ = writeln!(out, "{}", line(row));
    }
}

/// Terminal rendering of one message.
pub fn render_text(blocks: &[Block]) -> String {
    let mut out = String::new();
    for block in blocks {
        match block {
            Block::Paragraph { text } => {
                let _ = writeln!(out, "{text}");
            }
            Block::Heading { text } => {
                let _ = writeln!(out, "{text}\n{}", "=".repeat(width(text)));
            }
            Block::KeyValues { rows } => {
                let w = rows.iter().map(|(k, _)| width(k)).max().unwrap_or(0);
                for (k, v) in rows {
                    let _ = writeln!(out, "  {}  {v}", pad(k, w));
                }
            }
            Block::Table { headers, rows } => render_table(&mut out, headers, rows),
            Block::Segment { index, card } => {
                let _ = writeln!(
                    out,
                    "[{index}] {} ({}) · {}",
                    card.name, card.size, card.priority
                );
                let _ = writeln!(out, "    Behavior: {}", card.behavior);
                let _ = writeln!(out, "    Signal: {}", card.signal);
                let _ = writeln!(out, "    Recommended Action: {}", card.action);
            }
            Block::Metrics { items } => {
                for m in items {
                    let _ = writeln!(out, "  {} {}  {}", m.icon, m.value, m.label);
                }
            }
            Block::Confidence { pct } => {
                let filled = (*pct as usize).min(100) * CONFIDENCE_WIDTH / 100;
                let _ = writeln!(
                    out,
                    "Confidence: {pct}% [{}{}]",
                    "#".repeat(filled),
                    "-".repeat(CONFIDENCE_WIDTH - filled)
                );
            }
            Block::List { title, items } => {
                let _ = writeln!(out, "{title}");
                for item in items {
                    let _ = writeln!(out, "  • {item}");
                }
            }
            Block::Quote { text } => {
                let _ = writeln!(out, "  \"{text}\"");
            }
            Block::Options { options } => {
                let labels: Vec<String> = options
                    .iter()
                    .map(|o| format!("[{} {}]", o.icon, o.label))
                    .collect();
                let _ = writeln!(out, "  {}", labels.join("  "));
            }
        }
    }
    out
}
