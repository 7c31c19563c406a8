use serde::{Deserialize, Serialize};
use std::fmt;

use crate::format::cell_text;

/// The six wizard steps, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Upload,
    Lifecycle,
    Opportunity,
    Offers,
    Forecast,
    #[serde(rename = "reviewlaunch")]
    ReviewLaunch,
}

impl Step {
    pub const ALL: [Step; 6] = [
        Step::Upload,
        Step::Lifecycle,
        Step::Opportunity,
        Step::Offers,
        Step::Forecast,
        Step::ReviewLaunch,
    ];

    /// 1-based position in the wizard.
    pub fn index(self) -> usize {
        match self {
            Step::Upload => 1,
            Step::Lifecycle => 2,
            Step::Opportunity => 3,
            Step::Offers => 4,
            Step::Forecast => 5,
            Step::ReviewLaunch => 6,
        }
    }

    pub fn from_index(index: usize) -> Option<Step> {
        Step::ALL.get(index.checked_sub(1)?).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Step::Upload => "upload",
            Step::Lifecycle => "lifecycle",
            Step::Opportunity => "opportunity",
            Step::Offers => "offers",
            Step::Forecast => "forecast",
            Step::ReviewLaunch => "reviewlaunch",
        }
    }

    pub fn parse(s: &str) -> Option<Step> {
        Step::ALL
            .iter()
            .copied()
            .find(|step| step.as_str().eq_ignore_ascii_case(s.trim()))
    }

    pub fn next(self) -> Option<Step> {
        Step::from_index(self.index() + 1)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque session identifier handed out by the upload call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters followed by an ellipsis, as shown in the
    /// session pill.
    pub fn short(&self) -> String {
        let head: String = self.0.chars().take(8).collect();
        format!("{head}...")
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A preview row: column name to value, in the column order the API sent.
pub type PreviewRow = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableId {
    Lifecycle,
    Opportunity,
    Offers,
}

/// Rendered table: header plus stringified cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableView {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TableView {
    pub const NO_DATA: &'static str = "No data";

    /// Columns are the keys of the first row; later rows missing a column
    /// render an empty cell.
    pub fn from_rows(rows: &[PreviewRow]) -> Self {
        let Some(first) = rows.first() else {
            return Self::default();
        };
        let columns: Vec<String> = first.keys().cloned().collect();
        let rows = rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|c| row.get(c).map(cell_text).unwrap_or_default())
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Every button the wizard enables as steps complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    NextToLifecycle,
    PreviewLifecycle,
    NextToOpportunity,
    PreviewOpportunity,
    NextToOffers,
    PreviewOffers,
    NextToForecast,
    NextToReviewLaunch,
    Download,
    PublishApi,
}

/// A blocking informational dialog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dialog {
    pub title: String,
    pub lines: Vec<String>,
}

impl Dialog {
    pub fn new(title: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            title: title.into(),
            lines,
        }
    }

    pub fn single(title: impl Into<String>, line: impl Into<String>) -> Self {
        Self::new(title, vec![line.into()])
    }
}

/// The "agent is working" overlay shown while a step's request is in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    pub title: String,
    pub subtitle: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiTile {
    pub id: String,
    pub value: String,
    pub badge: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarChart {
    pub id: String,
    pub labels: Vec<String>,
    pub data: Vec<f64>,
}

/// KPI tiles and bar charts drawn from one forecast payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastView {
    pub tiles: Vec<KpiTile>,
    pub charts: Vec<BarChart>,
}

/// One card in the offers configuration grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferCard {
    pub opp_type: String,
    pub icon: String,
    pub count: u8,
}

/// Everything the wizard tells its view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewEvent {
    PaneShown {
        step: Step,
        title: String,
        subtitle: String,
    },
    TrackerUpdated {
        active: Step,
        completed: Vec<Step>,
        progress_pct: f64,
    },
    NavEnabled(Step),
    ControlEnabled(Control),
    OverlayShown(Overlay),
    OverlayHidden,
    Toast(String),
    Modal(Dialog),
    SessionStarted {
        pill: String,
        receipt: serde_json::Value,
    },
    TableRendered {
        table: TableId,
        view: TableView,
    },
    OfferSummary {
        lobs: String,
        opportunities: String,
    },
    OfferConfig(Vec<OfferCard>),
    OfferConfigPlaceholder(String),
    ChartsCleared,
    ForecastRendered(ForecastView),
    ReviewSummary(serde_json::Value),
    PublishSummary(serde_json::Value),
    DownloadOpened(String),
}
