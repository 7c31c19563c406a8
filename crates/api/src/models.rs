//! Request and response shapes of the campaign REST API.
//!
//! Responses are decoded leniently: optional fields default, unknown fields
//! are kept in `extra` so receipts can be echoed back verbatim.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use wizard_core::types::{PreviewRow, SessionId};

/// Server-side steps reachable through `POST /api/run_step` and
/// `GET /api/preview`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Lifecycle,
    Opportunity,
    Offers,
    Launch,
}

impl StepKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StepKind::Lifecycle => "lifecycle",
            StepKind::Opportunity => "opportunity",
            StepKind::Offers => "offers",
            StepKind::Launch => "launch",
        }
    }

    pub fn parse(s: &str) -> Option<StepKind> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lifecycle" => Some(StepKind::Lifecycle),
            "opportunity" => Some(StepKind::Opportunity),
            "offers" => Some(StepKind::Offers),
            "launch" => Some(StepKind::Launch),
            _ => None,
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub session_id: SessionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cols: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Step-specific fields sent alongside `session_id` and `step`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lobs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opportunity_types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer_counts_per_opp: Option<Map<String, Value>>,
}

/// Wire body of `POST /api/run_step`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRequest {
    pub session_id: String,
    pub step: String,
    #[serde(flatten)]
    pub payload: StepPayload,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepAck {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub step: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `GET /api/preview/{session_id}`. `rows` is `None` when the server sent
/// no `rows` field at all, which the offers preview reports differently
/// from an empty list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreviewPage {
    #[serde(default)]
    pub step: Option<String>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Option<Vec<PreviewRow>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForecastKpis {
    #[serde(default)]
    pub revenue_total_m: Value,
    #[serde(default)]
    pub margin_total_m: Value,
    #[serde(default)]
    pub churn_avg_pct: Value,
    #[serde(default)]
    pub rev_uplift_pct: Value,
    #[serde(default)]
    pub margin_uplift_pct: Value,
    #[serde(default)]
    pub churn_reduction_pct: Value,
}

/// Six-month series; anything that isn't a list decodes as empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForecastSeries {
    #[serde(default, deserialize_with = "lenient_list")]
    pub months6: Vec<Value>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub revenue6_m: Vec<Value>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub margin6_m: Vec<Value>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub churn6_pct: Vec<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForecastPayload {
    #[serde(default)]
    pub kpis: Option<ForecastKpis>,
    #[serde(default)]
    pub series: Option<ForecastSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishRequest {
    pub target: String,
    pub mode: String,
    pub endpoint_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishReceipt {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub reference_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// FastAPI-style error body.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub detail: Value,
}

fn lenient_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Value>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Array(items) => items,
        _ => Vec::new(),
    })
}

fn lenient_strings<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    Ok(lenient_list(d)?
        .into_iter()
        .map(|v| wizard_core::format::cell_text(&v))
        .collect())
}
