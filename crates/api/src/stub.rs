//! In-process demo backend serving the campaign REST API.
//!
//! Derives lifecycle stages, opportunities, offers, and a six-month forecast
//! deterministically from the uploaded subscriber CSV. Used by the
//! `stub-server` subcommand for offline demos and by the integration tests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Datelike, Local};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use wizard_core::format::cell_text;
use wizard_core::types::PreviewRow;
use wizard_core::WizardResult;

use crate::models::{PublishRequest, StepRequest};

const SESSION_NOT_FOUND: &str = "Session not found. Please upload again.";
const DEFAULT_LOBS: [&str; 3] = ["DATA", "VOICE", "VAS"];
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone)]
struct Subscriber {
    msisdn: String,
    tenure_months: f64,
    arpu: f64,
    data_mb_30d: f64,
    voice_min_30d: f64,
    churn_risk: f64,
    vas_spend_30d: f64,
}

#[derive(Debug, Clone, Default)]
struct Table {
    columns: Vec<String>,
    rows: Vec<PreviewRow>,
}

#[derive(Debug, Default)]
struct StubSession {
    subscribers: Vec<Subscriber>,
    raw_rows: usize,
    steps: Vec<(String, Table)>,
    lobs: Vec<String>,
    types: Vec<String>,
    launched: bool,
}

impl StubSession {
    fn table(&self, step: &str) -> Option<&Table> {
        self.steps.iter().find(|(s, _)| s == step).map(|(_, t)| t)
    }

    fn store(&mut self, step: &str, table: Table) {
        match self.steps.iter_mut().find(|(s, _)| s == step) {
            Some(slot) => slot.1 = table,
            None => self.steps.push((step.to_string(), table)),
        }
    }
}

/// Shared state of the demo backend.
#[derive(Clone, Default)]
pub struct StubState {
    sessions: Arc<RwLock<HashMap<String, StubSession>>>,
}

/// Error body in the `{detail}` shape clients parse.
struct StubError(StatusCode, String);

impl StubError {
    fn bad_request(detail: impl Into<String>) -> Self {
        Self(StatusCode::BAD_REQUEST, detail.into())
    }

    fn not_found() -> Self {
        Self(StatusCode::NOT_FOUND, SESSION_NOT_FOUND.to_string())
    }
}

impl IntoResponse for StubError {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "detail": self.1 }))).into_response()
    }
}

type StubResult<T> = Result<T, StubError>;

/// Routes of the demo backend.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/upload", post(upload))
        .route("/api/run_step", post(run_step))
        .route("/api/preview/:session_id", get(preview))
        .route("/api/download/:session_id", get(download))
        .route("/api/impact_forecast", get(impact_forecast))
        .route("/api/publish", post(publish))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(StubState::default())
}

/// Handle to a stub bound in the background.
pub struct StubServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl StubServer {
    /// Bind `addr` (port 0 for an ephemeral port) and serve in a background task.
    pub async fn spawn(addr: SocketAddr) -> WizardResult<Self> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router()).await {
                warn!(error = %e, "Stub server stopped");
            }
        });
        info!(addr = %addr, "Stub server listening");
        Ok(Self { addr, handle })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Serve the demo backend on `addr` until the process exits.
pub async fn serve(addr: SocketAddr) -> WizardResult<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "Starting demo backend");
    axum::serve(listener, router()).await?;
    Ok(())
}

fn now() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// FNV-1a over the `|`-joined parts, mapped into `[0, 1)`.
fn hash01(parts: &[&str]) -> f64 {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            h ^= u64::from(b'|');
            h = h.wrapping_mul(0x0100_0000_01b3);
        }
        for b in part.bytes() {
            h ^= u64::from(b);
            h = h.wrapping_mul(0x0100_0000_01b3);
        }
    }
    (h % 10_000_000) as f64 / 10_000_000.0
}

fn seed_of(key: &str) -> u64 {
    (hash01(&[key]) * 10_000_000.0) as u64
}

fn round_to(v: f64, digits: i32) -> f64 {
    let p = 10f64.powi(digits);
    (v * p).round() / p
}

/// Box-Muller sample with mean zero.
fn noise(rng: &mut StdRng, sd: f64) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    sd * (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

fn parse_csv(text: &str) -> Vec<Subscriber> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let Some(header) = lines.next() else {
        return Vec::new();
    };
    let header: Vec<String> = header
        .split(',')
        .map(|h| h.trim().trim_matches('"').to_ascii_lowercase())
        .collect();
    let col = |name: &str| header.iter().position(|h| h == name);
    let msisdn_col = col("msisdn").unwrap_or(0);
    let (tenure, arpu, data, voice, churn, vas) = (
        col("tenure_months"),
        col("arpu"),
        col("data_mb_30d"),
        col("voice_min_30d"),
        col("churn_risk"),
        col("vas_spend_30d"),
    );

    lines
        .map(|line| {
            let cells: Vec<&str> = line.split(',').map(|c| c.trim().trim_matches('"')).collect();
            let num = |idx: Option<usize>, default: f64| {
                idx.and_then(|i| cells.get(i))
                    .and_then(|c| c.parse::<f64>().ok())
                    .filter(|v| v.is_finite())
                    .unwrap_or(default)
            };
            let msisdn = cells.get(msisdn_col).copied().unwrap_or_default().to_string();
            let arpu = num(arpu, 10.0);
            let vas_default = round_to(arpu * hash01(&[&msisdn, "vas"]) * 0.25, 2);
            Subscriber {
                tenure_months: num(tenure, 6.0),
                arpu,
                data_mb_30d: num(data, 0.0),
                voice_min_30d: num(voice, 0.0),
                churn_risk: num(churn, 0.2),
                vas_spend_30d: num(vas, vas_default),
                msisdn,
            }
        })
        .collect()
}

fn lifecycle_stages(subs: &[Subscriber]) -> Vec<&'static str> {
    let max_of = |f: fn(&Subscriber) -> f64| {
        let m = subs.iter().map(f).fold(0.0_f64, f64::max);
        if m == 0.0 {
            1.0
        } else {
            m
        }
    };
    let (md, mv, mvas) = (
        max_of(|s| s.data_mb_30d),
        max_of(|s| s.voice_min_30d),
        max_of(|s| s.vas_spend_30d),
    );

    subs.iter()
        .map(|s| {
            let usage =
                0.5 * s.data_mb_30d / md + 0.35 * s.voice_min_30d / mv + 0.15 * s.vas_spend_30d / mvas;
            let prev = usage * (0.7 + 0.9 * hash01(&[&s.msisdn, "prev"]));
            if s.tenure_months <= 2.0 {
                "New User"
            } else if usage <= 0.08 {
                "Non-user"
            } else if s.churn_risk >= 0.70 && usage <= 0.20 {
                "Stopper"
            } else if usage <= prev * 0.80 {
                "Dropper"
            } else if usage >= prev * 1.15 {
                "Grower"
            } else {
                "Stable"
            }
        })
        .collect()
}

fn norm_lob(lob: &str) -> &'static str {
    match lob.trim().to_ascii_uppercase().as_str() {
        "TOTAL_NETWORK" | "TOTAL NETWORK" | "TOTALNETWORK" => "TOTAL_NETWORK",
        "VOICE" => "VOICE",
        "VAS" => "VAS",
        _ => "DATA",
    }
}

fn normalize_lobs(lobs: Option<&[String]>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for lob in lobs.unwrap_or_default().iter().filter(|l| !l.trim().is_empty()) {
        let lob = norm_lob(lob).to_string();
        if !out.contains(&lob) {
            out.push(lob);
        }
    }
    if out.is_empty() {
        DEFAULT_LOBS.iter().map(|l| l.to_string()).collect()
    } else {
        out
    }
}

fn squash(s: &str) -> String {
    s.to_lowercase().replace([' ', '-', '_'], "")
}

fn base_strategy(stage: &str, churn: f64) -> &'static str {
    match stage {
        "Dropper" => "Retain",
        "Stopper" => "Revive",
        "Non-user" => "Cross-sell",
        "Stable" if churn < 0.50 => "Upsell",
        _ => "No Action",
    }
}

/// Keeps the base strategy when selected, otherwise picks a selected type
/// that is valid for the stage, otherwise "No Action".
fn apply_type_filter(strategy: &'static str, selected: &[String], stage: &str) -> &'static str {
    if selected.is_empty() || selected.iter().any(|t| t == "Auto") {
        return strategy;
    }
    let allowed: Vec<String> = selected.iter().map(|t| squash(t)).collect();
    if allowed.contains(&squash(strategy)) {
        return strategy;
    }
    let valid: &[&str] = match squash(stage).as_str() {
        "dropper" => &["retain", "noaction"],
        "stopper" => &["revive", "noaction"],
        "stable" => &["upsell", "noaction"],
        "nonuser" => &["crosssell", "noaction"],
        _ => &["noaction"],
    };
    allowed
        .iter()
        .find(|a| valid.contains(&a.as_str()))
        .map(|a| match a.as_str() {
            "upsell" => "Upsell",
            "retain" => "Retain",
            "revive" => "Revive",
            "crosssell" => "Cross-sell",
            _ => "No Action",
        })
        .unwrap_or("No Action")
}

fn opportunity_name(strategy: &str, lob: &str) -> String {
    format!("{}_{}", squash(strategy), lob.to_lowercase())
}

fn strategy_from_opportunity(opp: &str) -> &'static str {
    let opp = squash(opp);
    if opp.contains("upsell") {
        "Upsell"
    } else if opp.contains("retain") {
        "Retain"
    } else if opp.contains("revive") {
        "Revive"
    } else if opp.contains("crosssell") {
        "Cross-sell"
    } else {
        "No Action"
    }
}

fn premium_reason(sub: &Subscriber, strategy: &str, lob: &str) -> String {
    let lob = lob.to_lowercase();
    match strategy {
        "Retain" => format!(
            "High churn risk ({:.1}%) in {lob}. Recommend loyalty offer to prevent revenue loss.",
            sub.churn_risk * 100.0
        ),
        "Revive" => format!(
            "Inactive {lob} user with {:.0} months tenure. Target with win-back campaign.",
            sub.tenure_months
        ),
        "Upsell" => format!(
            "Stable {lob} user (ARPU ${:.2}). Opportunity to upgrade plan for increased revenue.",
            sub.arpu
        ),
        "Cross-sell" => {
            format!("Non-user in {lob}. Cross-sell opportunity to activate this service line.")
        }
        _ => format!("No immediate action required for {lob}."),
    }
}

fn pick_offers(msisdn: &str, lob: &str, strategy: &str, count: usize) -> Vec<String> {
    let lob = lob.to_lowercase();
    let mut pool: Vec<String> = match strategy {
        "Upsell" => vec![
            format!("Premium {lob} plan with 2x benefits"),
            format!("Upgrade to unlimited {lob} package"),
            format!("Enhanced {lob} bundle with bonus features"),
        ],
        "Retain" => vec![
            format!("Loyalty discount: 20% off {lob} for 3 months"),
            format!("Exclusive retention offer: Free {lob} upgrade"),
            format!("Stay & Save: Bonus {lob} credits"),
        ],
        "Revive" => vec![
            format!("Welcome back: 50% off {lob} reactivation"),
            format!("Win-back offer: Free {lob} trial month"),
            format!("Return bonus: Extra {lob} value pack"),
        ],
        "Cross-sell" => vec![
            format!("Try {lob}: First month free"),
            format!("New to {lob}? Get starter bonus"),
            format!("Activate {lob} with special intro price"),
        ],
        _ => (1..=3).map(|i| format!("Standard {lob} offer {i}")).collect(),
    };
    let seed = (hash01(&[msisdn, &lob, strategy]) * 1000.0) as u64;
    pool.shuffle(&mut StdRng::seed_from_u64(seed));
    pool.truncate(count);
    pool
}

fn row(pairs: Vec<(String, Value)>) -> PreviewRow {
    pairs.into_iter().collect()
}

fn columns_of(rows: &[PreviewRow]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for r in rows {
        for k in r.keys() {
            if !columns.contains(k) {
                columns.push(k.clone());
            }
        }
    }
    columns
}

fn build_lifecycle(session: &StubSession) -> Table {
    let stages = lifecycle_stages(&session.subscribers);
    let rows: Vec<PreviewRow> = session
        .subscribers
        .iter()
        .zip(stages)
        .map(|(s, stage)| {
            row(vec![
                ("msisdn".into(), json!(s.msisdn)),
                ("lifecycle_stage".into(), json!(stage)),
            ])
        })
        .collect();
    Table {
        columns: vec!["msisdn".into(), "lifecycle_stage".into()],
        rows,
    }
}

fn build_opportunity(session: &StubSession) -> Table {
    let stages = lifecycle_stages(&session.subscribers);
    let mut rows = Vec::new();
    for (sub, stage) in session.subscribers.iter().zip(stages) {
        let base = base_strategy(stage, sub.churn_risk);
        for lob in &session.lobs {
            let strategy = apply_type_filter(base, &session.types, stage);
            rows.push(row(vec![
                ("msisdn".into(), json!(sub.msisdn)),
                ("lifecycle_stage".into(), json!(stage)),
                ("lob".into(), json!(lob)),
                ("opportunity".into(), json!(opportunity_name(strategy, lob))),
                ("reason".into(), json!(premium_reason(sub, strategy, lob))),
            ]));
        }
    }
    Table {
        columns: ["msisdn", "lifecycle_stage", "lob", "opportunity", "reason"]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        rows,
    }
}

fn build_offers(session: &StubSession, counts: Option<&Map<String, Value>>) -> Table {
    const DEFAULT_COUNT: usize = 2;
    let counts: HashMap<String, usize> = counts
        .map(|m| {
            m.iter()
                .map(|(k, v)| (squash(k), v.as_u64().unwrap_or(1).clamp(1, 3) as usize))
                .collect()
        })
        .unwrap_or_default();

    let mut groups: Vec<((String, String), Vec<&PreviewRow>)> = Vec::new();
    for r in session.table("opportunity").map(|t| t.rows.as_slice()).unwrap_or_default() {
        let key = (
            r.get("msisdn").map(cell_text).unwrap_or_default(),
            r.get("lifecycle_stage").map(cell_text).unwrap_or_default(),
        );
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(r),
            None => groups.push((key, vec![r])),
        }
    }

    let mut rows = Vec::new();
    for ((msisdn, stage), members) in groups {
        let mut out = vec![
            ("msisdn".to_string(), json!(msisdn)),
            ("lifecycle_stage".to_string(), json!(stage)),
        ];
        for lob in &session.lobs {
            let Some(hit) = members
                .iter()
                .find(|r| r.get("lob").map(cell_text).as_deref() == Some(lob.as_str()))
            else {
                continue;
            };
            let opp = hit.get("opportunity").map(cell_text).unwrap_or_default();
            let strategy = strategy_from_opportunity(&opp);
            let count = counts.get(&squash(strategy)).copied().unwrap_or(DEFAULT_COUNT);
            let lob_lower = lob.to_lowercase();
            out.push((format!("opportunity_{lob_lower}"), json!(opp)));
            for (i, offer) in pick_offers(&msisdn, lob, strategy, count).into_iter().enumerate() {
                out.push((format!("{lob_lower}_offer{}", i + 1), json!(offer)));
            }
        }
        rows.push(row(out));
    }

    let columns = if rows.is_empty() {
        let mut cols = vec!["msisdn".to_string(), "lifecycle_stage".to_string()];
        for lob in &session.lobs {
            let lob_lower = lob.to_lowercase();
            cols.push(format!("opportunity_{lob_lower}"));
            cols.extend((1..=DEFAULT_COUNT).map(|i| format!("{lob_lower}_offer{i}")));
        }
        cols
    } else {
        columns_of(&rows)
    };
    Table { columns, rows }
}

fn to_csv(table: &Table) -> String {
    let quote = |s: String| {
        if s.contains([',', '"', '\n']) {
            format!("\"{}\"", s.replace('"', "\"\""))
        } else {
            s
        }
    };
    let mut out = table.columns.join(",");
    out.push('\n');
    for r in &table.rows {
        let line: Vec<String> = table
            .columns
            .iter()
            .map(|c| quote(r.get(c).map(cell_text).unwrap_or_default()))
            .collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}

/// GET /health
async fn health(State(state): State<StubState>) -> Json<Value> {
    let count = state.sessions.read().await.len();
    Json(json!({ "status": "healthy", "sessions_count": count, "timestamp": now() }))
}

/// POST /api/upload
async fn upload(
    State(state): State<StubState>,
    mut multipart: Multipart,
) -> StubResult<Json<Value>> {
    let mut file: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| StubError::bad_request(format!("Upload failed: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| StubError::bad_request(format!("Upload failed: {e}")))?;
        file = Some((name, bytes.to_vec()));
    }

    let Some((file_name, bytes)) = file else {
        return Err(StubError::bad_request("No file uploaded"));
    };
    if !file_name.ends_with(".csv") {
        return Err(StubError::bad_request("Only CSV files accepted"));
    }
    let text = String::from_utf8_lossy(&bytes);
    let cols = text
        .lines()
        .next()
        .map(|h| h.split(',').count())
        .unwrap_or(0);
    let subscribers = parse_csv(&text);
    if subscribers.is_empty() {
        return Err(StubError::bad_request("CSV is empty"));
    }

    let session_id = uuid::Uuid::new_v4().to_string();
    let rows = subscribers.len();
    state.sessions.write().await.insert(
        session_id.clone(),
        StubSession {
            subscribers,
            raw_rows: rows,
            ..StubSession::default()
        },
    );
    info!(session_id = %session_id, rows, cols, "Session created");

    Ok(Json(json!({
        "session_id": session_id,
        "file_name": file_name,
        "rows": rows,
        "cols": cols,
        "timestamp": now(),
    })))
}

/// POST /api/run_step
async fn run_step(
    State(state): State<StubState>,
    Json(req): Json<StepRequest>,
) -> StubResult<Json<Value>> {
    let mut sessions = state.sessions.write().await;
    let session = sessions
        .get_mut(&req.session_id)
        .ok_or_else(StubError::not_found)?;
    let step = req.step.trim().to_lowercase();

    match step.as_str() {
        "lifecycle" => {
            let table = build_lifecycle(session);
            session.store("lifecycle", table);
        }
        "opportunity" => {
            if session.table("lifecycle").is_none() {
                return Err(StubError::bad_request("Run Lifecycle step first."));
            }
            session.lobs = normalize_lobs(req.payload.lobs.as_deref());
            session.types = req
                .payload
                .opportunity_types
                .clone()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| vec!["Auto".to_string()]);
            let table = build_opportunity(session);
            session.store("opportunity", table);
        }
        "offers" => {
            if session.table("opportunity").is_none() {
                return Err(StubError::bad_request("Run Opportunity step first."));
            }
            let table = build_offers(session, req.payload.offer_counts_per_opp.as_ref());
            session.store("offers", table);
        }
        "launch" => {
            let Some(offers) = session.table("offers").cloned() else {
                return Err(StubError::bad_request("Run Offers step first."));
            };
            session.store("launch", offers);
            session.launched = true;
        }
        _ => return Err(StubError::bad_request("Invalid step.")),
    }

    info!(session_id = %req.session_id, step = %step, "Step completed");
    Ok(Json(json!({ "ok": true, "step": step, "timestamp": now() })))
}

#[derive(Debug, Deserialize)]
struct PreviewQuery {
    #[serde(default)]
    step: Option<String>,
    #[serde(default)]
    n: Option<usize>,
}

/// GET /api/preview/:session_id
async fn preview(
    State(state): State<StubState>,
    Path(session_id): Path<String>,
    Query(q): Query<PreviewQuery>,
) -> StubResult<Json<Value>> {
    let sessions = state.sessions.read().await;
    let session = sessions.get(&session_id).ok_or_else(StubError::not_found)?;
    let step = q
        .step
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .unwrap_or_else(|| "lifecycle".to_string());

    let Some(table) = session.table(&step) else {
        let available: Vec<String> = session.steps.iter().map(|(s, _)| format!("'{s}'")).collect();
        return Err(StubError::bad_request(format!(
            "Step '{step}' not available yet. Available steps: [{}]. Run the step first.",
            available.join(", ")
        )));
    };

    let n = q.n.unwrap_or(12).clamp(1, 50);
    let rows: Vec<&PreviewRow> = table.rows.iter().take(n).collect();
    Ok(Json(json!({
        "step": step,
        "columns": table.columns,
        "rows": rows,
        "timestamp": now(),
    })))
}

/// GET /api/download/:session_id
async fn download(
    State(state): State<StubState>,
    Path(session_id): Path<String>,
) -> StubResult<Response> {
    let sessions = state.sessions.read().await;
    let session = sessions.get(&session_id).ok_or_else(StubError::not_found)?;
    let table = match session.table("launch") {
        Some(t) if session.launched => t,
        _ => {
            return Err(StubError::bad_request(
                "Run Review & Launch first (Launch action).",
            ))
        }
    };
    let headers = [
        (header::CONTENT_TYPE, "text/csv".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"output_{session_id}.csv\""),
        ),
    ];
    Ok((headers, to_csv(table)).into_response())
}

#[derive(Debug, Deserialize)]
struct ForecastQuery {
    session_id: String,
    #[serde(default)]
    lobs: String,
}

/// GET /api/impact_forecast
async fn impact_forecast(
    State(state): State<StubState>,
    Query(q): Query<ForecastQuery>,
) -> StubResult<Json<Value>> {
    let raw_rows = {
        let sessions = state.sessions.read().await;
        sessions
            .get(&q.session_id)
            .ok_or_else(StubError::not_found)?
            .raw_rows
    };

    let today = Local::now().date_naive();
    let months: Vec<&str> = (0..6)
        .rev()
        .map(|back| {
            let idx = (today.month0() as i32 - back).rem_euclid(12) as usize;
            MONTHS[idx]
        })
        .collect();

    let seed_key = format!("{}|{}", q.session_id, q.lobs.trim());
    let mut rng = StdRng::seed_from_u64(seed_of(&seed_key));
    let size_factor = (raw_rows.max(1) as f64 / 100_000.0).clamp(0.35, 2.50);

    let rev_trend = 1.5 + 3.5 * rng.gen::<f64>();
    let mut val = (80.0 + 70.0 * rng.gen::<f64>()) * size_factor;
    let mut revenue6 = Vec::with_capacity(6);
    for _ in 0..6 {
        val += rev_trend + noise(&mut rng, 2.2);
        revenue6.push(round_to(val.max(10.0), 1));
    }

    let margin_base = 0.22 + 0.10 * rng.gen::<f64>();
    let margin6: Vec<f64> = revenue6
        .iter()
        .map(|r| round_to((r * (margin_base + noise(&mut rng, 0.008))).max(0.0), 1))
        .collect();

    let churn_drop = 0.06 + 0.10 * rng.gen::<f64>();
    let mut cv = 2.6 + 1.6 * rng.gen::<f64>();
    let mut churn6 = Vec::with_capacity(6);
    for _ in 0..6 {
        cv = cv - churn_drop + noise(&mut rng, 0.03);
        churn6.push(round_to(cv.clamp(0.6, 9.0), 2));
    }

    let s = hash01(&[&seed_key, "uplift"]);
    Ok(Json(json!({
        "session_id": q.session_id,
        "kpis": {
            "revenue_total_m": round_to(revenue6.iter().sum(), 1),
            "margin_total_m": round_to(margin6.iter().sum(), 1),
            "churn_avg_pct": round_to(churn6.iter().sum::<f64>() / 6.0, 2),
            "rev_uplift_pct": round_to(1.5 + 6.0 * s, 1),
            "margin_uplift_pct": round_to(0.8 + 4.0 * s, 1),
            "churn_reduction_pct": round_to(0.6 + 3.5 * s, 1),
        },
        "series": {
            "months6": months,
            "revenue6_m": revenue6,
            "margin6_m": margin6,
            "churn6_pct": churn6,
        },
        "timestamp": now(),
    })))
}

#[derive(Debug, Deserialize)]
struct PublishBody {
    session_id: String,
    #[serde(flatten)]
    request: PublishRequest,
}

/// POST /api/publish
async fn publish(
    State(state): State<StubState>,
    Json(body): Json<PublishBody>,
) -> StubResult<Json<Value>> {
    if !state.sessions.read().await.contains_key(&body.session_id) {
        return Err(StubError::not_found());
    }
    let n = (hash01(&[&body.session_id, &body.request.target]) * 100_000.0) as u64;
    Ok(Json(json!({
        "ok": true,
        "status": "queued",
        "reference_id": format!("PUB-{}-{n:05}", body.session_id),
        "target": body.request.target,
        "mode": body.request.mode,
        "endpoint_url": body.request.endpoint_url,
        "timestamp": now(),
    })))
}
