//! Top-level wizard controller.
//!
//! Owns the whole application state and is the only writer to it. Every user
//! action is one `&mut self` method that calls the backend through
//! [`ApiGateway`] and reports what the view should show through an
//! [`EventSink<ViewEvent>`]. Failures never roll anything back: unlocked
//! buttons stay unlocked, completed steps stay completed.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use wizard_api::models::{PublishReceipt, PublishRequest, StepKind, StepPayload, UploadReceipt};
use wizard_api::ApiGateway;
use wizard_core::config::AppConfig;
use wizard_core::format::PLACEHOLDER;
use wizard_core::types::{
    Control, Dialog, ForecastView, Overlay, PreviewRow, SessionId, Step, TableId, TableView,
    ViewEvent,
};
use wizard_core::{EventSink, WizardError, WizardResult};

use crate::filter::{
    available_opportunity_types, filter_offers_preview, filter_opportunity_preview, normalize_lobs,
};
use crate::forecast::render_forecast;
use crate::navigator::StepNavigator;
use crate::offers::{OfferPlan, PLAN_PLACEHOLDER};
use crate::selection::{lob_label, SelectionStore};

/// How a handler ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The action ran to completion.
    Completed,
    /// A guard or validation stopped the action before any request was sent.
    Blocked,
    /// The backend call failed; an error dialog was shown.
    Failed,
}

impl Outcome {
    pub fn is_completed(self) -> bool {
        self == Outcome::Completed
    }
}

/// Controller knobs taken from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct WizardSettings {
    pub preview_rows: usize,
    pub publish_target: String,
    pub publish_mode: String,
}

impl From<&AppConfig> for WizardSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            preview_rows: config.api.preview_rows,
            publish_target: config.publish.default_target.clone(),
            publish_mode: config.publish.mode.clone(),
        }
    }
}

impl Default for WizardSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

/// Everything the wizard remembers between actions.
#[derive(Debug, Default)]
pub struct AppState {
    pub session: Option<SessionId>,
    pub receipt: Option<UploadReceipt>,
    pub navigator: StepNavigator,
    pub selection: SelectionStore,
    pub offer_plan: Option<OfferPlan>,
    pub last_opportunity_rows: Vec<PreviewRow>,
    pub forecast: Option<ForecastView>,
    pub launch_summary: Option<Value>,
    pub publish_target: String,
    pub publish_url: String,
    pub publish_receipt: Option<PublishReceipt>,
}

const STALE_SELECTION: &str =
    "Selection changed since Opportunity ran. Re-run Step 3 to apply it.";

fn overlay(title: &str, subtitle: &str, icon: &str) -> ViewEvent {
    ViewEvent::OverlayShown(Overlay {
        title: title.to_string(),
        subtitle: subtitle.to_string(),
        icon: icon.to_string(),
    })
}

/// Drives the six wizard steps against the campaign backend.
pub struct WizardController {
    api: Arc<dyn ApiGateway>,
    sink: Arc<dyn EventSink<ViewEvent>>,
    settings: WizardSettings,
    state: AppState,
}

impl WizardController {
    pub fn new(
        api: Arc<dyn ApiGateway>,
        sink: Arc<dyn EventSink<ViewEvent>>,
        settings: WizardSettings,
    ) -> Self {
        Self {
            api,
            sink,
            settings,
            state: AppState::default(),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Show the first pane.
    pub fn start(&mut self) {
        let events = self.state.navigator.show_pane(Step::Upload);
        self.emit_all(events);
    }

    // ---- view plumbing ----

    fn emit(&self, event: ViewEvent) {
        self.sink.emit(event);
    }

    fn emit_all(&self, events: impl IntoIterator<Item = ViewEvent>) {
        for e in events {
            self.sink.emit(e);
        }
    }

    fn modal(&self, dialog: Dialog) {
        self.emit(ViewEvent::Modal(dialog));
    }

    fn toast(&self, text: impl Into<String>) {
        self.emit(ViewEvent::Toast(text.into()));
    }

    /// The current session, or a blocking dialog when there is none.
    fn require_session(&self, title: &str, message: &str) -> Option<SessionId> {
        if self.state.session.is_none() {
            self.modal(Dialog::single(title, message));
        }
        self.state.session.clone()
    }

    /// Mark `step` completed and unlock what it unlocks.
    fn complete(&mut self, step: Step, controls: &[Control], nav: Option<Step>) {
        let tracker = self.state.navigator.mark_step_completed(step);
        self.emit(tracker);
        for control in controls {
            if let Some(e) = self.state.navigator.enable_control(*control) {
                self.emit(e);
            }
        }
        if let Some(e) = nav.and_then(|s| self.state.navigator.enable_nav(s)) {
            self.emit(e);
        }
    }

    fn fail(&self, tag: &'static str, title: &str, fallback: &str, err: &WizardError) -> Outcome {
        error!(tag = %tag, error = %err, "Wizard action failed");
        self.modal(Dialog::single(title, err.user_message(fallback)));
        Outcome::Failed
    }

    fn fail_with_overlay(
        &self,
        tag: &'static str,
        title: &str,
        fallback: &str,
        err: &WizardError,
    ) -> Outcome {
        self.emit(ViewEvent::OverlayHidden);
        self.fail(tag, title, fallback, err)
    }

    fn warn_if_stale(&self) {
        if self.state.selection.is_stale() {
            warn!("Selection differs from the committed Opportunity snapshot");
            self.toast(STALE_SELECTION);
        }
    }

    fn emit_offer_summary(&self) {
        let draft = &self.state.selection;
        let lobs: Vec<&str> = draft.draft_lobs().iter().map(|l| lob_label(l)).collect();
        let types: Vec<&str> = draft.draft_opp_types().iter().map(String::as_str).collect();
        self.emit(ViewEvent::OfferSummary {
            lobs: join_or_placeholder(&lobs),
            opportunities: join_or_placeholder(&types),
        });
    }

    // ---- selection edits ----

    pub fn set_lobs<I, S>(&mut self, lobs: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.selection.set_lobs(lobs);
        self.emit_offer_summary();
    }

    pub fn set_opp_types<I, S>(&mut self, opp_types: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.selection.set_opp_types(opp_types);
        self.emit_offer_summary();
    }

    pub fn select_opp_type(&mut self, opp_type: &str) {
        self.state.selection.select_opp_type(opp_type);
        self.emit_offer_summary();
    }

    pub fn deselect_opp_type(&mut self, opp_type: &str) {
        self.state.selection.deselect_opp_type(opp_type);
        self.emit_offer_summary();
    }

    pub fn set_publish_target(&mut self, target: impl Into<String>) {
        self.state.publish_target = target.into();
    }

    pub fn set_publish_url(&mut self, url: impl Into<String>) {
        self.state.publish_url = url.into();
    }

    // ---- navigation ----

    /// Click on a sidebar item; ignored while the item is locked.
    pub fn click_nav(&mut self, step: Step) -> Outcome {
        match self.state.navigator.click_nav(step) {
            Some(events) => {
                self.emit_all(events);
                Outcome::Completed
            }
            None => Outcome::Blocked,
        }
    }

    /// The "Next" button of the visible pane. Entering Offers refreshes the
    /// summary and rebuilds the offer grid.
    pub fn advance(&mut self) -> Outcome {
        let (control, next) = match self.state.navigator.active() {
            Step::Upload => (Control::NextToLifecycle, Step::Lifecycle),
            Step::Lifecycle => (Control::NextToOpportunity, Step::Opportunity),
            Step::Opportunity => (Control::NextToOffers, Step::Offers),
            Step::Offers => (Control::NextToForecast, Step::Forecast),
            Step::Forecast => (Control::NextToReviewLaunch, Step::ReviewLaunch),
            Step::ReviewLaunch => return Outcome::Blocked,
        };
        if !self.state.navigator.is_control_enabled(control) {
            return Outcome::Blocked;
        }
        if next == Step::Offers {
            self.open_offers();
        }
        let events = self.state.navigator.show_pane(next);
        self.emit_all(events);
        Outcome::Completed
    }

    /// Refresh the Offers pane: selection summary plus the count grid built
    /// from the committed selection. Counts reset to their defaults.
    pub fn open_offers(&mut self) {
        self.emit_offer_summary();
        self.warn_if_stale();
        self.state.offer_plan = OfferPlan::from_snapshot(self.state.selection.snapshot());
        match &self.state.offer_plan {
            Some(plan) => self.emit(ViewEvent::OfferConfig(plan.cards().to_vec())),
            None => self.emit(ViewEvent::OfferConfigPlaceholder(PLAN_PLACEHOLDER.to_string())),
        }
    }

    pub fn set_offer_count(&mut self, opp_type: &str, count: u8) -> WizardResult<()> {
        let plan = self
            .state
            .offer_plan
            .as_mut()
            .ok_or_else(|| WizardError::Validation(PLAN_PLACEHOLDER.to_string()))?;
        plan.set_count(opp_type, count)?;
        let cards = plan.cards().to_vec();
        self.emit(ViewEvent::OfferConfig(cards));
        Ok(())
    }

    // ---- step 1: upload ----

    /// Upload the audience CSV. `None` is the "no file chosen" case.
    pub async fn upload(&mut self, file: Option<(String, Vec<u8>)>) -> Outcome {
        let Some((file_name, bytes)) = file else {
            self.modal(Dialog::single("Upload", "Please select a CSV file."));
            return Outcome::Blocked;
        };

        self.emit(overlay(
            "Validation and Ingestion Agent",
            "Validating & ingesting audience",
            "📤",
        ));
        match self.api.upload(&file_name, bytes).await {
            Ok(receipt) => {
                let shown = match receipt_json(&receipt) {
                    Ok(v) => v,
                    Err(e) => {
                        return self.fail_with_overlay("UPLOAD_ERROR", "Upload error", "Upload failed", &e)
                    }
                };
                let sid = receipt.session_id.clone();
                info!(session_id = %sid, file_name = %file_name, "Audience uploaded");
                self.emit(ViewEvent::SessionStarted {
                    pill: format!("Session: {}", sid.short()),
                    receipt: shown,
                });
                self.state.session = Some(sid);
                self.state.receipt = Some(receipt);
                self.emit(ViewEvent::OverlayHidden);
                self.toast("Upload success ✅");
                self.complete(Step::Upload, &[Control::NextToLifecycle], Some(Step::Lifecycle));
                Outcome::Completed
            }
            Err(e) => self.fail_with_overlay("UPLOAD_ERROR", "Upload error", "Upload failed", &e),
        }
    }

    // ---- step 2: lifecycle ----

    pub async fn run_lifecycle(&mut self) -> Outcome {
        let Some(sid) = self.require_session("Lifecycle", "No session. Please upload first.") else {
            return Outcome::Blocked;
        };

        self.emit(overlay(
            "Lifecycle Intelligence Agent",
            "Assigning lifecycle stage",
            "🧬",
        ));
        match self
            .api
            .run_step(&sid, StepKind::Lifecycle, &StepPayload::default())
            .await
        {
            Ok(_) => {
                info!(session_id = %sid, "Lifecycle stage assigned");
                self.emit(ViewEvent::OverlayHidden);
                self.complete(
                    Step::Lifecycle,
                    &[Control::PreviewLifecycle, Control::NextToOpportunity],
                    Some(Step::Opportunity),
                );
                self.toast("Lifecycle ready ✅");
                Outcome::Completed
            }
            Err(e) => self.fail_with_overlay(
                "LIFECYCLE_ERROR",
                "Lifecycle error",
                "Lifecycle step failed",
                &e,
            ),
        }
    }

    pub async fn preview_lifecycle(&mut self) -> Outcome {
        let Some(sid) = self.require_session("Preview error", "No session. Please upload first.")
        else {
            return Outcome::Blocked;
        };
        match self
            .api
            .preview(&sid, StepKind::Lifecycle, self.settings.preview_rows)
            .await
        {
            Ok(page) => {
                let rows = page.rows.unwrap_or_default();
                self.emit(ViewEvent::TableRendered {
                    table: TableId::Lifecycle,
                    view: TableView::from_rows(&rows),
                });
                Outcome::Completed
            }
            Err(e) => self.fail("PREVIEW_LIFECYCLE_ERROR", "Preview error", "Preview failed", &e),
        }
    }

    // ---- step 3: opportunity ----

    /// Validate and commit the selection, then run the Opportunity step with it.
    pub async fn run_opportunity(&mut self) -> Outcome {
        let Some(sid) = self.require_session("Opportunity", "No session. Please run Lifecycle first.")
        else {
            return Outcome::Blocked;
        };
        if let Err(dialog) = self.state.selection.validate_lobs() {
            self.modal(dialog);
            return Outcome::Blocked;
        }
        if let Err(dialog) = self.state.selection.validate_opp_types() {
            self.modal(dialog);
            return Outcome::Blocked;
        }

        let selection = self.state.selection.commit(Utc::now()).selection.clone();
        let lob_display = selection.lobs.join(", ");
        let opp_display = if selection.opp_types.is_empty() {
            "Auto".to_string()
        } else {
            selection.opp_types.join(", ")
        };
        self.emit(overlay(
            "Next Best Action Agent",
            &format!("Analyzing {lob_display} for {opp_display} opportunities..."),
            "🎯",
        ));

        let payload = StepPayload {
            lobs: Some(selection.lobs.clone()),
            opportunity_types: Some(selection.opp_types.clone()),
            offer_counts_per_opp: None,
        };
        match self.api.run_step(&sid, StepKind::Opportunity, &payload).await {
            Ok(_) => {
                info!(session_id = %sid, lobs = %lob_display, types = %opp_display, "Opportunities identified");
                self.emit(ViewEvent::OverlayHidden);
                self.complete(
                    Step::Opportunity,
                    &[Control::PreviewOpportunity, Control::NextToOffers],
                    Some(Step::Offers),
                );
                self.state.last_opportunity_rows.clear();
                self.state.offer_plan = OfferPlan::from_snapshot(self.state.selection.snapshot());
                self.toast(format!(
                    "Opportunities ready for {} LOB(s) ✅",
                    selection.lobs.len()
                ));
                Outcome::Completed
            }
            Err(e) => self.fail_with_overlay(
                "OPPORTUNITY_ERROR",
                "Opportunity error",
                "Opportunity step failed",
                &e,
            ),
        }
    }

    /// Fetch opportunity rows and narrow them to the live selection.
    pub async fn preview_opportunity(&mut self) -> Outcome {
        if let Err(dialog) = self.state.selection.validate_lobs() {
            self.modal(dialog);
            return Outcome::Blocked;
        }
        let Some(sid) = self.require_session("Preview error", "No session. Please upload first.")
        else {
            return Outcome::Blocked;
        };

        let page = match self
            .api
            .preview(&sid, StepKind::Opportunity, self.settings.preview_rows)
            .await
        {
            Ok(page) => page,
            Err(e) => return self.fail("PREVIEW_OPP_ERROR", "Preview error", "Preview failed", &e),
        };
        self.state.last_opportunity_rows = page.rows.unwrap_or_default();

        let current = self.state.selection.current();
        let rows = filter_opportunity_preview(
            &self.state.last_opportunity_rows,
            &current.lobs,
            &current.opp_types,
        );
        debug!(
            fetched = self.state.last_opportunity_rows.len(),
            kept = rows.len(),
            "Opportunity preview filtered"
        );

        if rows.is_empty() && !self.state.last_opportunity_rows.is_empty() {
            let available = available_opportunity_types(&self.state.last_opportunity_rows);
            self.modal(Dialog::new(
                "No Matching Opportunities",
                vec![
                    "No opportunities found matching your selection.".to_string(),
                    format!("You selected: {}", current.opp_types.join(", ")),
                    format!("Available in data: {}", available.join(", ")),
                    "Tip: Select \"Auto\" to see all opportunity types, or select matching opportunity types."
                        .to_string(),
                ],
            ));
            self.emit(ViewEvent::TableRendered {
                table: TableId::Opportunity,
                view: TableView::default(),
            });
            return Outcome::Completed;
        }

        let count = rows.len();
        self.emit(ViewEvent::TableRendered {
            table: TableId::Opportunity,
            view: TableView::from_rows(&rows),
        });
        let opp_display = if current.has_auto() {
            "all types".to_string()
        } else {
            current.opp_types.join(", ")
        };
        self.toast(format!(
            "Showing {count} opportunities for {} ({opp_display})",
            current.lobs.join(", ")
        ));
        Outcome::Completed
    }

    // ---- step 4: offers ----

    pub async fn run_offers(&mut self) -> Outcome {
        let Some(sid) = self.require_session("Offers", "No session. Please run Opportunity first.")
        else {
            return Outcome::Blocked;
        };
        let Some(snapshot) = self.state.selection.snapshot().cloned() else {
            self.modal(Dialog::single(
                "Offers Warning",
                "No opportunity selection found. Please run the Opportunity step first.",
            ));
            return Outcome::Blocked;
        };
        self.warn_if_stale();

        let (counts, counts_display) = match &self.state.offer_plan {
            Some(plan) => (plan.counts(), plan.display()),
            None => Default::default(),
        };
        let selection = snapshot.selection;
        self.emit(overlay(
            "Next Best Offer Agent",
            &format!(
                "Generating offers for {}...\n{counts_display}",
                selection.lobs.join(", ")
            ),
            "🧠",
        ));

        let type_count = counts.len();
        let payload = StepPayload {
            lobs: Some(selection.lobs),
            opportunity_types: Some(selection.opp_types),
            offer_counts_per_opp: Some(counts),
        };
        match self.api.run_step(&sid, StepKind::Offers, &payload).await {
            Ok(_) => {
                info!(session_id = %sid, counts = %counts_display, "Offers generated");
                self.emit(ViewEvent::OverlayHidden);
                self.complete(
                    Step::Offers,
                    &[Control::PreviewOffers, Control::NextToForecast],
                    Some(Step::Forecast),
                );
                self.toast(format!(
                    "Offers generated for {type_count} opportunity type(s) ✅"
                ));
                Outcome::Completed
            }
            Err(e) => {
                self.fail_with_overlay("OFFERS_ERROR", "Offers error", "Offers step failed", &e)
            }
        }
    }

    /// Fetch offer rows and narrow them to the committed selection. Known
    /// server messages get a dedicated dialog.
    pub async fn preview_offers(&mut self) -> Outcome {
        let Some(snapshot) = self.state.selection.snapshot().cloned() else {
            self.modal(Dialog::single(
                "Preview Not Available",
                "Please run the Opportunity step first, then Generate Offers before previewing.",
            ));
            return Outcome::Blocked;
        };
        let Some(sid) = self.state.session.clone() else {
            self.modal(session_expired());
            return Outcome::Blocked;
        };

        let page = match self
            .api
            .preview(&sid, StepKind::Offers, self.settings.preview_rows)
            .await
        {
            Ok(page) => page,
            Err(e) => {
                error!(tag = "PREVIEW_OFFERS_ERROR", error = %e, "Wizard action failed");
                self.modal(classify_offers_preview_error(&e.user_message("Preview failed")));
                return Outcome::Failed;
            }
        };

        let Some(rows) = page.rows else {
            self.modal(Dialog::single(
                "No Data Available",
                "No offer data available. Please click 'Generate Offers' first.",
            ));
            return Outcome::Completed;
        };
        if rows.is_empty() {
            self.modal(Dialog::single(
                "No Data",
                "No offers have been generated yet. Please click 'Generate Offers' first.",
            ));
            self.emit(ViewEvent::TableRendered {
                table: TableId::Offers,
                view: TableView::default(),
            });
            return Outcome::Completed;
        }

        let selection = snapshot.selection;
        let rows = if selection.lobs.is_empty() {
            rows
        } else {
            let kept = filter_offers_preview(&rows, &selection.lobs, &selection.opp_types);
            self.toast(format!(
                "Showing {} offers for {} ({})",
                kept.len(),
                selection.lobs.join(", "),
                selection.opp_types.join(", ")
            ));
            kept
        };
        self.emit(ViewEvent::TableRendered {
            table: TableId::Offers,
            view: TableView::from_rows(&rows),
        });
        Outcome::Completed
    }

    // ---- step 5: forecast ----

    pub async fn run_forecast(&mut self) -> Outcome {
        let Some(sid) = self.require_session(
            "Forecast",
            "No active session. Please upload audience first.",
        ) else {
            return Outcome::Blocked;
        };
        self.warn_if_stale();

        let lobs = match self.state.selection.snapshot() {
            Some(s) => s.selection.lobs.clone(),
            None => normalize_lobs(self.state.selection.draft_lobs()),
        };
        self.emit(overlay(
            "Impact Forecast Agent",
            "Forecasting uplift and churn reduction",
            "📈",
        ));

        match self.api.forecast(&sid, &lobs).await {
            Ok(payload) => {
                self.emit(ViewEvent::OverlayHidden);
                if self.state.forecast.is_some() {
                    self.emit(ViewEvent::ChartsCleared);
                }
                let view = render_forecast(&payload);
                self.emit(ViewEvent::ForecastRendered(view.clone()));
                self.state.forecast = Some(view);
                info!(session_id = %sid, lobs = %lobs.join(","), "Forecast rendered");
                self.complete(
                    Step::Forecast,
                    &[Control::NextToReviewLaunch],
                    Some(Step::ReviewLaunch),
                );
                self.toast("Forecast ready ✅");
                Outcome::Completed
            }
            Err(e) => {
                self.fail_with_overlay("FORECAST_ERROR", "Forecast error", "An error occurred", &e)
            }
        }
    }

    // ---- step 6: review & launch ----

    pub async fn launch(&mut self) -> Outcome {
        let Some(sid) =
            self.require_session("Launch", "No session. Please complete previous steps.")
        else {
            return Outcome::Blocked;
        };

        self.emit(overlay("Governance Agent", "Preparing approval pack", "🚀"));
        match self
            .api
            .run_step(&sid, StepKind::Launch, &StepPayload::default())
            .await
        {
            Ok(_) => {
                self.emit(ViewEvent::OverlayHidden);
                self.complete(Step::ReviewLaunch, &[], None);

                let snapshot = self.state.selection.snapshot();
                let summary = json!({
                    "session_id": sid.as_str(),
                    "status": "Approved",
                    "output_ready": true,
                    "lobs_processed": snapshot.map(|s| s.selection.lobs.clone()).unwrap_or_default(),
                    "opportunities_processed": snapshot.map(|s| s.selection.opp_types.clone()).unwrap_or_default(),
                    "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                });
                self.emit(ViewEvent::ReviewSummary(summary.clone()));
                self.state.launch_summary = Some(summary);

                for control in [Control::Download, Control::PublishApi] {
                    if let Some(e) = self.state.navigator.enable_control(control) {
                        self.emit(e);
                    }
                }
                info!(session_id = %sid, "Campaign launched");
                self.toast("Campaign launched ✅");
                Outcome::Completed
            }
            Err(e) => self.fail_with_overlay("LAUNCH_ERROR", "Launch error", "Launch failed", &e),
        }
    }

    /// Hand the output file location to the view. Silent without a session.
    pub fn download(&mut self) -> Option<String> {
        let sid = self.state.session.as_ref()?;
        let url = self.api.download_url(sid);
        self.emit(ViewEvent::DownloadOpened(url.clone()));
        Some(url)
    }

    pub async fn publish(&mut self) -> Outcome {
        let Some(sid) = self.require_session("Publish", "No session.") else {
            return Outcome::Blocked;
        };
        let target = if self.state.publish_target.trim().is_empty() {
            self.settings.publish_target.clone()
        } else {
            self.state.publish_target.clone()
        };
        let request = PublishRequest {
            target,
            mode: self.settings.publish_mode.clone(),
            endpoint_url: self.state.publish_url.clone(),
        };

        self.emit(overlay("Publishing...", "Sending to target system", "📡"));
        match self.api.publish(&sid, &request).await {
            Ok(receipt) => {
                let shown = match receipt_json(&receipt) {
                    Ok(v) => v,
                    Err(e) => {
                        return self.fail_with_overlay(
                            "PUBLISH_ERROR",
                            "Publish error",
                            "Publish failed",
                            &e,
                        )
                    }
                };
                self.emit(ViewEvent::OverlayHidden);
                info!(session_id = %sid, target = %request.target, "Published");
                self.emit(ViewEvent::PublishSummary(shown));
                self.state.publish_receipt = Some(receipt);
                self.toast("Published successfully ✅");
                Outcome::Completed
            }
            Err(e) => self.fail_with_overlay("PUBLISH_ERROR", "Publish error", "Publish failed", &e),
        }
    }
}

/// A receipt as the view shows it, verbatim.
fn receipt_json<T: Serialize>(receipt: &T) -> WizardResult<Value> {
    Ok(serde_json::to_value(receipt)?)
}

fn join_or_placeholder(items: &[&str]) -> String {
    if items.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        items.join(", ")
    }
}

fn session_expired() -> Dialog {
    Dialog::single(
        "Session Expired",
        "Your session has expired. Please start over by uploading your file again.",
    )
}

/// Dialog for a failed offers preview, picked by substring of the message.
pub fn classify_offers_preview_error(message: &str) -> Dialog {
    if message.contains("not available") || message.contains("Run it first") {
        Dialog::new(
            "Generate Offers First",
            vec![
                "⚠️".to_string(),
                "The offers have not been generated yet.".to_string(),
                "Please click 'Generate Offers' button first".to_string(),
                "Then you can preview the results.".to_string(),
            ],
        )
    } else if message.contains("Session not found") {
        session_expired()
    } else {
        Dialog::single("Preview Error", message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use wizard_api::models::{ForecastPayload, PreviewPage, StepAck};
    use wizard_core::event_bus::{capture_sink, CaptureSink};

    /// In-memory backend with scripted responses.
    #[derive(Default)]
    struct FakeGateway {
        steps: Mutex<Vec<(StepKind, StepPayload)>>,
        previews: Mutex<HashMap<StepKind, Option<Vec<PreviewRow>>>>,
        step_error: Mutex<Option<(u16, String)>>,
        preview_error: Mutex<Option<(u16, String)>>,
        forecast_lobs: Mutex<Vec<Vec<String>>>,
        published: Mutex<Vec<PublishRequest>>,
    }

    impl FakeGateway {
        fn with_preview(self, step: StepKind, rows: Option<Vec<Value>>) -> Self {
            let rows = rows.map(|rs| {
                rs.into_iter()
                    .map(|r| r.as_object().cloned().unwrap())
                    .collect()
            });
            self.previews.lock().unwrap().insert(step, rows);
            self
        }

        fn fail_steps(&self, status: u16, message: &str) {
            *self.step_error.lock().unwrap() = Some((status, message.to_string()));
        }

        fn fail_previews(&self, status: u16, message: &str) {
            *self.preview_error.lock().unwrap() = Some((status, message.to_string()));
        }

        fn step_calls(&self) -> Vec<(StepKind, StepPayload)> {
            self.steps.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ApiGateway for FakeGateway {
        async fn upload(&self, file_name: &str, _bytes: Vec<u8>) -> WizardResult<UploadReceipt> {
            Ok(serde_json::from_value(json!({
                "session_id": "0f8fad5b-d9cb-469f-a165-70867728950e",
                "file_name": file_name,
                "rows": 4,
                "cols": 6
            }))?)
        }

        async fn run_step(
            &self,
            _session: &SessionId,
            step: StepKind,
            payload: &StepPayload,
        ) -> WizardResult<StepAck> {
            if let Some((status, message)) = self.step_error.lock().unwrap().clone() {
                return Err(WizardError::Api { status, message });
            }
            self.steps.lock().unwrap().push((step, payload.clone()));
            Ok(StepAck {
                ok: true,
                step: Some(step.to_string()),
                ..StepAck::default()
            })
        }

        async fn preview(
            &self,
            _session: &SessionId,
            step: StepKind,
            _n: usize,
        ) -> WizardResult<PreviewPage> {
            if let Some((status, message)) = self.preview_error.lock().unwrap().clone() {
                return Err(WizardError::Api { status, message });
            }
            let rows = self
                .previews
                .lock()
                .unwrap()
                .get(&step)
                .cloned()
                .unwrap_or(Some(Vec::new()));
            Ok(PreviewPage {
                step: Some(step.to_string()),
                columns: Vec::new(),
                rows,
            })
        }

        async fn forecast(
            &self,
            _session: &SessionId,
            lobs: &[String],
        ) -> WizardResult<ForecastPayload> {
            self.forecast_lobs.lock().unwrap().push(lobs.to_vec());
            Ok(serde_json::from_value(json!({
                "kpis": {"revenue_total_m": 10.0, "rev_uplift_pct": 2.0},
                "series": {"months6": ["Jan"], "revenue6_m": [10.0]}
            }))?)
        }

        async fn publish(
            &self,
            session: &SessionId,
            request: &PublishRequest,
        ) -> WizardResult<PublishReceipt> {
            self.published.lock().unwrap().push(request.clone());
            Ok(PublishReceipt {
                ok: true,
                status: Some("queued".into()),
                reference_id: Some(format!("PUB-{session}")),
                ..PublishReceipt::default()
            })
        }

        fn download_url(&self, session: &SessionId) -> String {
            format!("http://backend/api/download/{session}")
        }
    }

    fn controller(api: Arc<FakeGateway>) -> (WizardController, Arc<CaptureSink<ViewEvent>>) {
        let sink = capture_sink::<ViewEvent>();
        let ctl = WizardController::new(api, sink.clone(), WizardSettings::default());
        (ctl, sink)
    }

    fn csv() -> Option<(String, Vec<u8>)> {
        Some(("subs.csv".into(), b"msisdn\n1\n".to_vec()))
    }

    fn modals(sink: &CaptureSink<ViewEvent>) -> Vec<Dialog> {
        sink.events()
            .into_iter()
            .filter_map(|e| match e {
                ViewEvent::Modal(d) => Some(d),
                _ => None,
            })
            .collect()
    }

    fn toasts(sink: &CaptureSink<ViewEvent>) -> Vec<String> {
        sink.events()
            .into_iter()
            .filter_map(|e| match e {
                ViewEvent::Toast(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    fn last_table(sink: &CaptureSink<ViewEvent>) -> Option<(TableId, TableView)> {
        sink.events().into_iter().rev().find_map(|e| match e {
            ViewEvent::TableRendered { table, view } => Some((table, view)),
            _ => None,
        })
    }

    async fn through_opportunity(
        ctl: &mut WizardController,
        lobs: &[&str],
        types: &[&str],
    ) {
        assert_eq!(ctl.upload(csv()).await, Outcome::Completed);
        assert_eq!(ctl.run_lifecycle().await, Outcome::Completed);
        ctl.set_lobs(lobs.iter().copied());
        ctl.set_opp_types(types.iter().copied());
        assert_eq!(ctl.run_opportunity().await, Outcome::Completed);
    }

    #[tokio::test]
    async fn test_upload_without_file_is_blocked() {
        let (mut ctl, sink) = controller(Arc::new(FakeGateway::default()));
        assert_eq!(ctl.upload(None).await, Outcome::Blocked);
        assert_eq!(
            modals(&sink),
            vec![Dialog::single("Upload", "Please select a CSV file.")]
        );
        assert!(ctl.state().session.is_none());
    }

    #[tokio::test]
    async fn test_upload_starts_session_and_unlocks_lifecycle() {
        let (mut ctl, sink) = controller(Arc::new(FakeGateway::default()));
        assert_eq!(ctl.upload(csv()).await, Outcome::Completed);

        let events = sink.events();
        assert!(events.contains(&ViewEvent::SessionStarted {
            pill: "Session: 0f8fad5b...".into(),
            receipt: json!({
                "session_id": "0f8fad5b-d9cb-469f-a165-70867728950e",
                "file_name": "subs.csv",
                "rows": 4,
                "cols": 6
            }),
        }));
        assert!(events.contains(&ViewEvent::ControlEnabled(Control::NextToLifecycle)));
        assert!(events.contains(&ViewEvent::NavEnabled(Step::Lifecycle)));
        assert_eq!(toasts(&sink), vec!["Upload success ✅"]);
        assert!(ctl.state().navigator.is_completed(Step::Upload));
    }

    #[test]
    fn test_locked_navigation_is_ignored() {
        let (mut ctl, sink) = controller(Arc::new(FakeGateway::default()));
        ctl.start();
        assert_eq!(ctl.advance(), Outcome::Blocked);
        assert_eq!(ctl.click_nav(Step::Forecast), Outcome::Blocked);
        assert_eq!(ctl.state().navigator.active(), Step::Upload);
        assert_eq!(sink.count(), 2);
    }

    #[tokio::test]
    async fn test_steps_require_session() {
        let (mut ctl, sink) = controller(Arc::new(FakeGateway::default()));
        assert_eq!(ctl.run_lifecycle().await, Outcome::Blocked);
        assert_eq!(ctl.run_forecast().await, Outcome::Blocked);
        assert_eq!(ctl.publish().await, Outcome::Blocked);
        let titles: Vec<String> = modals(&sink).into_iter().map(|d| d.title).collect();
        assert_eq!(titles, vec!["Lifecycle", "Forecast", "Publish"]);
        assert_eq!(
            modals(&sink)[1].lines,
            vec!["No active session. Please upload audience first."]
        );
    }

    #[tokio::test]
    async fn test_opportunity_requires_lobs_and_types() {
        let api = Arc::new(FakeGateway::default());
        let (mut ctl, sink) = controller(api.clone());
        ctl.upload(csv()).await;

        assert_eq!(ctl.run_opportunity().await, Outcome::Blocked);
        ctl.set_lobs(["DATA"]);
        assert_eq!(ctl.run_opportunity().await, Outcome::Blocked);

        let titles: Vec<String> = modals(&sink).into_iter().map(|d| d.title).collect();
        assert_eq!(titles, vec!["LOB Selection Required", "Opportunity Type Required"]);
        assert!(api.step_calls().is_empty());
        assert!(ctl.state().selection.snapshot().is_none());
    }

    #[tokio::test]
    async fn test_opportunity_commits_and_sends_selection() {
        let api = Arc::new(FakeGateway::default());
        let (mut ctl, sink) = controller(api.clone());
        through_opportunity(&mut ctl, &["DATA", "VOICE"], &["Upsell", "Retain"]).await;

        let (step, payload) = api.step_calls().last().cloned().unwrap();
        assert_eq!(step, StepKind::Opportunity);
        assert_eq!(payload.lobs, Some(vec!["DATA".into(), "VOICE".into()]));
        assert_eq!(
            payload.opportunity_types,
            Some(vec!["Upsell".into(), "Retain".into()])
        );

        assert!(sink.events().contains(&overlay(
            "Next Best Action Agent",
            "Analyzing DATA, VOICE for Upsell, Retain opportunities...",
            "🎯"
        )));
        assert!(toasts(&sink).contains(&"Opportunities ready for 2 LOB(s) ✅".to_string()));
        assert!(ctl.state().navigator.is_nav_enabled(Step::Offers));
        assert!(ctl
            .state()
            .navigator
            .is_control_enabled(Control::PreviewOpportunity));
    }

    #[tokio::test]
    async fn test_opportunity_preview_filters_by_live_selection() {
        let api = Arc::new(FakeGateway::default().with_preview(
            StepKind::Opportunity,
            Some(vec![
                json!({"msisdn": "1", "lob": "DATA", "opportunity": "upsell_data"}),
                json!({"msisdn": "1", "lob": "VOICE", "opportunity": "upsell_voice"}),
                json!({"msisdn": "2", "lob": "DATA", "opportunity": "noaction_data"}),
            ]),
        ));
        let (mut ctl, sink) = controller(api);
        through_opportunity(&mut ctl, &["DATA"], &["Upsell"]).await;

        assert_eq!(ctl.preview_opportunity().await, Outcome::Completed);
        let (table, view) = last_table(&sink).unwrap();
        assert_eq!(table, TableId::Opportunity);
        assert_eq!(view.rows.len(), 1);
        assert_eq!(view.rows[0], vec!["1", "DATA", "upsell_data"]);
        assert_eq!(ctl.state().last_opportunity_rows.len(), 3);
        assert!(toasts(&sink).contains(&"Showing 1 opportunities for DATA (Upsell)".to_string()));
    }

    #[tokio::test]
    async fn test_opportunity_preview_without_matches_lists_available_types() {
        let api = Arc::new(FakeGateway::default().with_preview(
            StepKind::Opportunity,
            Some(vec![
                json!({"lob": "DATA", "opportunity": "noaction_data"}),
                json!({"lob": "DATA", "opportunity": "retain_data"}),
            ]),
        ));
        let (mut ctl, sink) = controller(api);
        through_opportunity(&mut ctl, &["DATA"], &["Upsell"]).await;

        ctl.preview_opportunity().await;
        let dialog = modals(&sink).pop().unwrap();
        assert_eq!(dialog.title, "No Matching Opportunities");
        assert_eq!(dialog.lines[1], "You selected: Upsell");
        assert_eq!(dialog.lines[2], "Available in data: noaction, retain");
        assert!(last_table(&sink).unwrap().1.is_empty());
    }

    #[tokio::test]
    async fn test_step_failure_keeps_prior_state() {
        let api = Arc::new(FakeGateway::default());
        let (mut ctl, sink) = controller(api.clone());
        ctl.upload(csv()).await;
        api.fail_steps(400, "Run Lifecycle step first.");

        assert_eq!(ctl.run_lifecycle().await, Outcome::Failed);
        assert_eq!(
            modals(&sink),
            vec![Dialog::single("Lifecycle error", "Run Lifecycle step first.")]
        );
        assert!(ctl.state().navigator.is_completed(Step::Upload));
        assert!(!ctl.state().navigator.is_completed(Step::Lifecycle));
        assert!(ctl
            .state()
            .navigator
            .is_control_enabled(Control::NextToLifecycle));
        assert_eq!(sink.events().last(), Some(&ViewEvent::Modal(modals(&sink)[0].clone())));
    }

    #[tokio::test]
    async fn test_offers_use_committed_selection_and_counts() {
        let api = Arc::new(FakeGateway::default());
        let (mut ctl, sink) = controller(api.clone());
        through_opportunity(&mut ctl, &["DATA"], &["Auto"]).await;

        assert_eq!(ctl.click_nav(Step::Opportunity), Outcome::Completed);
        assert_eq!(ctl.advance(), Outcome::Completed);
        assert_eq!(ctl.state().navigator.active(), Step::Offers);
        ctl.set_offer_count("Upsell", 3).unwrap();
        assert!(ctl.set_offer_count("Upsell", 9).is_err());

        assert_eq!(ctl.run_offers().await, Outcome::Completed);
        let (step, payload) = api.step_calls().last().cloned().unwrap();
        assert_eq!(step, StepKind::Offers);
        let counts = payload.offer_counts_per_opp.unwrap();
        assert_eq!(counts.len(), 5);
        assert_eq!(counts["Upsell"], json!(3));
        assert_eq!(payload.lobs, Some(vec!["DATA".into()]));
        assert!(toasts(&sink).contains(&"Offers generated for 5 opportunity type(s) ✅".to_string()));
    }

    #[tokio::test]
    async fn test_rerun_opportunity_rebuilds_offer_plan() {
        let api = Arc::new(FakeGateway::default());
        let (mut ctl, _sink) = controller(api.clone());
        through_opportunity(&mut ctl, &["DATA"], &["Upsell"]).await;
        assert_eq!(ctl.click_nav(Step::Offers), Outcome::Completed);
        ctl.set_offer_count("Upsell", 3).unwrap();

        ctl.set_opp_types(["Retain"]);
        assert_eq!(ctl.run_opportunity().await, Outcome::Completed);
        assert_eq!(ctl.click_nav(Step::Offers), Outcome::Completed);
        assert_eq!(ctl.run_offers().await, Outcome::Completed);

        let (_, payload) = api.step_calls().last().cloned().unwrap();
        let counts = payload.offer_counts_per_opp.unwrap();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts["Retain"], json!(2));
        assert!(!counts.contains_key("Upsell"));
    }

    #[tokio::test]
    async fn test_stale_selection_warns_but_keeps_snapshot() {
        let api = Arc::new(FakeGateway::default());
        let (mut ctl, sink) = controller(api.clone());
        through_opportunity(&mut ctl, &["DATA"], &["Upsell"]).await;

        ctl.set_lobs(["VOICE"]);
        ctl.run_forecast().await;
        assert!(toasts(&sink).contains(&STALE_SELECTION.to_string()));
        assert_eq!(
            api.forecast_lobs.lock().unwrap().last().cloned(),
            Some(vec!["DATA".to_string()])
        );
    }

    #[tokio::test]
    async fn test_offers_need_snapshot() {
        let (mut ctl, sink) = controller(Arc::new(FakeGateway::default()));
        ctl.upload(csv()).await;
        assert_eq!(ctl.run_offers().await, Outcome::Blocked);
        assert_eq!(ctl.preview_offers().await, Outcome::Blocked);
        let titles: Vec<String> = modals(&sink).into_iter().map(|d| d.title).collect();
        assert_eq!(titles, vec!["Offers Warning", "Preview Not Available"]);

        ctl.open_offers();
        assert!(sink
            .events()
            .contains(&ViewEvent::OfferConfigPlaceholder(PLAN_PLACEHOLDER.into())));
    }

    #[tokio::test]
    async fn test_offers_preview_missing_and_empty_rows() {
        let api = Arc::new(FakeGateway::default().with_preview(StepKind::Offers, None));
        let (mut ctl, sink) = controller(api);
        through_opportunity(&mut ctl, &["DATA"], &["Upsell"]).await;
        ctl.preview_offers().await;
        assert_eq!(modals(&sink).pop().unwrap().title, "No Data Available");

        let api = Arc::new(FakeGateway::default().with_preview(StepKind::Offers, Some(vec![])));
        let (mut ctl, sink) = controller(api);
        through_opportunity(&mut ctl, &["DATA"], &["Upsell"]).await;
        ctl.preview_offers().await;
        assert_eq!(modals(&sink).pop().unwrap().title, "No Data");
        assert!(last_table(&sink).unwrap().1.is_empty());
    }

    #[tokio::test]
    async fn test_offers_preview_filters_by_opportunity_columns() {
        let api = Arc::new(FakeGateway::default().with_preview(
            StepKind::Offers,
            Some(vec![
                json!({"msisdn": "1", "opportunity_data": "upsell_data", "data_offer1": "A"}),
                json!({"msisdn": "2", "opportunity_data": "noaction_data", "data_offer1": "B"}),
            ]),
        ));
        let (mut ctl, sink) = controller(api);
        through_opportunity(&mut ctl, &["DATA"], &["Upsell"]).await;

        assert_eq!(ctl.preview_offers().await, Outcome::Completed);
        let (table, view) = last_table(&sink).unwrap();
        assert_eq!(table, TableId::Offers);
        assert_eq!(view.rows, vec![vec!["1", "upsell_data", "A"]]);
        assert!(toasts(&sink).contains(&"Showing 1 offers for DATA (Upsell)".to_string()));
    }

    #[tokio::test]
    async fn test_offers_preview_error_dialogs() {
        let api = Arc::new(FakeGateway::default());
        let (mut ctl, sink) = controller(api.clone());
        through_opportunity(&mut ctl, &["DATA"], &["Upsell"]).await;

        api.fail_previews(
            400,
            "Step 'offers' not available yet. Available steps: ['lifecycle']. Run the step first.",
        );
        assert_eq!(ctl.preview_offers().await, Outcome::Failed);
        api.fail_previews(404, "Session not found. Please upload again.");
        ctl.preview_offers().await;
        api.fail_previews(500, "boom");
        ctl.preview_offers().await;

        let titles: Vec<String> = modals(&sink).into_iter().map(|d| d.title).collect();
        assert_eq!(
            titles,
            vec!["Generate Offers First", "Session Expired", "Preview Error"]
        );
        assert_eq!(modals(&sink)[2].lines, vec!["boom"]);
    }

    #[tokio::test]
    async fn test_forecast_replaces_previous_charts() {
        let api = Arc::new(FakeGateway::default());
        let (mut ctl, sink) = controller(api);
        ctl.upload(csv()).await;
        ctl.run_forecast().await;
        ctl.run_forecast().await;

        assert_eq!(sink.count_where(|e| matches!(e, ViewEvent::ChartsCleared)), 1);
        assert_eq!(
            sink.count_where(|e| matches!(e, ViewEvent::ForecastRendered(_))),
            2
        );
        let view = ctl.state().forecast.clone().unwrap();
        assert_eq!(view.tiles[0].value, "$10.00M");
        assert_eq!(view.tiles[1].value, "—");
        assert!(ctl.state().navigator.is_nav_enabled(Step::ReviewLaunch));
    }

    #[tokio::test]
    async fn test_forecast_without_snapshot_uses_normalized_draft() {
        let api = Arc::new(FakeGateway::default());
        let (mut ctl, _sink) = controller(api.clone());
        ctl.upload(csv()).await;
        ctl.run_forecast().await;
        assert_eq!(
            api.forecast_lobs.lock().unwrap()[0],
            vec!["DATA", "VOICE", "VAS", "TOTAL_NETWORK"]
        );
    }

    #[tokio::test]
    async fn test_launch_download_and_publish() {
        let api = Arc::new(FakeGateway::default());
        let (mut ctl, sink) = controller(api.clone());
        through_opportunity(&mut ctl, &["DATA"], &["Upsell"]).await;

        assert_eq!(ctl.launch().await, Outcome::Completed);
        let summary = ctl.state().launch_summary.clone().unwrap();
        assert_eq!(summary["status"], "Approved");
        assert_eq!(summary["output_ready"], true);
        assert_eq!(summary["lobs_processed"], json!(["DATA"]));
        assert_eq!(summary["opportunities_processed"], json!(["Upsell"]));
        assert!(ctl.state().navigator.is_completed(Step::ReviewLaunch));
        assert!(ctl.state().navigator.is_control_enabled(Control::PublishApi));

        let url = ctl.download().unwrap();
        assert_eq!(
            url,
            "http://backend/api/download/0f8fad5b-d9cb-469f-a165-70867728950e"
        );

        ctl.set_publish_url("https://hooks.example/campaigns");
        assert_eq!(ctl.publish().await, Outcome::Completed);
        let request = api.published.lock().unwrap()[0].clone();
        assert_eq!(request.target, "NEON_DX");
        assert_eq!(request.mode, "api");
        assert_eq!(request.endpoint_url, "https://hooks.example/campaigns");
        assert!(toasts(&sink).contains(&"Published successfully ✅".to_string()));
    }

    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: serde::Serializer>(&self, _s: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("receipt cannot be encoded"))
        }
    }

    #[test]
    fn test_receipt_encoding_failure_is_an_error() {
        let err = receipt_json(&Unencodable).unwrap_err();
        assert!(matches!(err, WizardError::Serialization(_)));
        assert_eq!(receipt_json(&json!({"id": 1})).unwrap(), json!({"id": 1}));
    }

    #[test]
    fn test_offers_preview_error_classification() {
        assert_eq!(
            classify_offers_preview_error("Run it first").title,
            "Generate Offers First"
        );
        assert_eq!(
            classify_offers_preview_error("Session not found").title,
            "Session Expired"
        );
        assert_eq!(classify_offers_preview_error("x").title, "Preview Error");
    }
}
