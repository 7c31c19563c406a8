//! The boundary between the wizard and the campaign backend.

use async_trait::async_trait;

use wizard_core::types::SessionId;
use wizard_core::WizardResult;

use crate::models::{
    ForecastPayload, PreviewPage, PublishReceipt, PublishRequest, StepAck, StepKind, StepPayload,
    UploadReceipt,
};

/// Thin wrappers over the six REST endpoints. Implementations report
/// non-success responses as `WizardError::Api` with the best-effort message
/// already extracted from the body.
#[async_trait]
pub trait ApiGateway: Send + Sync {
    /// `POST /api/upload` (multipart, field `file`).
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> WizardResult<UploadReceipt>;

    /// `POST /api/run_step` with `{session_id, step, ...payload}`.
    async fn run_step(
        &self,
        session: &SessionId,
        step: StepKind,
        payload: &StepPayload,
    ) -> WizardResult<StepAck>;

    /// `GET /api/preview/{session_id}?step=&n=`.
    async fn preview(
        &self,
        session: &SessionId,
        step: StepKind,
        n: usize,
    ) -> WizardResult<PreviewPage>;

    /// `GET /api/impact_forecast?session_id=&lobs=` with LOBs comma-joined.
    async fn forecast(&self, session: &SessionId, lobs: &[String])
        -> WizardResult<ForecastPayload>;

    /// `POST /api/publish`.
    async fn publish(
        &self,
        session: &SessionId,
        request: &PublishRequest,
    ) -> WizardResult<PublishReceipt>;

    /// Location of `GET /api/download/{session_id}`; the caller opens it.
    fn download_url(&self, session: &SessionId) -> String;
}
