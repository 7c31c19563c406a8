//! `reqwest` implementation of [`ApiGateway`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use wizard_core::config::ApiConfig;
use wizard_core::types::SessionId;
use wizard_core::{WizardError, WizardResult};

use crate::gateway::ApiGateway;
use crate::models::{
    ErrorBody, ForecastPayload, PreviewPage, PublishReceipt, PublishRequest, StepAck, StepKind,
    StepPayload, StepRequest, UploadReceipt,
};

/// HTTP client for the campaign backend.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base: Url,
}

impl HttpGateway {
    pub fn new(config: &ApiConfig) -> WizardResult<Self> {
        let mut base = Url::parse(&config.base_url)
            .map_err(|e| WizardError::Config(format!("invalid api.base_url: {e}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let mut builder = Client::builder();
        if let Some(ms) = config.request_timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        let client = builder
            .build()
            .map_err(|e| WizardError::Config(format!("http client: {e}")))?;

        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> WizardResult<Url> {
        self.base
            .join(path)
            .map_err(|e| WizardError::Config(format!("bad endpoint {path}: {e}")))
    }
}

fn transport(e: reqwest::Error) -> WizardError {
    WizardError::Transport(e.to_string())
}

fn count_request(endpoint: &'static str) {
    metrics::counter!("wizard.api.requests", "endpoint" => endpoint).increment(1);
}

fn count_error(endpoint: &'static str) {
    metrics::counter!("wizard.api.errors", "endpoint" => endpoint).increment(1);
}

/// Error from a JSON `{detail}` body, or `fallback` when the body has none.
async fn detail_error(resp: Response, fallback: &str) -> WizardError {
    let status = resp.status().as_u16();
    let text = resp.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorBody>(&text).map(|b| b.detail) {
        Ok(Value::String(s)) if !s.is_empty() => s,
        Ok(Value::Null) | Ok(Value::String(_)) | Err(_) => fallback.to_string(),
        Ok(other) => other.to_string(),
    };
    WizardError::Api { status, message }
}

/// Error carrying the raw response body as its message.
async fn text_error(resp: Response) -> WizardError {
    let status = resp.status().as_u16();
    let message = resp.text().await.unwrap_or_default();
    WizardError::Api { status, message }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> WizardResult<T> {
    let text = resp.text().await.map_err(transport)?;
    Ok(serde_json::from_str(&text)?)
}

#[async_trait]
impl ApiGateway for HttpGateway {
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> WizardResult<UploadReceipt> {
        count_request("upload");
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("text/csv")
            .map_err(transport)?;
        let form = Form::new().part("file", part);

        debug!(file_name, "Uploading audience");
        let resp = self
            .client
            .post(self.endpoint("api/upload")?)
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;

        if !resp.status().is_success() {
            count_error("upload");
            return Err(text_error(resp).await);
        }
        decode(resp).await
    }

    async fn run_step(
        &self,
        session: &SessionId,
        step: StepKind,
        payload: &StepPayload,
    ) -> WizardResult<StepAck> {
        count_request("run_step");
        let body = StepRequest {
            session_id: session.as_str().to_string(),
            step: step.as_str().to_string(),
            payload: payload.clone(),
        };

        debug!(session_id = %session, %step, "Running step");
        let resp = self
            .client
            .post(self.endpoint("api/run_step")?)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        if !resp.status().is_success() {
            count_error("run_step");
            let err = detail_error(resp, "Step failed").await;
            warn!(session_id = %session, %step, error = %err, "Step rejected");
            return Err(err);
        }
        decode(resp).await
    }

    async fn preview(
        &self,
        session: &SessionId,
        step: StepKind,
        n: usize,
    ) -> WizardResult<PreviewPage> {
        count_request("preview");
        let url = self.endpoint(&format!("api/preview/{}", session.as_str()))?;
        let resp = self
            .client
            .get(url)
            .query(&[("step", step.as_str().to_string()), ("n", n.to_string())])
            .send()
            .await
            .map_err(transport)?;

        if !resp.status().is_success() {
            count_error("preview");
            return Err(detail_error(resp, "Preview failed").await);
        }
        decode(resp).await
    }

    async fn forecast(
        &self,
        session: &SessionId,
        lobs: &[String],
    ) -> WizardResult<ForecastPayload> {
        count_request("forecast");
        let resp = self
            .client
            .get(self.endpoint("api/impact_forecast")?)
            .query(&[
                ("session_id", session.as_str().to_string()),
                ("lobs", lobs.join(",")),
            ])
            .send()
            .await
            .map_err(transport)?;

        if !resp.status().is_success() {
            count_error("forecast");
            return Err(text_error(resp).await);
        }
        decode(resp).await
    }

    async fn publish(
        &self,
        session: &SessionId,
        request: &PublishRequest,
    ) -> WizardResult<PublishReceipt> {
        count_request("publish");
        let body = serde_json::json!({
            "session_id": session.as_str(),
            "target": request.target,
            "mode": request.mode,
            "endpoint_url": request.endpoint_url,
        });
        let resp = self
            .client
            .post(self.endpoint("api/publish")?)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        if !resp.status().is_success() {
            count_error("publish");
            return Err(text_error(resp).await);
        }
        decode(resp).await
    }

    fn download_url(&self, session: &SessionId) -> String {
        self.base
            .join(&format!("api/download/{}", session.as_str()))
            .map(|u| u.to_string())
            .unwrap_or_else(|_| format!("{}api/download/{}", self.base, session.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(base: &str) -> HttpGateway {
        HttpGateway::new(&ApiConfig {
            base_url: base.into(),
            ..ApiConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let gw = gateway("http://localhost:8000/campaign");
        assert_eq!(gw.base_url().as_str(), "http://localhost:8000/campaign/");
        assert_eq!(
            gw.download_url(&SessionId::new("abc")),
            "http://localhost:8000/campaign/api/download/abc"
        );
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let err = HttpGateway::new(&ApiConfig {
            base_url: "not a url".into(),
            ..ApiConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, WizardError::Config(_)));
    }
}
