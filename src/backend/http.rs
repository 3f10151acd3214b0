use super::{
    AnalysisBackend, BackendError, CatalogRequest, DashboardResponse, ExpressionRequest,
    HealthStatus, PromptRequest, ReportFile,
};
use crate::config::DatasetConfig;
use crate::models::{DerivedColumn, FormulaCatalog};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    dataset: DatasetConfig,
}

/// FastAPI error body.
#[derive(Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, dataset: DatasetConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            dataset,
        }
    }

    fn report_url(&self, report_type: &str, report_id: &str, tail: &str) -> String {
        format!(
            "{}/reports/design/{}/detail/{}/{}",
            self.base_url, report_type, report_id, tail
        )
    }
}

async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, BackendError> {
    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let text = resp.text().await.unwrap_or_default();
        return Err(BackendError::Api {
            status,
            message: error_message(&text),
        });
    }

    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| BackendError::Parse(e.to_string()))
}

/// Prefer the `detail` field of an error body, fall back to the raw text.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: serde_json::Value::String(detail),
        }) => detail,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) => body.trim().to_string(),
    }
}

#[async_trait(?Send)]
impl AnalysisBackend for HttpBackend {
    async fn submit_prompt(&self, request: &PromptRequest) -> Result<DashboardResponse, BackendError> {
        let url = self.report_url(&self.dataset.report_type, &self.dataset.report_id, "chat");
        tracing::debug!(%url, session_id = %request.session_id, "submitting prompt");

        let resp = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;
        read_json(resp).await
    }

    async fn submit_expression(
        &self,
        request: &ExpressionRequest,
    ) -> Result<DerivedColumn, BackendError> {
        let url = self.report_url(
            &self.dataset.report_type,
            &self.dataset.report_id,
            "custom-column",
        );
        tracing::debug!(%url, formula = %request.formula, "submitting formula");

        let resp = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;
        read_json(resp).await
    }

    async fn fetch_formula_catalog(
        &self,
        request: &CatalogRequest,
    ) -> Result<FormulaCatalog, BackendError> {
        let url = self.report_url(
            &request.report_type,
            &request.report_id,
            "formula-suggestions",
        );

        let mut req = self.client.get(url);
        if let Some(file_name) = &request.file_name {
            req = req.query(&[("file_name", file_name)]);
        }

        let resp = req.send().await?;
        read_json(resp).await
    }

    async fn health(&self) -> Result<HealthStatus, BackendError> {
        let resp = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        read_json(resp).await
    }

    async fn list_report_files(&self) -> Result<Vec<ReportFile>, BackendError> {
        let url = self.report_url(&self.dataset.report_type, &self.dataset.report_id, "files");
        let resp = self.client.get(url).send().await?;
        read_json(resp).await
    }
}
