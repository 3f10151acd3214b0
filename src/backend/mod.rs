pub mod http;

use crate::config::DatasetConfig;
use crate::models::{ChartDescriptor, DerivedColumn, FormulaCatalog, Kpi};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use http::HttpBackend;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PromptRequest {
    pub prompt: String,
    pub session_id: String,
    pub file_name: Option<String>,
}

/// Prompt response. Every field is optional on the wire.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct DashboardResponse {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub kpis: Option<Vec<Kpi>>,
    #[serde(default)]
    pub charts: Option<Vec<ChartDescriptor>>,
    #[serde(default)]
    pub chart_count: Option<u32>,
    #[serde(default)]
    pub kpi_count: Option<u32>,
    #[serde(default)]
    pub suggested_prompts: Option<Vec<String>>,
    #[serde(default)]
    pub project_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ExpressionRequest {
    pub formula: String,
    pub session_id: String,
    pub file_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CatalogRequest {
    pub report_type: String,
    pub report_id: String,
    pub file_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub service: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ReportFile {
    pub file_name: String,
    #[serde(default)]
    pub project_name: String,
}

/// Identity and dataset that every request of one dashboard view carries.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext {
    pub session_id: String,
    pub dataset: DatasetConfig,
}

impl RequestContext {
    pub fn expression_request(&self, formula: &str) -> ExpressionRequest {
        ExpressionRequest {
            formula: formula.to_string(),
            session_id: self.session_id.clone(),
            file_name: self.dataset.file_name.clone(),
        }
    }

    pub fn catalog_request(&self) -> CatalogRequest {
        CatalogRequest {
            report_type: self.dataset.report_type.clone(),
            report_id: self.dataset.report_id.clone(),
            file_name: self.dataset.file_name.clone(),
        }
    }
}

/// The analysis service the dashboard talks to.
///
/// Futures are not `Send`: the core runs on a single event loop.
#[async_trait(?Send)]
pub trait AnalysisBackend {
    async fn submit_prompt(&self, request: &PromptRequest) -> Result<DashboardResponse, BackendError>;

    async fn submit_expression(
        &self,
        request: &ExpressionRequest,
    ) -> Result<DerivedColumn, BackendError>;

    async fn fetch_formula_catalog(
        &self,
        request: &CatalogRequest,
    ) -> Result<FormulaCatalog, BackendError>;

    async fn health(&self) -> Result<HealthStatus, BackendError>;

    /// Files available for the configured report.
    async fn list_report_files(&self) -> Result<Vec<ReportFile>, BackendError>;
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
}

impl Serialize for BackendError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
