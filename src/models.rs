use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Chart kinds the analysis backend can emit. Anything else lands in `Other`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    #[default]
    Bar,
    Line,
    Pie,
    Scatter,
    Area,
    Radar,
    Heatmap,
    Gauge,
    Funnel,
    Treemap,
    Boxplot,
    Histogram,
    Forecast,
    #[serde(other)]
    Other,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChartDescriptor {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    #[serde(rename = "type", default)]
    pub chart_type: ChartType,
    /// Engine options, passed through untouched apart from the theme overlay.
    #[serde(rename = "option", alias = "render_config", default)]
    pub render_config: Value,
}

impl ChartDescriptor {
    pub fn new(id: impl Into<String>, chart_type: ChartType, render_config: Value) -> Self {
        Self {
            id: id.into(),
            chart_type,
            render_config,
        }
    }

    pub fn layout_key(&self) -> String {
        format!("chart-{}", self.id)
    }

    /// Title text from the render config, if the backend set one.
    pub fn title(&self) -> Option<&str> {
        self.render_config
            .get("title")
            .and_then(|t| t.get("text"))
            .and_then(Value::as_str)
    }
}

/// Ids are opaque; the backend sends them as strings or bare numbers.
fn opaque_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "chart id must be a string or number, got {}",
            other
        ))),
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum KpiValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for KpiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KpiValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            KpiValue::Number(n) => write!(f, "{:.2}", n),
            KpiValue::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Kpi {
    pub name: String,
    #[serde(default)]
    pub value: Option<KpiValue>,
}

impl Kpi {
    pub fn display_value(&self) -> String {
        self.value
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "n/a".to_string())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ColumnCatalog {
    #[serde(default)]
    pub datetime: Vec<String>,
    #[serde(default)]
    pub numeric: Vec<String>,
    #[serde(default)]
    pub categorical: Vec<String>,
}

impl ColumnCatalog {
    pub fn is_datetime(&self, name: &str) -> bool {
        self.datetime.iter().any(|c| c == name)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FormulaSuggestion {
    pub name: String,
    pub formula: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct FormulaCatalog {
    #[serde(default)]
    pub suggestions: Vec<FormulaSuggestion>,
    #[serde(default)]
    pub columns: ColumnCatalog,
}

/// A column the backend accepted into the dataset.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DerivedColumn {
    #[serde(rename = "column_name")]
    pub name: String,
    pub total_rows: u64,
    #[serde(default)]
    pub sample_values: Vec<Value>,
}
