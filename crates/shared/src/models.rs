use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_ANALYSIS_TYPE_LABEL: &str = "General Website Analysis";
pub const DEFAULT_STATUS_LABEL: &str = "Complete";

/// Raw input collected by the submission form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisForm {
    pub url: String,
    pub analysis_type: String,
}

impl AnalysisForm {
    pub fn new(url: impl Into<String>, analysis_type: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            analysis_type: analysis_type.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub url: String,
    pub request_prompt: String,
    pub analysis_context: String,
    #[serde(rename = "geminiModel")]
    pub model: String,
}

impl AnalysisRequest {
    /// The analysis type doubles as prompt and context.
    pub fn from_form(form: &AnalysisForm, model: &str) -> Self {
        let analysis_type = form.analysis_type.trim().to_string();
        Self {
            url: form.url.trim().to_string(),
            request_prompt: analysis_type.clone(),
            analysis_context: analysis_type,
            model: model.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreatedAnalysis {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CreatedAnalysis {
    pub fn identifier(&self) -> Option<SessionHandle> {
        match self.id.as_ref()? {
            Value::String(id) => SessionHandle::new(id.as_str()),
            Value::Number(id) => SessionHandle::new(id.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub request_prompt: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub analysis_summary: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AnalysisResult {
    pub fn url(&self) -> &str {
        self.url.as_deref().unwrap_or_default()
    }

    pub fn analysis_type_label(&self) -> &str {
        non_blank(self.request_prompt.as_deref()).unwrap_or(DEFAULT_ANALYSIS_TYPE_LABEL)
    }

    pub fn status_label(&self) -> &str {
        non_blank(self.status.as_deref()).unwrap_or(DEFAULT_STATUS_LABEL)
    }

    pub fn summary(&self) -> Option<&str> {
        non_blank(self.analysis_summary.as_deref())
    }
}

/// One row of the analysis list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub request_prompt: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AnalysisSummary {
    pub fn id_label(&self) -> String {
        match &self.id {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => "-".to_string(),
        }
    }
}

/// Opaque lookup key linking a submission to its result. Never blank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionHandle(String);

impl SessionHandle {
    pub fn new(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}
