use serde::{Deserialize, Serialize};

/// `GET /summary/{table}` body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableAiSummary {
    #[serde(default)]
    pub classification: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub impact: Option<String>,
    #[serde(default)]
    pub risks: Option<String>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub important_columns: Vec<String>,
}
