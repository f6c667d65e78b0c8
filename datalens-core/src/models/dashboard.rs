use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub total_tables: u64,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub total_rows: u64,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub avg_trust_score: f64,
    #[serde(default)]
    pub project_info: Option<ProjectInfo>,
}

/// AI-generated project narrative attached to the dashboard summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub dataset_context: Option<String>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub value: Vec<String>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub key_entities: Vec<String>,
}
