use serde::{Deserialize, Serialize};

/// `GET /full-docs` body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FullDocumentation {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub executive_summary: Option<String>,
    #[serde(default)]
    pub architecture_overview: Option<String>,
    #[serde(default)]
    pub data_quality_narrative: Option<String>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub key_entities: Vec<KeyEntity>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub business_utility: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyEntity {
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub description: String,
}
