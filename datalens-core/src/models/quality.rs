use serde::{Deserialize, Serialize};

/// `GET /quality/{table}` body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub completeness: f64,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub freshness: f64,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub trust_score: f64,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub sub_scores: SubScores,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub identifier_health: f64,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub fk_integrity: f64,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub numeric_sanity: f64,
}
