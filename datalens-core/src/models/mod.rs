//! Wire types for the analysis API.
//!
//! Every optional or list field defaults when absent or `null`, so a
//! partially populated payload decodes instead of failing.

use serde::{Deserialize, Deserializer};

pub mod chat;
pub mod dashboard;
pub mod docs;
pub mod quality;
pub mod schema;
pub mod summary;
pub mod upload;

pub use chat::{ChatAnswer, ChatRequest, OutlierReasoning, OutlierReasoningRequest};
pub use dashboard::{DashboardSummary, ProjectInfo};
pub use docs::{FullDocumentation, KeyEntity};
pub use quality::{QualityReport, SubScores};
pub use schema::{ColumnDescriptor, SchemaMap, TableSchema};
pub use summary::TableAiSummary;
pub use upload::{UploadFile, UploadResponse};

/// Treat an explicit `null` like a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_project_lists_decode_as_empty() {
        let summary: DashboardSummary = serde_json::from_value(json!({
            "total_tables": 3,
            "total_rows": 1200,
            "avg_trust_score": null,
            "project_info": { "title": "Retail", "value": null, "key_entities": null }
        }))
        .unwrap();

        assert_eq!(summary.total_tables, 3);
        assert_eq!(summary.avg_trust_score, 0.0);
        let info = summary.project_info.unwrap();
        assert_eq!(info.title.as_deref(), Some("Retail"));
        assert!(info.value.is_empty());
        assert!(info.key_entities.is_empty());
    }

    #[test]
    fn test_null_scores_and_issues_decode_as_defaults() {
        let report: QualityReport = serde_json::from_value(json!({
            "completeness": 90.0,
            "freshness": null,
            "trust_score": 72.5,
            "sub_scores": null,
            "issues": null
        }))
        .unwrap();

        assert_eq!(report.freshness, 0.0);
        assert_eq!(report.sub_scores, SubScores::default());
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_null_schema_and_docs_fields_decode_as_defaults() {
        let schema: SchemaMap = serde_json::from_value(json!({
            "orders": {
                "row_count": null,
                "columns": [{ "name": "id", "type": null, "null_count": null, "unique_count": 4 }],
                "potential_keys": null
            }
        }))
        .unwrap();
        let orders = &schema["orders"];
        assert_eq!(orders.row_count, 0);
        assert_eq!(orders.columns[0].data_type, "");
        assert!(orders.potential_keys.is_empty());

        let docs: FullDocumentation = serde_json::from_value(json!({
            "title": null,
            "key_entities": null,
            "business_utility": null
        }))
        .unwrap();
        assert!(docs.title.is_none());
        assert!(docs.key_entities.is_empty());
    }

    #[test]
    fn test_wrong_type_still_fails() {
        let result = serde_json::from_value::<DashboardSummary>(json!({ "total_tables": "three" }));
        assert!(result.is_err());
    }
}
