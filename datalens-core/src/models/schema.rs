use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// `GET /schema` body: table name to its profile.
pub type SchemaMap = BTreeMap<String, TableSchema>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub row_count: u64,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub columns: Vec<ColumnDescriptor>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub potential_keys: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub name: String,
    #[serde(rename = "type", default, deserialize_with = "super::null_as_default")]
    pub data_type: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub null_count: u64,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub unique_count: u64,
}
