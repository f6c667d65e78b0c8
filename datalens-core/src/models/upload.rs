use bytes::Bytes;
use serde::Deserialize;

/// One file of a multipart upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub name: String,
    pub content: Bytes,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// `POST /upload` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub table_count: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub tables: Vec<String>,
}
