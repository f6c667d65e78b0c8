use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub question: &'a str,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatAnswer {
    #[serde(default)]
    pub answer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierReasoningRequest {
    pub table_name: String,
    pub column_name: String,
    pub row_index: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutlierReasoning {
    #[serde(default)]
    pub reason: Option<String>,
}
