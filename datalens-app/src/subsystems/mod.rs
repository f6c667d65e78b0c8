pub mod chat;
pub mod docs;
pub mod ingestion;
pub mod session_gate;
pub mod table_registry;
pub mod view_router;

/// Severity of a status label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusLevel {
    #[default]
    Idle,
    Pending,
    Ready,
    Error,
}

/// A one-line, human-readable status with its severity.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusLine {
    pub text: String,
    pub level: StatusLevel,
}

impl StatusLine {
    pub fn new(text: impl Into<String>, level: StatusLevel) -> Self {
        Self {
            text: text.into(),
            level,
        }
    }
}
