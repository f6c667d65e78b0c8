//! Documentation loader: the full narrative report for the documentation pane.
//!
//! Loaded fresh on every visit; nothing is cached between visits.

use datalens_core::models::{FullDocumentation, KeyEntity};
use datalens_core::ApiClient;
use tokio::sync::watch;

const DEFAULT_TITLE: &str = "Dataset Documentation Report";
const NO_SUMMARY: &str = "No summary available.";
const NO_ARCHITECTURE: &str = "No architecture details available.";
const NO_QUALITY: &str = "No quality assessment available.";
const LOAD_FAILED: &str = "Failed to load documentation. Please try again later.";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentationReport {
    pub title: String,
    pub executive_summary: String,
    pub architecture_overview: String,
    pub data_quality_narrative: String,
    pub key_entities: Vec<KeyEntity>,
    pub business_utility: Vec<String>,
}

impl DocumentationReport {
    /// Only the summary carries the failure text; the rest stays empty.
    fn failed() -> Self {
        Self {
            executive_summary: LOAD_FAILED.to_string(),
            ..Self::default()
        }
    }
}

impl From<FullDocumentation> for DocumentationReport {
    fn from(doc: FullDocumentation) -> Self {
        fn or(value: Option<String>, fallback: &str) -> String {
            value
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| fallback.to_string())
        }

        Self {
            title: or(doc.title, DEFAULT_TITLE),
            executive_summary: or(doc.executive_summary, NO_SUMMARY),
            architecture_overview: or(doc.architecture_overview, NO_ARCHITECTURE),
            data_quality_narrative: or(doc.data_quality_narrative, NO_QUALITY),
            key_entities: doc.key_entities,
            business_utility: doc.business_utility,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum DocumentationState {
    #[default]
    Idle,
    Loading,
    Ready(DocumentationReport),
    Failed(DocumentationReport),
}

impl DocumentationState {
    pub fn report(&self) -> Option<&DocumentationReport> {
        match self {
            DocumentationState::Ready(r) | DocumentationState::Failed(r) => Some(r),
            DocumentationState::Idle | DocumentationState::Loading => None,
        }
    }
}

pub struct DocumentationLoader {
    api: ApiClient,
    state: watch::Sender<DocumentationState>,
}

impl DocumentationLoader {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: watch::channel(DocumentationState::Idle).0,
        }
    }

    pub fn state(&self) -> DocumentationState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DocumentationState> {
        self.state.subscribe()
    }

    pub async fn load(&self) -> DocumentationState {
        self.state.send_replace(DocumentationState::Loading);

        let next = match self.api.full_docs().await {
            Ok(doc) => DocumentationState::Ready(doc.into()),
            Err(e) => {
                tracing::error!(error = %e, "Full documentation load failed");
                DocumentationState::Failed(DocumentationReport::failed())
            }
        };
        self.state.send_replace(next.clone());
        next
    }
}
