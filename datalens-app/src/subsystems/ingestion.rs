//! Ingestion coordinator: drives dataset uploads.
//!
//! Status is `Idle` until the first upload and afterwards exactly one of
//! `Pending`, `Ready` or `Error`. A successful upload refreshes the registry
//! and lands on the dashboard; a failed one leaves the view alone. Either way
//! the backend's message, when it sends one, is shown as an alert.

use std::sync::Arc;

use datalens_core::models::UploadFile;
use datalens_core::ApiClient;
use tokio::sync::watch;

use super::table_registry::TableRegistry;
use super::view_router::{Pane, View};
use super::{StatusLevel, StatusLine};
use crate::interaction::Interaction;

const GENERIC_FAILURE: &str = "Failed to process files.";
const TRANSPORT_FAILURE: &str = "An error occurred during upload.";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UploadStatus {
    #[default]
    Idle,
    Pending { append: bool },
    Ready,
    /// `transport` distinguishes "could not reach the backend" from a
    /// rejected upload.
    Error { transport: bool },
}

impl UploadStatus {
    pub fn status_line(&self) -> StatusLine {
        match self {
            UploadStatus::Idle => StatusLine::default(),
            UploadStatus::Pending { append: true } => {
                StatusLine::new("Appending Data...", StatusLevel::Pending)
            }
            UploadStatus::Pending { append: false } => {
                StatusLine::new("Uploading & Processing...", StatusLevel::Pending)
            }
            UploadStatus::Ready => StatusLine::new("Upload Success", StatusLevel::Ready),
            UploadStatus::Error { transport: false } => {
                StatusLine::new("Upload Failed", StatusLevel::Error)
            }
            UploadStatus::Error { transport: true } => {
                StatusLine::new("Upload Error", StatusLevel::Error)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Nothing was selected.
    Skipped,
    Succeeded { table_count: Option<u64> },
    Failed { message: String },
}

pub struct IngestionCoordinator {
    api: ApiClient,
    registry: Arc<TableRegistry>,
    interaction: Arc<dyn Interaction>,
    status: watch::Sender<UploadStatus>,
    selection: watch::Sender<Vec<UploadFile>>,
}

impl IngestionCoordinator {
    pub fn new(
        api: ApiClient,
        registry: Arc<TableRegistry>,
        interaction: Arc<dyn Interaction>,
    ) -> Self {
        Self {
            api,
            registry,
            interaction,
            status: watch::channel(UploadStatus::Idle).0,
            selection: watch::channel(Vec::new()).0,
        }
    }

    pub fn status(&self) -> UploadStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<UploadStatus> {
        self.status.subscribe()
    }

    /// Files currently held by the picker; empty once an upload completes.
    pub fn pending_selection(&self) -> Vec<UploadFile> {
        self.selection.borrow().clone()
    }

    /// Upload `files`. `append = false` asks the backend to replace what it
    /// holds; `append = true` merges.
    pub async fn upload(&self, files: Vec<UploadFile>, append: bool) -> UploadOutcome {
        if files.is_empty() {
            return UploadOutcome::Skipped;
        }

        tracing::info!(files = files.len(), append, "Uploading dataset");
        self.selection.send_replace(files.clone());
        self.status.send_replace(UploadStatus::Pending { append });

        let outcome = match self.api.upload(&files, append).await {
            Ok(response) => {
                tracing::info!(
                    table_count = ?response.table_count,
                    tables = ?response.tables,
                    "Upload accepted"
                );
                self.status.send_replace(UploadStatus::Ready);
                if let Some(message) = response.message.as_deref().filter(|m| !m.is_empty()) {
                    self.interaction.alert(message);
                }
                if let Some(count) = response.table_count {
                    self.registry.publish_total_tables(count);
                }
                self.registry.navigate(View::Application(Pane::Dashboard));
                self.registry.refresh_all().await;
                UploadOutcome::Succeeded {
                    table_count: response.table_count,
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Upload failed");
                let transport = e.is_transport();
                self.status.send_replace(UploadStatus::Error { transport });
                let message = match e.backend_message() {
                    Some(m) => m.to_string(),
                    None if transport => TRANSPORT_FAILURE.to_string(),
                    None => GENERIC_FAILURE.to_string(),
                };
                self.interaction.alert(&message);
                UploadOutcome::Failed { message }
            }
        };

        self.selection.send_replace(Vec::new());
        outcome
    }
}
