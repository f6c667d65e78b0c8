use std::sync::Arc;

use datalens_core::{ApiClient, DatalensConfig, DatalensError, IdentityProvider};

use crate::interaction::Interaction;
use crate::subsystems::chat::ChatSession;
use crate::subsystems::docs::DocumentationLoader;
use crate::subsystems::ingestion::IngestionCoordinator;
use crate::subsystems::session_gate::SessionGate;
use crate::subsystems::table_registry::TableRegistry;
use crate::subsystems::view_router::ViewRouter;

/// Every orchestrator, wired to one API client and one view router.
pub struct App {
    pub router: Arc<ViewRouter>,
    pub registry: Arc<TableRegistry>,
    pub gate: Arc<SessionGate>,
    pub ingestion: Arc<IngestionCoordinator>,
    pub chat: Arc<ChatSession>,
    pub docs: Arc<DocumentationLoader>,
}

impl App {
    pub fn new(
        api: ApiClient,
        provider: Arc<dyn IdentityProvider>,
        interaction: Arc<dyn Interaction>,
        config: &DatalensConfig,
    ) -> Self {
        let router = Arc::new(ViewRouter::new());
        let registry = Arc::new(TableRegistry::new(api.clone(), router.clone()));
        let chat = Arc::new(ChatSession::new(
            api.clone(),
            config.chat.fallback_message.clone(),
        ));
        let docs = Arc::new(DocumentationLoader::new(api.clone()));
        let ingestion = Arc::new(IngestionCoordinator::new(
            api.clone(),
            registry.clone(),
            interaction.clone(),
        ));
        let gate = Arc::new(SessionGate::new(
            api,
            provider,
            registry.clone(),
            chat.clone(),
            interaction,
            config.bootstrap.clone(),
        ));

        Self {
            router,
            registry,
            gate,
            ingestion,
            chat,
            docs,
        }
    }

    pub fn from_config(
        config: &DatalensConfig,
        provider: Arc<dyn IdentityProvider>,
        interaction: Arc<dyn Interaction>,
    ) -> Result<Self, DatalensError> {
        let api = ApiClient::new(&config.api)?;
        tracing::info!(base_url = %api.base_url(), "Analysis API client ready");
        Ok(Self::new(api, provider, interaction, config))
    }
}
