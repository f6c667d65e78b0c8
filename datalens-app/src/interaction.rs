//! User-facing prompts that sit outside the view model: confirmations and
//! one-shot alerts.

use std::sync::Mutex;

use async_trait::async_trait;

#[async_trait]
pub trait Interaction: Send + Sync {
    /// Ask the user a yes/no question.
    async fn confirm(&self, prompt: &str) -> bool;

    /// Show a transient message.
    fn alert(&self, message: &str);
}

/// Answers every confirmation with a fixed value and records alerts.
/// Used by tests and non-interactive runs.
pub struct ScriptedInteraction {
    answer: bool,
    alerts: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedInteraction {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            alerts: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn alerts(&self) -> Vec<String> {
        self.alerts.lock().map(|a| a.clone()).unwrap_or_default()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Interaction for ScriptedInteraction {
    async fn confirm(&self, prompt: &str) -> bool {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        self.answer
    }

    fn alert(&self, message: &str) {
        tracing::info!(message = %message, "Alert");
        if let Ok(mut alerts) = self.alerts.lock() {
            alerts.push(message.to_string());
        }
    }
}
