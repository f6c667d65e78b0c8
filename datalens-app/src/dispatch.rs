//! Dispatch table: every user gesture arrives as an [`Intent`] and is routed
//! to exactly one orchestrator operation.

use datalens_core::models::UploadFile;

use crate::app::App;
use crate::subsystems::ingestion::UploadOutcome;
use crate::subsystems::session_gate::{SignInMethod, SignOutOutcome};
use crate::subsystems::table_registry::Load;
use crate::subsystems::view_router::{Pane, View};

#[derive(Debug, Clone)]
pub enum Intent {
    SignIn { email: String, password: String },
    SignUp { email: String, password: String },
    SignInWithPopup,
    ContinueAsGuest,
    SignOut { keep_remote_data: bool },
    /// Clear server-held data but stay signed in.
    ExitSession,
    Upload { files: Vec<UploadFile>, append: bool },
    ShowDashboard,
    ShowDocumentation,
    SelectTable(String),
    GenerateSummary,
    /// Explain outliers in `column` of the selected table.
    ExplainOutlier { column: String },
    /// Explain the `index`-th issue of the selected table's quality report.
    ExplainIssue { index: usize },
    Ask(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Done,
    Ignored(&'static str),
    Failed(String),
    Upload(UploadOutcome),
    SignOut(SignOutOutcome),
    Answer(String),
    Reason(Load<String>),
}

pub async fn handle_intent(app: &App, intent: Intent) -> Reply {
    tracing::debug!(intent = ?intent, "Dispatching intent");

    match intent {
        Intent::SignIn { email, password } => {
            auth_reply(app, SignInMethod::Password { email, password }).await
        }
        Intent::SignUp { email, password } => {
            auth_reply(app, SignInMethod::SignUp { email, password }).await
        }
        Intent::SignInWithPopup => auth_reply(app, SignInMethod::Popup).await,
        Intent::ContinueAsGuest => {
            app.gate.continue_as_guest();
            Reply::Done
        }
        Intent::SignOut { keep_remote_data } => {
            Reply::SignOut(app.gate.sign_out(keep_remote_data).await)
        }
        Intent::ExitSession => {
            if app.gate.reset_session(false).await {
                app.registry.navigate(View::Landing);
                Reply::Done
            } else {
                Reply::Ignored("session kept")
            }
        }
        Intent::Upload { files, append } => {
            Reply::Upload(app.ingestion.upload(files, append).await)
        }
        Intent::ShowDashboard => {
            if !in_application(app) {
                return Reply::Ignored("not in the application view");
            }
            app.registry.navigate(View::Application(Pane::Dashboard));
            Reply::Done
        }
        Intent::ShowDocumentation => {
            if !in_application(app) {
                return Reply::Ignored("not in the application view");
            }
            app.registry.navigate(View::Application(Pane::Documentation));
            app.docs.load().await;
            Reply::Done
        }
        Intent::SelectTable(name) => {
            if !in_application(app) {
                return Reply::Ignored("not in the application view");
            }
            app.registry.select_table(&name).await;
            Reply::Done
        }
        Intent::GenerateSummary => {
            if app.registry.generate_summary().await {
                Reply::Done
            } else {
                Reply::Ignored("no table selected")
            }
        }
        Intent::ExplainOutlier { column } => match app.registry.selected_table() {
            Some(table) => Reply::Reason(app.registry.explain_outlier(&table, &column).await),
            None => Reply::Ignored("no table selected"),
        },
        Intent::ExplainIssue { index } => explain_issue(app, index).await,
        Intent::Ask(question) => match app.chat.ask(&question).await {
            Some(answer) => Reply::Answer(answer),
            None => Reply::Ignored("empty question"),
        },
    }
}

fn in_application(app: &App) -> bool {
    app.router.current().is_some_and(View::is_application)
}

async fn auth_reply(app: &App, method: SignInMethod) -> Reply {
    match app.gate.sign_in(method).await {
        Ok(()) => Reply::Done,
        Err(e) => Reply::Failed(e.to_string()),
    }
}

async fn explain_issue(app: &App, index: usize) -> Reply {
    let Some(detail) = app.registry.detail() else {
        return Reply::Ignored("no table selected");
    };
    let Some(issue) = detail
        .quality
        .ready()
        .and_then(|q| q.issues.get(index))
        .map(|i| i.text.clone())
    else {
        return Reply::Ignored("no such issue");
    };

    match app.registry.explain_outlier_issue(&detail.table, &issue).await {
        Some(reason) => Reply::Reason(reason),
        None => Reply::Ignored("issue is not an outlier"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::ScriptedInteraction;
    use datalens_core::{ApiClient, DatalensConfig, LocalIdentityProvider};
    use std::sync::Arc;

    fn offline_app() -> App {
        App::new(
            ApiClient::with_base_url("http://127.0.0.1:9/api").unwrap(),
            Arc::new(LocalIdentityProvider::new()),
            Arc::new(ScriptedInteraction::new(true)),
            &DatalensConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_navigation_ignored_outside_application() {
        let app = offline_app();
        app.router.show(View::Landing);

        let reply = handle_intent(&app, Intent::SelectTable("orders".into())).await;

        assert!(matches!(reply, Reply::Ignored(_)));
        assert_eq!(app.router.current(), Some(View::Landing));
        assert!(app.registry.selected_table().is_none());
    }

    #[tokio::test]
    async fn test_guest_lands_on_landing() {
        let app = offline_app();

        assert_eq!(handle_intent(&app, Intent::ContinueAsGuest).await, Reply::Done);
        assert_eq!(app.router.current(), Some(View::Landing));
    }

    #[tokio::test]
    async fn test_summary_without_selection_is_ignored() {
        let app = offline_app();

        let reply = handle_intent(&app, Intent::GenerateSummary).await;

        assert_eq!(reply, Reply::Ignored("no table selected"));
    }

    #[tokio::test]
    async fn test_failed_sign_in_reports_provider_text() {
        let app = offline_app();

        let reply = handle_intent(
            &app,
            Intent::SignUp {
                email: "not-an-email".into(),
                password: "secret123".into(),
            },
        )
        .await;

        match reply {
            Reply::Failed(text) => assert!(text.contains("auth/invalid-email")),
            other => panic!("Expected Failed, got {:?}", other),
        }
        assert!(app.gate.auth_error().is_some());
    }
}
