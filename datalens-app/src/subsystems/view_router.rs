//! View router: the finite state machine over screens and panes.
//!
//! The active view is a single enum value held in a `watch` channel, so at most
//! one outer view is ever active, and `Application` always carries exactly one
//! pane. `show` is the only transition; re-showing the active view does not
//! notify subscribers.

use tokio::sync::watch;

/// Sub-view of the application screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pane {
    Dashboard,
    TableDetail,
    Documentation,
}

/// Outer screen; `Application` carries its active pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Auth,
    Landing,
    Application(Pane),
}

/// Renderable regions, used to derive visibility from the active view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
    AuthScreen,
    LandingScreen,
    AppContainer,
    DashboardPane,
    TableDetailPane,
    DocumentationPane,
    ChatToggle,
}

impl Surface {
    pub const ALL: [Surface; 7] = [
        Surface::AuthScreen,
        Surface::LandingScreen,
        Surface::AppContainer,
        Surface::DashboardPane,
        Surface::TableDetailPane,
        Surface::DocumentationPane,
        Surface::ChatToggle,
    ];
}

impl View {
    pub fn pane(self) -> Option<Pane> {
        match self {
            View::Application(pane) => Some(pane),
            View::Auth | View::Landing => None,
        }
    }

    pub fn is_application(self) -> bool {
        matches!(self, View::Application(_))
    }

    pub fn is_visible(self, surface: Surface) -> bool {
        match surface {
            Surface::AuthScreen => self == View::Auth,
            Surface::LandingScreen => self == View::Landing,
            Surface::AppContainer | Surface::ChatToggle => self.is_application(),
            Surface::DashboardPane => self.pane() == Some(Pane::Dashboard),
            Surface::TableDetailPane => self.pane() == Some(Pane::TableDetail),
            Surface::DocumentationPane => self.pane() == Some(Pane::Documentation),
        }
    }

    pub fn visible_surfaces(self) -> Vec<Surface> {
        Surface::ALL
            .into_iter()
            .filter(|s| self.is_visible(*s))
            .collect()
    }
}

pub struct ViewRouter {
    current: watch::Sender<Option<View>>,
}

impl Default for ViewRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewRouter {
    /// No view is active until the first `show`.
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self { current }
    }

    /// Activate `target`, deactivating everything else. Returns `false` when
    /// `target` was already active (nothing changes, nobody is notified).
    pub fn show(&self, target: View) -> bool {
        let changed = self.current.send_if_modified(|current| {
            if *current == Some(target) {
                return false;
            }
            *current = Some(target);
            true
        });
        if changed {
            tracing::debug!(view = ?target, "View changed");
        }
        changed
    }

    pub fn current(&self) -> Option<View> {
        *self.current.borrow()
    }

    pub fn active_pane(&self) -> Option<Pane> {
        self.current().and_then(View::pane)
    }

    pub fn is_active(&self, view: View) -> bool {
        self.current() == Some(view)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<View>> {
        self.current.subscribe()
    }
}
