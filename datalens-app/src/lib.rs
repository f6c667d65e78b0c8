pub mod app;
pub mod console;
pub mod dispatch;
pub mod interaction;
pub mod subsystems;

pub use app::App;
pub use dispatch::{handle_intent, Intent, Reply};
pub use interaction::{Interaction, ScriptedInteraction};
