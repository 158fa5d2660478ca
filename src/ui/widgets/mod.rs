//! TUI widgets.

mod notch;
mod notifications;
mod prompt;
mod status_bar;

pub use notch::{CellScale, Notch};
pub use notifications::render_notification;
pub use prompt::Prompt;
pub use status_bar::StatusBar;
