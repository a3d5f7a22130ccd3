//! HTTP surface: health, on-demand reports and chat-style commands.

mod commands;
mod dto;
mod routes;
mod state;

pub use commands::{BUTTON_NOW, BUTTON_TOMORROW, Command};
pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::AppState;
