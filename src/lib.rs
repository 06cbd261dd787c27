pub mod args;
pub mod capture;
pub mod config;
pub mod executor;
pub mod game_automation;
pub mod template_matching;

pub use config::BotConfig;
pub use game_automation::{GameAutomation, GameState};
pub use template_matching::{TemplateMatcher, TemplateStore};
