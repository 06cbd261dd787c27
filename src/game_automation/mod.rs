// Game automation module
// Rod detection, the shared game state and the background loop that keeps the
// state in sync with what is on screen.

pub mod channels;
pub mod fsm;
pub mod game_state;
pub mod hotkeys;
pub mod match_image;
pub mod probe;
pub mod types;

// Re-export the main types and functions for easy access
pub use channels::create_automation_channels;
pub use fsm::GameAutomation;
pub use game_state::{GameState, ModeObserver, ObserverId, StateError, StateResult};
pub use hotkeys::{HotkeyAction, HotkeyMap};
pub use match_image::{DetectionPass, MatchConfig, MultiDetector, SlotLayout, SlotStatuses};
pub use probe::{InterfaceSnapshot, InterfaceTemplates, StateProbe};
pub use types::{
    AutomationCommand, AutomationEvent, BotAction, GameMode, GameSnapshot, LoopState, RodInfo,
    RodUse, SessionStats,
};
