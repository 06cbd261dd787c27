// Types and enums for game automation
use super::match_image::SlotStatuses;
use crate::template_matching::{DetectionError, RodStatus};
use serde::Serialize;
use std::fmt;
use std::time::{Duration, SystemTime};

/// Run state of the detection loop itself (not the game).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoopState {
    Idle,
    Running,
    Paused,
}

#[derive(Debug, Clone)]
pub enum AutomationCommand {
    Start,
    Pause,
    Resume,
    Stop,
    RunOnce,             // Single capture-detect pass, even while stopped
    UpdateRate(f32),     // passes per second
    ReloadTemplates,     // Rescan the template directory
    Shutdown,
}

#[derive(Debug, Clone)]
pub enum AutomationEvent {
    LoopStateChanged(LoopState),
    SlotsUpdated(SlotStatuses),
    InterfaceChanged { inventory_open: bool, chest_open: bool },
    FishCaught { total: u64 },
    PassFailed(DetectionError),
    TemplatesReloaded(Vec<String>),
    RateUpdated(f32),
    Error(String),
}

/// What the player is doing in the game, as far as the bot can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    #[default]
    Idle,
    Fishing,
    InventoryOpen,
    ChestOpen,
    Feeding,
    Maintenance,
    Error,
}

impl GameMode {
    /// Actions that conflict with this mode.
    pub fn blocked_actions(self) -> &'static [BotAction] {
        use BotAction::*;
        match self {
            GameMode::Idle => &[],
            GameMode::Fishing => &[OpenChest, Feed],
            GameMode::InventoryOpen => &[Fish, OpenChest, Feed],
            GameMode::ChestOpen => &[Fish, OpenInventory, Feed],
            GameMode::Feeding => &[Fish, OpenInventory, OpenChest],
            GameMode::Maintenance => &[Fish, Feed],
            GameMode::Error => &[Fish, OpenChest, Feed],
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GameMode::Idle => "idle",
            GameMode::Fishing => "fishing",
            GameMode::InventoryOpen => "inventory_open",
            GameMode::ChestOpen => "chest_open",
            GameMode::Feeding => "feeding",
            GameMode::Maintenance => "maintenance",
            GameMode::Error => "error",
        };
        f.write_str(s)
    }
}

/// Logical actions gated by the current mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BotAction {
    Fish,
    OpenInventory,
    OpenChest,
    Feed,
    ReplaceRod,
}

impl BotAction {
    /// Mode the game enters when this action is carried out.
    pub fn target_mode(self) -> GameMode {
        match self {
            BotAction::Fish => GameMode::Fishing,
            BotAction::OpenInventory => GameMode::InventoryOpen,
            BotAction::OpenChest => GameMode::ChestOpen,
            BotAction::Feed => GameMode::Feeding,
            BotAction::ReplaceRod => GameMode::Maintenance,
        }
    }

    /// Inverse of [`target_mode`](Self::target_mode); idle and error have no action.
    pub fn for_mode(mode: GameMode) -> Option<Self> {
        match mode {
            GameMode::Fishing => Some(BotAction::Fish),
            GameMode::InventoryOpen => Some(BotAction::OpenInventory),
            GameMode::ChestOpen => Some(BotAction::OpenChest),
            GameMode::Feeding => Some(BotAction::Feed),
            GameMode::Maintenance => Some(BotAction::ReplaceRod),
            GameMode::Idle | GameMode::Error => None,
        }
    }
}

/// Tracked information about one rod slot.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RodInfo {
    pub status: RodStatus,
    pub uses_remaining: u32,
    pub bait_type: Option<String>,
    pub last_check: Option<SystemTime>,
}

/// Result of consuming one use of a rod.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RodUse {
    /// Use consumed, rod still has uses left
    Used { remaining: u32 },
    /// This call consumed the last use; the slot is now empty
    Depleted,
    /// Nothing left to consume
    Unavailable,
}

/// Counters for the current bot session. Not persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStats {
    pub fish_caught: u64,
    pub casts: u64,
    pub rods_depleted: u64,
    pub mode_changes: u64,
    pub detection_passes: u64,
    pub detection_failures: u64,
    pub started_at: SystemTime,
    pub last_catch_at: Option<SystemTime>,
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            fish_caught: 0,
            casts: 0,
            rods_depleted: 0,
            mode_changes: 0,
            detection_passes: 0,
            detection_failures: 0,
            started_at: SystemTime::now(),
            last_catch_at: None,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed().unwrap_or_default()
    }

    /// Catches per hour since the session started
    pub fn catch_rate(&self) -> f64 {
        let hours = self.elapsed().as_secs_f64() / 3600.0;
        if hours <= 0.0 {
            0.0
        } else {
            self.fish_caught as f64 / hours
        }
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the game state for display or logging.
#[derive(Debug, Clone, Serialize)]
pub struct GameSnapshot {
    pub current_mode: GameMode,
    pub previous_mode: GameMode,
    pub rods: Vec<RodInfo>,
    pub inventory_open: bool,
    pub chest_open: bool,
    pub feeding_active: bool,
    pub stats: SessionStats,
}
