// Hotkey bindings for controlling the detection loop
use super::types::AutomationCommand;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HotkeyAction {
    /// Start when stopped, stop when running
    ToggleBot,
    Start,
    Pause,
    Resume,
    Stop,
    RunOnce,
    ReloadTemplates,
    Shutdown,
}

impl HotkeyAction {
    /// Command to send for this action; `running` decides the toggle.
    pub fn command(self, running: bool) -> AutomationCommand {
        match self {
            HotkeyAction::ToggleBot if running => AutomationCommand::Stop,
            HotkeyAction::ToggleBot => AutomationCommand::Start,
            HotkeyAction::Start => AutomationCommand::Start,
            HotkeyAction::Pause => AutomationCommand::Pause,
            HotkeyAction::Resume => AutomationCommand::Resume,
            HotkeyAction::Stop => AutomationCommand::Stop,
            HotkeyAction::RunOnce => AutomationCommand::RunOnce,
            HotkeyAction::ReloadTemplates => AutomationCommand::ReloadTemplates,
            HotkeyAction::Shutdown => AutomationCommand::Shutdown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HotkeyAction::ToggleBot => "toggle_bot",
            HotkeyAction::Start => "start",
            HotkeyAction::Pause => "pause",
            HotkeyAction::Resume => "resume",
            HotkeyAction::Stop => "stop",
            HotkeyAction::RunOnce => "run_once",
            HotkeyAction::ReloadTemplates => "reload_templates",
            HotkeyAction::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for HotkeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HotkeyAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "toggle_bot" | "toggle" => Ok(HotkeyAction::ToggleBot),
            "start" => Ok(HotkeyAction::Start),
            "pause" => Ok(HotkeyAction::Pause),
            "resume" => Ok(HotkeyAction::Resume),
            "stop" => Ok(HotkeyAction::Stop),
            "run_once" => Ok(HotkeyAction::RunOnce),
            "reload_templates" | "reload" => Ok(HotkeyAction::ReloadTemplates),
            "shutdown" | "quit" => Ok(HotkeyAction::Shutdown),
            other => Err(format!("Unknown hotkey action: {}", other)),
        }
    }
}

/// Key name to action table, built from the `hotkeys` config map.
#[derive(Debug, Clone, Default)]
pub struct HotkeyMap {
    bindings: HashMap<String, HotkeyAction>,
}

impl HotkeyMap {
    /// Default bindings: F6 toggles, F7 pauses, F8 runs a single pass, F12 quits.
    pub fn with_defaults() -> Self {
        let mut map = Self::default();
        map.bind("F6", HotkeyAction::ToggleBot);
        map.bind("F7", HotkeyAction::Pause);
        map.bind("F8", HotkeyAction::RunOnce);
        map.bind("F12", HotkeyAction::Shutdown);
        map
    }

    /// Build from `key -> action name` pairs, skipping unknown actions.
    pub fn from_config(bindings: &HashMap<String, String>) -> Self {
        let mut map = Self::default();
        for (key, action) in bindings {
            match action.parse::<HotkeyAction>() {
                Ok(action) => map.bind(key, action),
                Err(e) => log::warn!("⚠️ Ignoring hotkey '{}': {}", key, e),
            }
        }
        map
    }

    pub fn bind(&mut self, key: &str, action: HotkeyAction) {
        self.bindings.insert(normalize_key(key), action);
    }

    pub fn action_for(&self, key: &str) -> Option<HotkeyAction> {
        self.bindings.get(&normalize_key(key)).copied()
    }

    /// Translate a key press into a loop command.
    pub fn dispatch(&self, key: &str, running: bool) -> Option<AutomationCommand> {
        let action = self.action_for(key)?;
        let command = action.command(running);
        log::debug!("⌨️ Hotkey {} -> {} ({:?})", key, action, command);
        Some(command)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().to_uppercase()
}
