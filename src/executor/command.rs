// Executor command vocabulary, decoded from JSON at the boundary
use super::error::{ExecutorError, ExecutorResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

/// One input instruction.
///
/// Wire form is an object tagged by `"cmd"`, e.g.
/// `{"cmd": "click", "x": 640, "y": 980, "button": "left"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum ExecutorCommand {
    Move {
        x: i32,
        y: i32,
    },
    Click {
        /// Move here first when given
        #[serde(default)]
        x: Option<i32>,
        #[serde(default)]
        y: Option<i32>,
        #[serde(default)]
        button: MouseButton,
        #[serde(default = "default_repeat")]
        repeat: u32,
        /// Pause between repeated clicks
        #[serde(default)]
        interval_ms: u64,
    },
    KeyPress {
        key: String,
        /// How long the key is held
        #[serde(default = "default_hold_ms")]
        duration_ms: u64,
    },
    Drag {
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        #[serde(default = "default_drag_ms")]
        duration_ms: u64,
        #[serde(default)]
        button: MouseButton,
    },
    Sequence {
        steps: Vec<ExecutorCommand>,
    },
    Wait {
        duration_ms: u64,
    },
}

fn default_repeat() -> u32 {
    1
}

fn default_hold_ms() -> u64 {
    50
}

fn default_drag_ms() -> u64 {
    300
}

/// Nested sequences deeper than this are rejected.
pub const MAX_SEQUENCE_DEPTH: usize = 8;

impl ExecutorCommand {
    /// Parse and validate a JSON command.
    pub fn decode(json: &str) -> ExecutorResult<Self> {
        let command: ExecutorCommand = serde_json::from_str(json)?;
        command.validate()?;
        Ok(command)
    }

    pub fn encode(&self) -> ExecutorResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Check arguments that the type system cannot.
    pub fn validate(&self) -> ExecutorResult<()> {
        self.validate_at(0)
    }

    fn validate_at(&self, depth: usize) -> ExecutorResult<()> {
        let invalid = |description: &str| {
            Err(ExecutorError::InvalidArgument {
                description: description.to_string(),
            })
        };
        match self {
            ExecutorCommand::Click { x, y, repeat, .. } => {
                if *repeat == 0 {
                    return invalid("click repeat must be at least 1");
                }
                if x.is_some() != y.is_some() {
                    return invalid("click needs both x and y, or neither");
                }
                Ok(())
            }
            ExecutorCommand::KeyPress { key, .. } if key.trim().is_empty() => invalid("key_press needs a key"),
            ExecutorCommand::Sequence { steps } => {
                if depth >= MAX_SEQUENCE_DEPTH {
                    return invalid("sequence nested too deeply");
                }
                steps.iter().try_for_each(|step| step.validate_at(depth + 1))
            }
            _ => Ok(()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExecutorCommand::Move { .. } => "move",
            ExecutorCommand::Click { .. } => "click",
            ExecutorCommand::KeyPress { .. } => "key_press",
            ExecutorCommand::Drag { .. } => "drag",
            ExecutorCommand::Sequence { .. } => "sequence",
            ExecutorCommand::Wait { .. } => "wait",
        }
    }
}

/// Outcome sent back across the boundary for every command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandReport {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandReport {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl ToString) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
        }
    }
}
