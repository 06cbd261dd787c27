// Input driver backed by enigo
use super::command::MouseButton;
use super::driver::InputDriver;
use super::error::{ExecutorError, ExecutorResult};
use enigo::{Button, Coordinate, Direction, Enigo, Key, Keyboard, Mouse, Settings};

pub struct EnigoDriver {
    enigo: Enigo,
}

impl EnigoDriver {
    pub fn new() -> ExecutorResult<Self> {
        let enigo = Enigo::new(&Settings::default()).map_err(|e| ExecutorError::Unavailable {
            description: e.to_string(),
        })?;
        log::debug!("🖱️ Input driver initialized");
        Ok(Self { enigo })
    }
}

fn driver_error(e: enigo::InputError) -> ExecutorError {
    ExecutorError::DriverFailed {
        description: e.to_string(),
    }
}

fn direction(pressed: bool) -> Direction {
    if pressed { Direction::Press } else { Direction::Release }
}

/// Map a key name from the command vocabulary to an enigo key.
fn parse_key(name: &str) -> ExecutorResult<Key> {
    let lower = name.trim().to_lowercase();
    let key = match lower.as_str() {
        "space" => Key::Space,
        "enter" | "return" => Key::Return,
        "escape" | "esc" => Key::Escape,
        "tab" => Key::Tab,
        "backspace" => Key::Backspace,
        "shift" => Key::Shift,
        "ctrl" | "control" => Key::Control,
        "alt" => Key::Alt,
        "up" => Key::UpArrow,
        "down" => Key::DownArrow,
        "left" => Key::LeftArrow,
        "right" => Key::RightArrow,
        "f1" => Key::F1,
        "f2" => Key::F2,
        "f3" => Key::F3,
        "f4" => Key::F4,
        "f5" => Key::F5,
        "f6" => Key::F6,
        "f7" => Key::F7,
        "f8" => Key::F8,
        "f9" => Key::F9,
        "f10" => Key::F10,
        "f11" => Key::F11,
        "f12" => Key::F12,
        other => {
            let mut chars = other.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Key::Unicode(c),
                _ => {
                    return Err(ExecutorError::UnknownKey {
                        key: name.to_string(),
                    });
                }
            }
        }
    };
    Ok(key)
}

impl InputDriver for EnigoDriver {
    fn move_to(&mut self, x: i32, y: i32) -> ExecutorResult<()> {
        self.enigo.move_mouse(x, y, Coordinate::Abs).map_err(driver_error)
    }

    fn button(&mut self, button: MouseButton, pressed: bool) -> ExecutorResult<()> {
        let button = match button {
            MouseButton::Left => Button::Left,
            MouseButton::Right => Button::Right,
            MouseButton::Middle => Button::Middle,
        };
        self.enigo.button(button, direction(pressed)).map_err(driver_error)
    }

    fn key(&mut self, key: &str, pressed: bool) -> ExecutorResult<()> {
        let key = parse_key(key)?;
        self.enigo.key(key, direction(pressed)).map_err(driver_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_names() {
        assert!(matches!(parse_key("Space"), Ok(Key::Space)));
        assert!(matches!(parse_key("esc"), Ok(Key::Escape)));
        assert!(matches!(parse_key("e"), Ok(Key::Unicode('e'))));
        assert!(matches!(parse_key("hyper"), Err(ExecutorError::UnknownKey { .. })));
    }
}
