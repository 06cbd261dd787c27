// Executes commands against a platform input driver
use super::command::{CommandReport, ExecutorCommand, MouseButton};
use super::error::ExecutorResult;
use std::time::Duration;

/// Low-level synthetic input. Implementations only press, release and move;
/// timing lives in [`Executor`].
pub trait InputDriver: Send {
    fn move_to(&mut self, x: i32, y: i32) -> ExecutorResult<()>;
    fn button(&mut self, button: MouseButton, pressed: bool) -> ExecutorResult<()>;
    fn key(&mut self, key: &str, pressed: bool) -> ExecutorResult<()>;
}

/// Interval between intermediate drag positions.
const DRAG_STEP: Duration = Duration::from_millis(10);

pub struct Executor<D: InputDriver> {
    driver: D,
}

impl<D: InputDriver> Executor<D> {
    pub fn new(driver: D) -> Self {
        Self { driver }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Decode a JSON command and run it, reporting instead of failing.
    pub fn run_json(&mut self, json: &str) -> CommandReport {
        match ExecutorCommand::decode(json) {
            Ok(command) => self.run(&command),
            Err(e) => {
                log::warn!("⚠️ Rejected executor command: {}", e);
                CommandReport::failed(e)
            }
        }
    }

    pub fn run(&mut self, command: &ExecutorCommand) -> CommandReport {
        match self.execute(command) {
            Ok(()) => CommandReport::ok(),
            Err(e) => {
                log::error!("❌ {} failed: {}", command.name(), e);
                CommandReport::failed(e)
            }
        }
    }

    pub fn execute(&mut self, command: &ExecutorCommand) -> ExecutorResult<()> {
        command.validate()?;
        self.execute_unchecked(command)
    }

    fn execute_unchecked(&mut self, command: &ExecutorCommand) -> ExecutorResult<()> {
        log::trace!("🖱️ {:?}", command);
        match command {
            ExecutorCommand::Move { x, y } => self.driver.move_to(*x, *y),
            ExecutorCommand::Click {
                x,
                y,
                button,
                repeat,
                interval_ms,
            } => {
                if let (Some(x), Some(y)) = (x, y) {
                    self.driver.move_to(*x, *y)?;
                }
                for i in 0..*repeat {
                    if i > 0 {
                        pause(*interval_ms);
                    }
                    self.driver.button(*button, true)?;
                    self.driver.button(*button, false)?;
                }
                Ok(())
            }
            ExecutorCommand::KeyPress { key, duration_ms } => {
                self.driver.key(key, true)?;
                pause(*duration_ms);
                self.driver.key(key, false)
            }
            ExecutorCommand::Drag {
                x0,
                y0,
                x1,
                y1,
                duration_ms,
                button,
            } => {
                self.driver.move_to(*x0, *y0)?;
                self.driver.button(*button, true)?;
                let steps = (*duration_ms / DRAG_STEP.as_millis() as u64).max(1);
                for step in 1..=steps {
                    let t = step as f32 / steps as f32;
                    let x = *x0 + ((*x1 - *x0) as f32 * t).round() as i32;
                    let y = *y0 + ((*y1 - *y0) as f32 * t).round() as i32;
                    pause(*duration_ms / steps);
                    self.driver.move_to(x, y)?;
                }
                self.driver.button(*button, false)
            }
            ExecutorCommand::Sequence { steps } => {
                steps.iter().try_for_each(|step| self.execute_unchecked(step))
            }
            ExecutorCommand::Wait { duration_ms } => {
                pause(*duration_ms);
                Ok(())
            }
        }
    }
}

fn pause(ms: u64) {
    if ms > 0 {
        std::thread::sleep(Duration::from_millis(ms));
    }
}
