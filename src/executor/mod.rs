// Executor module - turns command objects into synthetic input
// Commands arrive as JSON (tagged by "cmd"), are validated, and are replayed
// through an InputDriver. The enigo-backed driver is behind the `input` feature.

pub mod command;
pub mod driver;
#[cfg(feature = "input")]
pub mod enigo_impl;
pub mod error;

pub use command::{CommandReport, ExecutorCommand, MAX_SEQUENCE_DEPTH, MouseButton};
pub use driver::{Executor, InputDriver};
#[cfg(feature = "input")]
pub use enigo_impl::EnigoDriver;
pub use error::{ExecutorError, ExecutorResult};
