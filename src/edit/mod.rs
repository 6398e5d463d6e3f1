//! Live editing of the projection quad and the audience mask

pub mod command;
pub mod controller;
pub mod keymap;

pub use command::{Command, Direction, Step};
pub use controller::{EditController, EditCursor, EditMode, EditOutcome, NudgeSteps, ViewFlags};
pub use keymap::{KeyBindings, KeyInput};
