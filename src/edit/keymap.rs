//! Keyboard bindings

use std::collections::HashMap;

use super::command::{Command, Direction, Step};

/// Window-system independent key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyInput {
    /// Printable key as typed (case carries the shift state)
    Char(char),
    Space,
    PageUp,
    PageDown,
    Arrow(Direction),
}

/// Key → command table. Arrows always nudge; Shift picks the coarse step.
#[derive(Debug, Clone)]
pub struct KeyBindings {
    bindings: HashMap<KeyInput, Command>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        use Command::*;
        use KeyInput::Char;

        let bindings = [
            (Char('?'), ToggleInfo),
            (KeyInput::Space, TogglePause),
            (Char('m'), ToggleMaskMode),
            (Char('p'), ToggleMarkers),
            (Char('o'), ToggleMaskedPreview),
            (Char('a'), AnimationSpeed(Step::Down)),
            (Char('A'), AnimationSpeed(Step::DownFast)),
            (Char('s'), AnimationSpeed(Step::Up)),
            (Char('S'), AnimationSpeed(Step::UpFast)),
            (Char('z'), RotationSpeed(Step::Down)),
            (Char('Z'), RotationSpeed(Step::DownFast)),
            (Char('x'), RotationSpeed(Step::Up)),
            (Char('X'), RotationSpeed(Step::UpFast)),
            (Char('q'), SpawnDistance(Step::Up)),
            (Char('w'), SpawnDistance(Step::Down)),
            (Char('i'), InsertAfter),
            (Char('I'), InsertBefore),
            (Char('r'), RemovePoint),
            (KeyInput::PageUp, PrevPoint),
            (KeyInput::PageDown, NextPoint),
        ]
        .into_iter()
        .collect();

        Self { bindings }
    }
}

impl KeyBindings {
    /// Bind a key, returning the command it replaced
    pub fn bind(&mut self, key: KeyInput, command: Command) -> Option<Command> {
        self.bindings.insert(key, command)
    }

    pub fn unbind(&mut self, key: KeyInput) -> Option<Command> {
        self.bindings.remove(&key)
    }

    pub fn lookup(&self, key: KeyInput, shift: bool) -> Option<Command> {
        match key {
            KeyInput::Arrow(direction) => Some(Command::Nudge {
                direction,
                coarse: shift,
            }),
            other => self.bindings.get(&other).copied(),
        }
    }

    /// Keys bound to a command, for the help text
    pub fn keys_for(&self, command: Command) -> Vec<KeyInput> {
        self.bindings
            .iter()
            .filter(|(_, c)| **c == command)
            .map(|(k, _)| *k)
            .collect()
    }
}
