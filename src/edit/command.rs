//! Operator commands

/// Multiplicative step for a tunable parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// ×0.8
    Down,
    /// ×0.5
    DownFast,
    /// ×1.25
    Up,
    /// ×2
    UpFast,
}

impl Step {
    pub fn factor(&self) -> f32 {
        match self {
            Step::Down => 0.8,
            Step::DownFast => 0.5,
            Step::Up => 1.25,
            Step::UpFast => 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Unit offset in normalized device space (y up)
    pub fn offset(&self) -> (f32, f32) {
        match self {
            Direction::Up => (0.0, 1.0),
            Direction::Down => (0.0, -1.0),
            Direction::Left => (-1.0, 0.0),
            Direction::Right => (1.0, 0.0),
        }
    }
}

/// Everything the operator can do from the keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    ToggleInfo,
    TogglePause,
    /// Switch between editing quad corners and mask vertices
    ToggleMaskMode,
    ToggleMarkers,
    /// Dim instead of hide the masked-out region
    ToggleMaskedPreview,
    AnimationSpeed(Step),
    RotationSpeed(Step),
    SpawnDistance(Step),
    /// Insert a mask vertex between the selection and its successor
    InsertAfter,
    /// Insert a mask vertex between the predecessor and the selection
    InsertBefore,
    RemovePoint,
    NextPoint,
    PrevPoint,
    /// Move the live point; `coarse` selects the large step
    Nudge { direction: Direction, coarse: bool },
}

impl Command {
    /// Commands that only act in mask-edit mode
    pub fn requires_mask_mode(&self) -> bool {
        matches!(
            self,
            Command::InsertAfter | Command::InsertBefore | Command::RemovePoint
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_factors() {
        assert_eq!(Step::Down.factor(), 0.8);
        assert_eq!(Step::DownFast.factor(), 0.5);
        assert_eq!(Step::Up.factor(), 1.25);
        assert_eq!(Step::UpFast.factor(), 2.0);
    }

    #[test]
    fn test_mask_only_commands() {
        assert!(Command::InsertAfter.requires_mask_mode());
        assert!(Command::RemovePoint.requires_mask_mode());
        assert!(!Command::NextPoint.requires_mask_mode());
    }
}
