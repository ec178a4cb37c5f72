use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Right,
    Down,
    Left,
    Up,
    None,
}

impl Direction {
    /// Bit used by the ghost turn tables: 1=right, 2=down, 4=left, 8=up.
    pub fn bit(self) -> u8 {
        match self {
            Self::Right => 1,
            Self::Down => 2,
            Self::Left => 4,
            Self::Up => 8,
            Self::None => 0,
        }
    }

    pub fn from_bit(bit: u8) -> Self {
        match bit {
            1 => Self::Right,
            2 => Self::Down,
            4 => Self::Left,
            8 => Self::Up,
            _ => Self::None,
        }
    }

    /// (row delta, column delta) of one step.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Self::Right => (0, 1),
            Self::Down => (1, 0),
            Self::Left => (0, -1),
            Self::Up => (-1, 0),
            Self::None => (0, 0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Editor,
    Game,
}

/// Directional key state sampled at tick boundaries. Opposed keys cancel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InputState {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl InputState {
    pub fn row_delta(self) -> i32 {
        i32::from(self.down) - i32::from(self.up)
    }

    pub fn col_delta(self) -> i32 {
        i32::from(self.right) - i32::from(self.left)
    }

    pub fn is_idle(self) -> bool {
        self.row_delta() == 0 && self.col_delta() == 0
    }
}

/// Sound effect triggers, surfaced to the presentation bridge as events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundCue {
    Start,
    Dot,
    SuperDot,
    Fruit,
    Key,
    Lock,
    Teleport,
    EatGhost,
    Die,
    Win,
}

/// Position plus sprite-selection code for one on-screen actor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ActorLook {
    pub row: usize,
    pub col: usize,
    pub look: u8,
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    pub state: SessionState,
    pub columns: usize,
    pub rows: usize,
    pub tiles: Vec<Vec<u8>>,
    pub score: i32,
    pub lives: i32,
    pub keys: i32,
    pub level: usize,
    #[serde(rename = "dotsRemaining")]
    pub dots_remaining: i32,
    pub paused: bool,
    pub player: Option<ActorLook>,
    pub ghosts: Vec<ActorLook>,
    pub events: Vec<SoundCue>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ScoreboardEntry {
    pub level: String,
    pub plays: u64,
    pub wins: u64,
    #[serde(rename = "bestScore")]
    pub best_score: i32,
    #[serde(rename = "updatedAtIso")]
    pub updated_at_iso: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ScoresResponse {
    #[serde(rename = "generatedAtIso")]
    pub generated_at_iso: String,
    pub entries: Vec<ScoreboardEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_bits_round_trip() {
        for dir in [
            Direction::Right,
            Direction::Down,
            Direction::Left,
            Direction::Up,
        ] {
            assert_eq!(Direction::from_bit(dir.bit()), dir);
        }
        assert_eq!(Direction::from_bit(0), Direction::None);
    }

    #[test]
    fn opposed_keys_cancel() {
        let input = InputState {
            up: true,
            down: true,
            left: true,
            right: false,
        };
        assert_eq!(input.row_delta(), 0);
        assert_eq!(input.col_delta(), -1);
        assert!(!input.is_idle());
    }
}
