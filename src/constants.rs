pub const TICK_RATE: u32 = 60;
pub const TICK_MS: u64 = 1000 / TICK_RATE as u64;

pub const GRID_COLUMNS: usize = 19;
pub const GRID_ROWS: usize = 21;

pub const TILE_EMPTY: u8 = 0;
pub const TILE_DOT: u8 = 1;
pub const TILE_WALL: u8 = 2;
pub const TILE_BARRIER: u8 = 3;
pub const TILE_LOCK: u8 = 4;
pub const TILE_TELEPORTER: u8 = 5;
pub const TILE_GHOST: u8 = 6;
pub const TILE_FRUIT: u8 = 7;
pub const TILE_KEY: u8 = 8;
pub const TILE_SUPER_DOT: u8 = 9;
pub const TILE_PLAYER: u8 = 10;

/// Number of paintable tile codes (gameplay tiles plus decorations 11..=18).
/// Also the run-length offset of the item segment in the share codec.
pub const PALETTE_SIZE: u8 = 19;

pub const GHOST_LIMIT: usize = 5;
pub const STARTING_LIVES: i32 = 3;

pub const SCORE_DOT: i32 = 10;
pub const SCORE_SUPER_DOT: i32 = 50;
pub const SCORE_FRUIT: i32 = 100;
pub const GHOST_SCORE_BASE: i32 = 200;

/// Ticks between committed moves, indexed by level.
const MOVE_DELAYS: [u32; 10] = [8, 8, 7, 7, 6, 6, 6, 5, 5, 5];

/// Death pause before lives are resolved (1.6s at the tick rate).
pub const DEATH_PAUSE_TICKS: u64 = 96;

pub fn move_delay(level: usize) -> u32 {
    MOVE_DELAYS[level.min(MOVE_DELAYS.len() - 1)]
}

pub fn scare_duration(level: usize) -> u32 {
    let base = 64i64 - level as i64 * 5;
    base.max(1) as u32
}

/// The built-in starter maze, 19x21.
pub const DEFAULT_MAP: [[u8; GRID_COLUMNS]; GRID_ROWS] = [
    [2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2],
    [2, 1, 1, 1, 1, 1, 1, 1, 1, 2, 1, 1, 1, 1, 1, 1, 1, 1, 2],
    [2, 9, 2, 2, 1, 2, 2, 2, 1, 2, 1, 2, 2, 2, 1, 2, 2, 9, 2],
    [2, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 2],
    [2, 1, 2, 2, 1, 2, 1, 2, 2, 2, 2, 2, 1, 2, 1, 2, 2, 1, 2],
    [2, 1, 1, 1, 1, 2, 1, 1, 1, 2, 1, 1, 1, 2, 1, 1, 1, 1, 2],
    [2, 2, 2, 2, 1, 2, 2, 2, 1, 2, 1, 2, 2, 2, 1, 2, 2, 2, 2],
    [0, 0, 0, 2, 1, 2, 0, 0, 0, 0, 0, 0, 0, 2, 1, 2, 0, 0, 0],
    [2, 2, 2, 2, 1, 2, 0, 2, 2, 3, 2, 2, 0, 2, 1, 2, 2, 2, 2],
    [0, 0, 0, 0, 1, 1, 0, 2, 6, 6, 6, 2, 0, 1, 1, 0, 0, 0, 0],
    [2, 2, 2, 2, 1, 2, 0, 2, 2, 2, 2, 2, 0, 2, 1, 2, 2, 2, 2],
    [0, 0, 0, 2, 1, 2, 0, 0, 0, 7, 0, 0, 0, 2, 1, 2, 0, 0, 0],
    [2, 2, 2, 2, 1, 2, 1, 2, 2, 2, 2, 2, 1, 2, 1, 2, 2, 2, 2],
    [2, 1, 1, 1, 1, 1, 1, 1, 1, 2, 1, 1, 1, 1, 1, 1, 1, 1, 2],
    [2, 1, 2, 2, 1, 2, 2, 2, 1, 2, 1, 2, 2, 2, 1, 2, 2, 1, 2],
    [2, 9, 1, 2, 1, 1, 1, 1, 1, 10, 1, 1, 1, 1, 1, 2, 1, 9, 2],
    [2, 2, 1, 2, 1, 2, 1, 2, 2, 2, 2, 2, 1, 2, 1, 2, 1, 2, 2],
    [2, 1, 1, 1, 1, 2, 1, 1, 1, 2, 1, 1, 1, 2, 1, 1, 1, 1, 2],
    [2, 1, 2, 2, 2, 2, 2, 2, 1, 2, 1, 2, 2, 2, 2, 2, 2, 1, 2],
    [2, 1, 1, 1, 1, 1, 1, 1, 1, 2, 1, 1, 1, 1, 1, 1, 1, 1, 2],
    [2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2],
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_delay_clamps_to_last_level() {
        assert_eq!(move_delay(0), 8);
        assert_eq!(move_delay(9), 5);
        assert_eq!(move_delay(42), 5);
    }

    #[test]
    fn scare_duration_never_reaches_zero() {
        assert_eq!(scare_duration(0), 64);
        assert_eq!(scare_duration(9), 19);
        assert_eq!(scare_duration(100), 1);
    }

    #[test]
    fn default_map_has_one_player_spawn() {
        let players = DEFAULT_MAP
            .iter()
            .flatten()
            .filter(|&&value| value == TILE_PLAYER)
            .count();
        assert_eq!(players, 1);
    }
}
