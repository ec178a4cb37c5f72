use crate::constants::{TILE_BARRIER, TILE_LOCK, TILE_WALL};
use crate::types::ActorLook;
use crate::world::World;

/// Tiles the player can never walk through.
fn is_solid(tile: u8) -> bool {
    matches!(tile, TILE_WALL | TILE_BARRIER)
}

/// The player actor. Movement is resolved one axis at a time so that a
/// diagonal key chord turns the corner instead of stopping dead, and the
/// facing updates even when the step itself is blocked, which buffers a turn
/// into the next open tile.
#[derive(Clone, Debug)]
pub struct Player {
    origin_row: usize,
    origin_col: usize,
    pub row: usize,
    pub col: usize,
    facing_row: i32,
    facing_col: i32,
    mouth_open: bool,
}

impl Player {
    pub fn new(row: usize, col: usize) -> Self {
        Self {
            origin_row: row,
            origin_col: col,
            row,
            col,
            facing_row: 0,
            facing_col: -1,
            mouth_open: true,
        }
    }

    /// Back to the spawn tile, keeping the current facing.
    pub fn reset(&mut self) {
        self.row = self.origin_row;
        self.col = self.origin_col;
    }

    pub fn facing(&self) -> (i32, i32) {
        (self.facing_row, self.facing_col)
    }

    /// Moves the player into the new position in this direction. `keys`
    /// decides whether locks give way.
    pub fn advance(&mut self, world: &World, keys: i32, d_row: i32, d_col: i32) {
        let mut new_row = world.wrap_row(self.row, d_row);
        let mut new_col = world.wrap_col(self.col, d_col);

        if d_row != 0 && d_col != 0 {
            // Diagonal chord: prefer turning off the current axis when the
            // side tile is open, otherwise keep going straight.
            if self.facing_row != 0 {
                if is_solid(world.tile_at(self.row, new_col)) {
                    self.facing_col = 0;
                    new_col = self.col;
                    self.facing_row = d_row;
                } else {
                    self.facing_row = 0;
                    new_row = self.row;
                    self.facing_col = d_col;
                }
            } else if is_solid(world.tile_at(new_row, self.col)) {
                self.facing_row = 0;
                new_row = self.row;
                self.facing_col = d_col;
            } else {
                self.facing_col = 0;
                new_col = self.col;
                self.facing_row = d_row;
            }
        } else {
            self.facing_row = d_row;
            self.facing_col = d_col;
        }

        if new_row != self.row {
            let tile = world.tile_at(new_row, self.col);
            if is_solid(tile) || (tile == TILE_LOCK && keys == 0) {
                new_row = self.row;
            }
        }
        if new_col != self.col {
            let tile = world.tile_at(self.row, new_col);
            if is_solid(tile) || (tile == TILE_LOCK && keys == 0) {
                new_col = self.col;
            }
        }
        self.row = new_row;
        self.col = new_col;
    }

    /// Sprite code for the current frame; the mouth flips every call.
    pub fn look(&mut self) -> ActorLook {
        self.mouth_open = !self.mouth_open;
        let look = if self.mouth_open {
            if self.facing_col == 1 {
                0
            } else if self.facing_row == 1 {
                1
            } else if self.facing_col == -1 {
                2
            } else {
                3
            }
        } else {
            4
        };
        ActorLook {
            row: self.row,
            col: self.col,
            look,
        }
    }
}
