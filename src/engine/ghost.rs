//! Ghost steering and bookkeeping.
//!
//! Each tick a ghost builds a 4-bit mask of open directions (bit 1 right,
//! 2 down, 4 left, 8 up) and looks the mask up in a table keyed by its
//! current heading. The tables encode the anti-reversal bias: a ghost keeps
//! going or turns sideways whenever it can, and only reverses in a dead end.

use crate::constants::{GHOST_LIMIT, TILE_EMPTY, TILE_FRUIT, TILE_LOCK, TILE_TELEPORTER, TILE_WALL};
use crate::rng::Rng;
use crate::types::{ActorLook, Direction};
use crate::world::World;

/// Resolved steering decision for one open-direction mask.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Turn {
    Stay,
    Go(Direction),
    /// Pick uniformly among the directions in the mask.
    Choose(u8),
}

use Direction::{Down, Left, Right, Up};
use Turn::{Choose, Go, Stay};

/// No current heading (fresh spawn or just reset).
const TURNS_IDLE: [Turn; 16] = [
    Stay,
    Go(Right),
    Go(Down),
    Choose(3),
    Go(Left),
    Choose(5),
    Choose(6),
    Choose(7),
    Go(Up),
    Choose(9),
    Choose(10),
    Choose(11),
    Choose(12),
    Choose(13),
    Choose(14),
    Choose(15),
];

const TURNS_RIGHT: [Turn; 16] = [
    Stay,
    Go(Right),
    Go(Down),
    Go(Right),
    Go(Left),
    Go(Right),
    Go(Down),
    Choose(3),
    Go(Up),
    Go(Right),
    Choose(10),
    Go(Right),
    Go(Up),
    Choose(9),
    Choose(10),
    Choose(11),
];

const TURNS_DOWN: [Turn; 16] = [
    Stay,
    Go(Right),
    Go(Down),
    Go(Down),
    Go(Left),
    Choose(5),
    Go(Down),
    Go(Down),
    Go(Up),
    Go(Right),
    Go(Down),
    Choose(3),
    Go(Left),
    Choose(5),
    Choose(6),
    Choose(7),
];

const TURNS_LEFT: [Turn; 16] = [
    Stay,
    Go(Right),
    Go(Down),
    Go(Down),
    Go(Left),
    Go(Left),
    Go(Left),
    Choose(6),
    Go(Up),
    Go(Up),
    Choose(10),
    Choose(10),
    Go(Left),
    Choose(12),
    Go(Left),
    Choose(14),
];

const TURNS_UP: [Turn; 16] = [
    Stay,
    Go(Right),
    Go(Down),
    Go(Right),
    Go(Left),
    Choose(5),
    Go(Left),
    Choose(5),
    Go(Up),
    Go(Up),
    Go(Up),
    Choose(9),
    Go(Up),
    Go(Up),
    Choose(12),
    Choose(13),
];

fn turn_table(heading: Direction) -> &'static [Turn; 16] {
    match heading {
        Direction::Right => &TURNS_RIGHT,
        Direction::Down => &TURNS_DOWN,
        Direction::Left => &TURNS_LEFT,
        Direction::Up => &TURNS_UP,
        Direction::None => &TURNS_IDLE,
    }
}

/// Tiles a ghost will not step onto.
fn blocks_ghost(tile: u8) -> bool {
    matches!(tile, TILE_WALL | TILE_LOCK | TILE_TELEPORTER)
}

#[derive(Clone, Debug)]
pub struct Ghost {
    origin_row: usize,
    origin_col: usize,
    pub row: usize,
    pub col: usize,
    heading: Direction,
    scared: u32,
    invincible: bool,
}

impl Ghost {
    fn new(row: usize, col: usize) -> Self {
        Self {
            origin_row: row,
            origin_col: col,
            row,
            col,
            heading: Direction::None,
            scared: 0,
            invincible: false,
        }
    }

    fn reset(&mut self) {
        self.row = self.origin_row;
        self.col = self.origin_col;
        self.heading = Direction::None;
        self.scared = 0;
    }

    pub fn is_scared(&self) -> bool {
        self.scared > 0
    }

    /// Sprite code: 0..=4 ghost number, 5 scared, 6 scare ending, 7 fed.
    fn look(&self, index: usize) -> u8 {
        if self.invincible {
            7
        } else if self.scared > 0 {
            if (7..=9).contains(&self.scared) || self.scared <= 3 {
                6
            } else {
                5
            }
        } else {
            index as u8
        }
    }
}

/// What happened to the actors during one ghost step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GhostStep {
    /// Scared ghosts that walked into the player and got eaten.
    pub eaten: usize,
    /// Fruits swallowed by ghosts this tick.
    pub fruits: usize,
    /// A fearless ghost reached the player.
    pub caught_player: bool,
}

#[derive(Clone, Debug, Default)]
pub struct GhostRegistry {
    ghosts: Vec<Ghost>,
}

impl GhostRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a ghost spawn point. Spawns beyond the cap are ignored.
    pub fn spawn(&mut self, row: usize, col: usize) -> bool {
        if self.ghosts.len() >= GHOST_LIMIT {
            return false;
        }
        self.ghosts.push(Ghost::new(row, col));
        true
    }

    pub fn len(&self) -> usize {
        self.ghosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ghosts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ghost> {
        self.ghosts.iter()
    }

    pub fn clear(&mut self) {
        self.ghosts.clear();
    }

    pub fn reset_all(&mut self) {
        for ghost in &mut self.ghosts {
            ghost.reset();
        }
    }

    /// Frightens every ghost that has not eaten a fruit. Re-scaring restarts
    /// the countdown from the full duration.
    pub fn scare_all(&mut self, duration: u32) {
        for ghost in &mut self.ghosts {
            if !ghost.invincible {
                ghost.scared = duration;
            }
        }
    }

    pub fn scared_count(&self) -> usize {
        self.ghosts.iter().filter(|g| g.scared > 0).count()
    }

    pub fn is_scared(&self, index: usize) -> bool {
        self.ghosts[index].is_scared()
    }

    /// The ghost standing at the given cell, if any.
    pub fn at(&self, row: usize, col: usize) -> Option<usize> {
        self.ghosts
            .iter()
            .position(|g| g.row == row && g.col == col)
    }

    /// Sends one ghost home and clears its fright.
    pub fn reset_one(&mut self, index: usize) {
        self.ghosts[index].reset();
    }

    pub fn looks(&self) -> Vec<ActorLook> {
        self.ghosts
            .iter()
            .enumerate()
            .map(|(index, ghost)| ActorLook {
                row: ghost.row,
                col: ghost.col,
                look: ghost.look(index),
            })
            .collect()
    }

    fn open_mask(&self, world: &World, index: usize) -> u8 {
        let ghost = &self.ghosts[index];
        let mut mask = 0u8;
        for dir in [Right, Down, Left, Up] {
            let (d_row, d_col) = dir.offset();
            let target_row = world.wrap_row(ghost.row, d_row);
            let target_col = world.wrap_col(ghost.col, d_col);
            let tile = world.tile_at(target_row, target_col);
            let occupied = self
                .ghosts
                .iter()
                .enumerate()
                .any(|(j, other)| j != index && other.row == target_row && other.col == target_col);
            if !blocks_ghost(tile) && !occupied {
                mask |= dir.bit();
            }
        }
        mask
    }

    /// Advances every ghost one step and resolves what it landed on.
    pub fn advance(
        &mut self,
        world: &mut World,
        player: Option<(usize, usize)>,
        rng: &mut Rng,
    ) -> GhostStep {
        let mut step = GhostStep::default();
        for index in 0..self.ghosts.len() {
            if self.ghosts[index].scared > 0 {
                self.ghosts[index].scared -= 1;
            }
            let mask = self.open_mask(world, index);
            let heading = match turn_table(self.ghosts[index].heading)[mask as usize] {
                Stay => Direction::None,
                Go(dir) => dir,
                Choose(options) => loop {
                    let bit = rng.direction_bit();
                    if bit & options != 0 {
                        break Direction::from_bit(bit);
                    }
                },
            };
            let ghost = &mut self.ghosts[index];
            ghost.heading = heading;
            let (d_row, d_col) = heading.offset();
            ghost.row = world.wrap_row(ghost.row, d_row);
            ghost.col = world.wrap_col(ghost.col, d_col);

            if world.tile_at(ghost.row, ghost.col) == TILE_FRUIT {
                ghost.scared = 0;
                ghost.invincible = true;
                world.set_tile(ghost.row, ghost.col, TILE_EMPTY);
                step.fruits += 1;
            }
            if player == Some((ghost.row, ghost.col)) {
                if ghost.scared > 0 {
                    ghost.reset();
                    step.eaten += 1;
                } else {
                    step.caught_player = true;
                }
            }
        }
        step
    }
}
