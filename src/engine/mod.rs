//! Tick-driven session controller.
//!
//! A session is either in the editor or running a game. Starting a run
//! snapshots the grid, strips the actor markers out of the terrain and
//! spawns the actors on top; leaving the run restores the snapshot, so the
//! level survives play untouched.

pub mod ghost;
pub mod player;

use log::{debug, info};
use thiserror::Error;

use crate::codec::{self, CodecError};
use crate::constants::{
    move_delay, scare_duration, DEATH_PAUSE_TICKS, GHOST_SCORE_BASE, PALETTE_SIZE, SCORE_DOT,
    SCORE_FRUIT, SCORE_SUPER_DOT, STARTING_LIVES, TILE_DOT, TILE_EMPTY, TILE_FRUIT, TILE_GHOST,
    TILE_KEY, TILE_LOCK, TILE_PLAYER, TILE_SUPER_DOT, TILE_TELEPORTER,
};
use crate::rng::Rng;
use crate::types::{InputState, SessionState, Snapshot, SoundCue};
use crate::world::World;

use ghost::GhostRegistry;
use player::Player;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LevelError {
    #[error("level has no player spawn")]
    MissingPlayer,
    #[error("level has more than one player spawn")]
    MultiplePlayers,
    #[error("level has no dots to eat")]
    NoDots,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EventKind {
    DeathResolve,
}

/// A delayed action. The generation token ties it to one particular run, so
/// events scheduled before a restart can never leak into the next game.
#[derive(Clone, Copy, Debug)]
struct ScheduledEvent {
    at_tick: u64,
    generation: u64,
    kind: EventKind,
}

pub struct GameSession {
    world: World,
    state: SessionState,
    level: usize,
    rng: Rng,
    player: Option<Player>,
    ghosts: GhostRegistry,
    teleporters: Vec<(usize, usize)>,
    score: i32,
    lives: i32,
    keys: i32,
    dots_remaining: i32,
    ghost_score: i32,
    paused: bool,
    countdown: u32,
    tick_counter: u64,
    generation: u64,
    pending: Vec<ScheduledEvent>,
    events: Vec<SoundCue>,
}

impl GameSession {
    pub fn new(seed: u32) -> Self {
        Self {
            world: World::new(),
            state: SessionState::Editor,
            level: 0,
            rng: Rng::new(seed),
            player: None,
            ghosts: GhostRegistry::new(),
            teleporters: Vec::new(),
            score: 0,
            lives: STARTING_LIVES,
            keys: 0,
            dots_remaining: 0,
            ghost_score: GHOST_SCORE_BASE,
            paused: false,
            countdown: 0,
            tick_counter: 0,
            generation: 0,
            pending: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn score(&self) -> i32 {
        self.score
    }

    pub fn lives(&self) -> i32 {
        self.lives
    }

    pub fn keys(&self) -> i32 {
        self.keys
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn dots_remaining(&self) -> i32 {
        self.dots_remaining
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Difficulty for the next run. Only adjustable between games.
    pub fn set_level(&mut self, level: usize) {
        if self.state == SessionState::Editor {
            self.level = level;
        }
    }

    /// Paints one tile in the editor. Out-of-palette codes are ignored.
    pub fn paint(&mut self, row: usize, col: usize, value: u8) {
        if self.state != SessionState::Editor || value >= PALETTE_SIZE {
            return;
        }
        self.world.set_tile(row, col, value);
    }

    /// Blank slate. Ends the run first when one is in progress.
    pub fn clear_level(&mut self) {
        self.edit();
        self.world.clear();
    }

    /// Encodes the authored level, not the live board: mid-game the saved
    /// snapshot is used so eaten dots never leak into a share code.
    pub fn share(&self) -> String {
        match self.state {
            SessionState::Editor => codec::encode(self.world.tiles()),
            SessionState::Game => codec::encode(self.world.saved_tiles()),
        }
    }

    /// Replaces the level with a decoded share code. A malformed code leaves
    /// the current level untouched.
    pub fn load_level(&mut self, code: &str) -> Result<(), CodecError> {
        let tiles = codec::decode(code)?;
        if self.state == SessionState::Game {
            self.edit();
        }
        self.world = World::from_map(tiles);
        Ok(())
    }

    /// Scans the authored grid, validates it and starts a run.
    pub fn run(&mut self) -> Result<(), LevelError> {
        if self.state == SessionState::Game {
            return Ok(());
        }
        let mut player_spawn = None;
        let mut player_count = 0usize;
        let mut ghost_spawns = Vec::new();
        let mut teleporters = Vec::new();
        let mut dots = 0i32;
        for row in 0..self.world.rows() {
            for col in 0..self.world.columns() {
                match self.world.tile_at(row, col) {
                    TILE_DOT | TILE_SUPER_DOT => dots += 1,
                    TILE_PLAYER => {
                        player_count += 1;
                        if player_spawn.is_none() {
                            player_spawn = Some((row, col));
                        }
                    }
                    TILE_GHOST => ghost_spawns.push((row, col)),
                    TILE_TELEPORTER => teleporters.push((row, col)),
                    _ => {}
                }
            }
        }
        let Some((spawn_row, spawn_col)) = player_spawn else {
            return Err(LevelError::MissingPlayer);
        };
        if player_count > 1 {
            return Err(LevelError::MultiplePlayers);
        }
        if dots == 0 {
            return Err(LevelError::NoDots);
        }

        self.world.save();
        self.world.set_tile(spawn_row, spawn_col, TILE_EMPTY);
        self.ghosts.clear();
        for (row, col) in ghost_spawns {
            self.world.set_tile(row, col, TILE_EMPTY);
            self.ghosts.spawn(row, col);
        }
        self.player = Some(Player::new(spawn_row, spawn_col));
        self.teleporters = teleporters;
        self.dots_remaining = dots;
        self.score = 0;
        self.lives = STARTING_LIVES;
        self.keys = 0;
        self.ghost_score = GHOST_SCORE_BASE;
        self.paused = false;
        self.countdown = 0;
        self.generation += 1;
        self.pending.clear();
        self.state = SessionState::Game;
        self.events.push(SoundCue::Start);
        info!(
            "run started: level={} dots={} ghosts={}",
            self.level,
            self.dots_remaining,
            self.ghosts.len()
        );
        Ok(())
    }

    /// Abandons the run and restores the authored level.
    pub fn edit(&mut self) {
        if self.state == SessionState::Editor {
            return;
        }
        self.world.load();
        self.state = SessionState::Editor;
        self.player = None;
        self.ghosts.clear();
        self.teleporters.clear();
        self.paused = false;
        self.generation += 1;
        debug!("back to editor at tick {}", self.tick_counter);
    }

    /// Advances the session by one tick. Actors only commit a step every
    /// `move_delay(level) + 1` ticks; the ticks in between burn the countdown.
    pub fn tick(&mut self, input: InputState) {
        self.tick_counter += 1;
        self.fire_due_events();
        if self.state != SessionState::Game || self.paused {
            return;
        }
        if self.countdown > 0 {
            self.countdown -= 1;
            return;
        }
        self.countdown = move_delay(self.level);

        self.move_player(input);
        if self.state != SessionState::Game {
            return;
        }
        let player_pos = self.player.as_ref().map(|p| (p.row, p.col));
        let step = self
            .ghosts
            .advance(&mut self.world, player_pos, &mut self.rng);
        for _ in 0..step.eaten {
            self.award_ghost();
        }
        if step.caught_player && !self.paused {
            self.kill_player();
        }
    }

    pub fn build_snapshot(&mut self, include_events: bool) -> Snapshot {
        let events = if include_events {
            std::mem::take(&mut self.events)
        } else {
            Vec::new()
        };
        let in_game = self.state == SessionState::Game;
        Snapshot {
            tick: self.tick_counter,
            state: self.state,
            columns: self.world.columns(),
            rows: self.world.rows(),
            tiles: self.world.tiles().to_vec(),
            score: self.score,
            lives: self.lives,
            keys: self.keys,
            level: self.level,
            dots_remaining: self.dots_remaining,
            paused: self.paused,
            player: if in_game {
                self.player.as_mut().map(|p| p.look())
            } else {
                None
            },
            ghosts: if in_game {
                self.ghosts.looks()
            } else {
                Vec::new()
            },
            events,
        }
    }

    fn move_player(&mut self, input: InputState) {
        let Some(mut player) = self.player.take() else {
            return;
        };
        let (d_row, d_col) = if input.is_idle() {
            player.facing()
        } else {
            (input.row_delta(), input.col_delta())
        };
        player.advance(&self.world, self.keys, d_row, d_col);

        if let Some(index) = self.ghosts.at(player.row, player.col) {
            if self.ghosts.is_scared(index) {
                self.ghosts.reset_one(index);
                self.award_ghost();
            } else {
                self.player = Some(player);
                self.kill_player();
                return;
            }
        }

        match self.world.tile_at(player.row, player.col) {
            TILE_DOT => {
                self.world.set_tile(player.row, player.col, TILE_EMPTY);
                self.dots_remaining -= 1;
                self.score += SCORE_DOT;
                self.events.push(SoundCue::Dot);
            }
            TILE_SUPER_DOT => {
                self.world.set_tile(player.row, player.col, TILE_EMPTY);
                self.dots_remaining -= 1;
                self.score += SCORE_SUPER_DOT;
                self.ghost_score = GHOST_SCORE_BASE;
                self.ghosts.scare_all(scare_duration(self.level));
                self.events.push(SoundCue::SuperDot);
            }
            TILE_FRUIT => {
                self.world.set_tile(player.row, player.col, TILE_EMPTY);
                self.score += SCORE_FRUIT;
                self.events.push(SoundCue::Fruit);
            }
            TILE_KEY => {
                self.world.set_tile(player.row, player.col, TILE_EMPTY);
                self.keys += 1;
                self.events.push(SoundCue::Key);
            }
            TILE_LOCK => {
                self.world.set_tile(player.row, player.col, TILE_EMPTY);
                self.keys -= 1;
                self.events.push(SoundCue::Lock);
            }
            _ => {}
        }

        if self.world.tile_at(player.row, player.col) == TILE_TELEPORTER {
            self.teleport(&mut player);
        }
        self.player = Some(player);

        if self.dots_remaining == 0 {
            info!("level cleared with score {}", self.score);
            self.events.push(SoundCue::Win);
            self.edit();
        }
    }

    /// Jumps to the next teleporter in scan order when heading right or
    /// down, to the previous one otherwise.
    fn teleport(&mut self, player: &mut Player) {
        let Some(index) = self
            .teleporters
            .iter()
            .position(|&pos| pos == (player.row, player.col))
        else {
            return;
        };
        let count = self.teleporters.len();
        let (facing_row, facing_col) = player.facing();
        let target = if facing_col > 0 || facing_row > 0 {
            (index + 1) % count
        } else {
            (index + count - 1) % count
        };
        let (row, col) = self.teleporters[target];
        player.row = row;
        player.col = col;
        self.events.push(SoundCue::Teleport);
    }

    fn award_ghost(&mut self) {
        self.score += self.ghost_score;
        self.ghost_score *= 2;
        self.events.push(SoundCue::EatGhost);
    }

    fn kill_player(&mut self) {
        self.paused = true;
        self.events.push(SoundCue::Die);
        self.pending.push(ScheduledEvent {
            at_tick: self.tick_counter + DEATH_PAUSE_TICKS,
            generation: self.generation,
            kind: EventKind::DeathResolve,
        });
        debug!("player down at tick {}", self.tick_counter);
    }

    fn fire_due_events(&mut self) {
        let generation = self.generation;
        let now = self.tick_counter;
        let due: Vec<EventKind> = self
            .pending
            .iter()
            .filter(|e| e.generation == generation && e.at_tick <= now)
            .map(|e| e.kind)
            .collect();
        self.pending
            .retain(|e| e.generation == generation && e.at_tick > now);
        for kind in due {
            match kind {
                EventKind::DeathResolve => self.resolve_death(),
            }
        }
    }

    fn resolve_death(&mut self) {
        if self.state != SessionState::Game {
            return;
        }
        self.paused = false;
        if self.lives > 0 {
            self.lives -= 1;
            if let Some(player) = self.player.as_mut() {
                player.reset();
            }
            self.ghosts.reset_all();
        } else {
            info!("game over with score {}", self.score);
            self.edit();
        }
    }
}
