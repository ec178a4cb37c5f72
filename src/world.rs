use crate::constants::{DEFAULT_MAP, GRID_COLUMNS, GRID_ROWS, TILE_EMPTY};

/// The tile grid. Coordinates are (row, column) and every lookup wraps
/// toroidally, so any integer delta is a valid offset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct World {
    columns: usize,
    rows: usize,
    map: Vec<Vec<u8>>,
    saved: Option<Vec<Vec<u8>>>,
}

impl World {
    /// The built-in starter maze.
    pub fn new() -> Self {
        let map = DEFAULT_MAP.iter().map(|row| row.to_vec()).collect();
        Self {
            columns: GRID_COLUMNS,
            rows: GRID_ROWS,
            map,
            saved: None,
        }
    }

    pub fn empty() -> Self {
        Self {
            columns: GRID_COLUMNS,
            rows: GRID_ROWS,
            map: vec![vec![TILE_EMPTY; GRID_COLUMNS]; GRID_ROWS],
            saved: None,
        }
    }

    /// Wraps an existing tile map. Rows are padded or truncated to the
    /// canonical dimensions so the grid shape contract always holds.
    pub fn from_map(map: Vec<Vec<u8>>) -> Self {
        let mut normalized = vec![vec![TILE_EMPTY; GRID_COLUMNS]; GRID_ROWS];
        for (y, row) in map.into_iter().take(GRID_ROWS).enumerate() {
            for (x, value) in row.into_iter().take(GRID_COLUMNS).enumerate() {
                normalized[y][x] = value;
            }
        }
        Self {
            columns: GRID_COLUMNS,
            rows: GRID_ROWS,
            map: normalized,
            saved: None,
        }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn tiles(&self) -> &[Vec<u8>] {
        &self.map
    }

    /// The last saved snapshot, or the live grid when nothing was saved.
    pub fn saved_tiles(&self) -> &[Vec<u8>] {
        self.saved.as_deref().unwrap_or(&self.map)
    }

    pub fn wrap_row(&self, row: usize, delta: i32) -> usize {
        (row as i32 + delta).rem_euclid(self.rows as i32) as usize
    }

    pub fn wrap_col(&self, col: usize, delta: i32) -> usize {
        (col as i32 + delta).rem_euclid(self.columns as i32) as usize
    }

    pub fn tile_at(&self, row: usize, col: usize) -> u8 {
        self.map[row % self.rows][col % self.columns]
    }

    pub fn tile_relative(&self, row: usize, col: usize, d_row: i32, d_col: i32) -> u8 {
        self.map[self.wrap_row(row, d_row)][self.wrap_col(col, d_col)]
    }

    pub fn set_tile(&mut self, row: usize, col: usize, value: u8) {
        self.map[row % self.rows][col % self.columns] = value;
    }

    /// Deep snapshot of the current grid.
    pub fn save(&mut self) {
        self.saved = Some(self.map.clone());
    }

    /// Restores the last snapshot bit-for-bit. No-op when nothing was saved.
    pub fn load(&mut self) {
        if let Some(saved) = &self.saved {
            self.map = saved.clone();
        }
    }

    pub fn clear(&mut self) {
        for row in &mut self.map {
            row.fill(TILE_EMPTY);
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{TILE_DOT, TILE_WALL};

    #[test]
    fn wrap_round_trips_for_any_delta() {
        let world = World::empty();
        for row in 0..world.rows() {
            for delta in [-50i32, -21, -1, 0, 1, 20, 21, 99] {
                let wrapped = world.wrap_row(row, delta);
                assert!(wrapped < world.rows());
                assert_eq!(world.wrap_row(wrapped, -delta), row);
            }
        }
        for col in 0..world.columns() {
            for delta in [-40i32, -19, -1, 0, 1, 18, 19, 77] {
                let wrapped = world.wrap_col(col, delta);
                assert!(wrapped < world.columns());
                assert_eq!(world.wrap_col(wrapped, -delta), col);
            }
        }
    }

    #[test]
    fn tile_relative_wraps_both_edges() {
        let mut world = World::empty();
        world.set_tile(0, 0, TILE_WALL);
        world.set_tile(GRID_ROWS - 1, GRID_COLUMNS - 1, TILE_DOT);
        assert_eq!(world.tile_relative(GRID_ROWS - 1, GRID_COLUMNS - 1, 1, 1), TILE_WALL);
        assert_eq!(world.tile_relative(0, 0, -1, -1), TILE_DOT);
    }

    #[test]
    fn save_then_load_restores_mutations() {
        let mut world = World::new();
        world.save();
        let before = world.tiles().to_vec();
        world.clear();
        world.set_tile(3, 3, TILE_WALL);
        world.load();
        assert_eq!(world.tiles(), &before[..]);
    }

    #[test]
    fn load_without_save_is_a_no_op() {
        let mut world = World::new();
        let before = world.tiles().to_vec();
        world.load();
        assert_eq!(world.tiles(), &before[..]);
    }

    #[test]
    fn clear_empties_every_cell() {
        let mut world = World::new();
        world.clear();
        assert!(world.tiles().iter().flatten().all(|&value| value == TILE_EMPTY));
    }
}
