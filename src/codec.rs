//! Share-string codec for level grids.
//!
//! A level is serialized as three concatenated run-length segments over a
//! 64-character alphabet: walls over every cell, dots over the remaining
//! cells, then items over whatever is still open. Runs longer than the
//! alphabet allows are split with an escape continuation.

use thiserror::Error;

use crate::constants::{GRID_COLUMNS, GRID_ROWS, PALETTE_SIZE, TILE_DOT, TILE_EMPTY, TILE_WALL};

const ALPHABET: &[u8; 64] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz-.";

/// Longest wall/dot run a single character can carry.
const MAX_RUN: usize = ALPHABET.len() - 1;
/// Longest empty-cell run in the item segment, where the low characters
/// double as literal tile codes.
const MAX_ITEM_RUN: usize = ALPHABET.len() - 1 - PALETTE_SIZE as usize;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("level code ended before the grid was filled")]
    UnexpectedEnd,
    #[error("level code contains an invalid character {0:?}")]
    InvalidCharacter(char),
}

fn value_of(byte: u8) -> Option<usize> {
    ALPHABET.iter().position(|&c| c == byte)
}

fn push_run(output: &mut String, mut counter: usize) {
    while counter > MAX_RUN {
        output.push(ALPHABET[MAX_RUN] as char);
        output.push(ALPHABET[0] as char);
        counter -= MAX_RUN;
    }
    output.push(ALPHABET[counter] as char);
}

fn push_binary_segment(output: &mut String, tiles: &[Vec<u8>], skip: u8, target: u8) {
    let mut in_target = true;
    let mut counter = 0usize;
    for row in tiles {
        for &tile in row {
            if skip != target && tile == skip {
                continue;
            }
            if (tile == target) == in_target {
                counter += 1;
            } else {
                push_run(output, counter);
                in_target = !in_target;
                counter = 1;
            }
        }
    }
    push_run(output, counter);
}

fn push_item_run(output: &mut String, mut counter: usize) {
    while counter > MAX_ITEM_RUN {
        output.push(ALPHABET[MAX_ITEM_RUN + PALETTE_SIZE as usize] as char);
        counter -= MAX_ITEM_RUN;
    }
    output.push(ALPHABET[counter + PALETTE_SIZE as usize] as char);
}

/// Serializes a grid into its share string.
pub fn encode(tiles: &[Vec<u8>]) -> String {
    let mut output = String::new();
    push_binary_segment(&mut output, tiles, TILE_WALL, TILE_WALL);
    push_binary_segment(&mut output, tiles, TILE_WALL, TILE_DOT);

    // Items carry their tile code directly; only runs of open cells between
    // them get a length character. A trailing length doubles as terminator.
    let mut counter = 0usize;
    for row in tiles {
        for &tile in row {
            if tile == TILE_WALL || tile == TILE_DOT {
                continue;
            }
            if tile == TILE_EMPTY {
                counter += 1;
            } else {
                if counter > 0 {
                    push_item_run(&mut output, counter);
                    counter = 0;
                }
                output.push(ALPHABET[tile as usize] as char);
            }
        }
    }
    push_item_run(&mut output, counter);
    output
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    fn next(&mut self) -> Result<usize, CodecError> {
        let byte = *self.bytes.get(self.pos).ok_or(CodecError::UnexpectedEnd)?;
        self.pos += 1;
        value_of(byte).ok_or(CodecError::InvalidCharacter(byte as char))
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }
}

fn decode_binary_segment(
    reader: &mut Reader<'_>,
    tiles: &mut [Vec<u8>],
    target: u8,
) -> Result<(), CodecError> {
    let mut in_target = true;
    let mut value = reader.next()?;
    for row in tiles.iter_mut() {
        for tile in row.iter_mut() {
            if *tile != TILE_EMPTY {
                continue;
            }
            while value == 0 {
                in_target = !in_target;
                value = reader.next()?;
            }
            if in_target {
                *tile = target;
            }
            value -= 1;
        }
    }
    Ok(())
}

/// Parses a share string back into a full grid. Rejects the whole string on
/// any malformed character or premature end; the caller's level is untouched.
pub fn decode(input: &str) -> Result<Vec<Vec<u8>>, CodecError> {
    let mut reader = Reader::new(input);
    let mut tiles = vec![vec![TILE_EMPTY; GRID_COLUMNS]; GRID_ROWS];

    decode_binary_segment(&mut reader, &mut tiles, TILE_WALL)?;
    decode_binary_segment(&mut reader, &mut tiles, TILE_DOT)?;

    let offset = PALETTE_SIZE as usize;
    let mut value = match reader.next() {
        Ok(value) => value,
        Err(CodecError::UnexpectedEnd) => return Ok(tiles),
        Err(err) => return Err(err),
    };
    if value == 0 {
        return Ok(tiles);
    }
    'cells: for row in tiles.iter_mut() {
        for tile in row.iter_mut() {
            if *tile != TILE_EMPTY {
                continue;
            }
            if value > offset {
                value -= 1;
                if value == offset {
                    if reader.at_end() {
                        break 'cells;
                    }
                    value = reader.next()?;
                }
            } else if value < offset {
                *tile = value as u8;
                if reader.at_end() {
                    break 'cells;
                }
                value = reader.next()?;
            } else {
                // A bare zero-length run leaves the rest of the grid empty.
                break 'cells;
            }
        }
    }
    Ok(tiles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{
        DEFAULT_MAP, TILE_BARRIER, TILE_FRUIT, TILE_GHOST, TILE_KEY, TILE_PLAYER, TILE_SUPER_DOT,
        TILE_TELEPORTER,
    };

    fn grid_of(value: u8) -> Vec<Vec<u8>> {
        vec![vec![value; GRID_COLUMNS]; GRID_ROWS]
    }

    #[test]
    fn default_map_round_trips() {
        let tiles: Vec<Vec<u8>> = DEFAULT_MAP.iter().map(|row| row.to_vec()).collect();
        let code = encode(&tiles);
        assert_eq!(decode(&code).unwrap(), tiles);
    }

    #[test]
    fn all_walls_round_trips_through_run_escapes() {
        let tiles = grid_of(TILE_WALL);
        let code = encode(&tiles);
        // 399 walls cannot fit one character, so continuations are present.
        assert!(code.contains('.'));
        assert_eq!(decode(&code).unwrap(), tiles);
    }

    #[test]
    fn empty_grid_round_trips() {
        let tiles = grid_of(TILE_EMPTY);
        let code = encode(&tiles);
        assert_eq!(decode(&code).unwrap(), tiles);
    }

    #[test]
    fn walled_grid_with_a_dot_corridor_round_trips() {
        let mut tiles = grid_of(TILE_WALL);
        for row in 9..12 {
            for col in 1..18 {
                tiles[row][col] = TILE_DOT;
            }
        }
        let code = encode(&tiles);
        assert_eq!(decode(&code).unwrap(), tiles);
    }

    #[test]
    fn item_heavy_grid_round_trips() {
        let mut tiles = grid_of(TILE_EMPTY);
        tiles[0][0] = TILE_WALL;
        tiles[1][1] = TILE_DOT;
        tiles[2][2] = TILE_SUPER_DOT;
        tiles[3][3] = TILE_BARRIER;
        tiles[4][4] = TILE_TELEPORTER;
        tiles[5][5] = TILE_TELEPORTER;
        tiles[9][9] = TILE_GHOST;
        tiles[10][10] = TILE_PLAYER;
        tiles[11][11] = TILE_FRUIT;
        tiles[20][18] = 18; // decoration in the far corner
        let code = encode(&tiles);
        assert_eq!(decode(&code).unwrap(), tiles);
    }

    #[test]
    fn adjacent_items_round_trip() {
        let mut tiles = grid_of(TILE_DOT);
        tiles[7][4] = TILE_KEY;
        tiles[7][5] = TILE_FRUIT;
        tiles[7][6] = TILE_PLAYER;
        let code = encode(&tiles);
        assert_eq!(decode(&code).unwrap(), tiles);
    }

    #[test]
    fn foreign_character_is_rejected() {
        let tiles: Vec<Vec<u8>> = DEFAULT_MAP.iter().map(|row| row.to_vec()).collect();
        let mut code = encode(&tiles);
        code.insert(3, '!');
        assert_eq!(decode(&code), Err(CodecError::InvalidCharacter('!')));
    }

    #[test]
    fn truncated_code_is_rejected() {
        let tiles: Vec<Vec<u8>> = DEFAULT_MAP.iter().map(|row| row.to_vec()).collect();
        let code = encode(&tiles);
        let truncated = &code[..4];
        assert_eq!(decode(truncated), Err(CodecError::UnexpectedEnd));
    }

    #[test]
    fn empty_string_is_rejected() {
        assert_eq!(decode(""), Err(CodecError::UnexpectedEnd));
    }
}
