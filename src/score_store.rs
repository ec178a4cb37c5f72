//! Persistent best scores, one entry per shared level code.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::types::{ScoreboardEntry, ScoresResponse};

#[derive(Clone, Debug, Serialize, Deserialize)]
struct StoredScoreEntry {
    plays: u64,
    wins: u64,
    #[serde(rename = "bestScore", alias = "best_score")]
    best_score: i32,
    #[serde(rename = "updatedAtIso", alias = "updated_at_iso")]
    updated_at_iso: String,
}

#[derive(Clone, Debug, Serialize)]
struct ScoreStoreFile {
    version: u8,
    levels: HashMap<String, StoredScoreEntry>,
}

#[derive(Clone, Debug, Deserialize)]
struct ScoreStoreFileRaw {
    version: u8,
    levels: HashMap<String, serde_json::Value>,
}

pub struct ScoreStore {
    file_path: PathBuf,
    levels: HashMap<String, StoredScoreEntry>,
}

impl ScoreStore {
    pub fn new(file_path: PathBuf) -> Self {
        let levels = load_levels(&file_path);
        Self { file_path, levels }
    }

    /// Records one finished run against the level's share code.
    pub fn record_game(&mut self, level_code: &str, score: i32, won: bool) {
        if codec::decode(level_code).is_err() {
            warn!("score-store: dropping result for malformed level code");
            return;
        }
        let now_iso = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let entry = self
            .levels
            .entry(level_code.to_string())
            .or_insert_with(|| StoredScoreEntry {
                plays: 0,
                wins: 0,
                best_score: 0,
                updated_at_iso: now_iso.clone(),
            });
        entry.plays += 1;
        if won {
            entry.wins += 1;
        }
        entry.best_score = entry.best_score.max(score.max(0));
        entry.updated_at_iso = now_iso;
        self.save();
    }

    pub fn best_score(&self, level_code: &str) -> Option<i32> {
        self.levels.get(level_code).map(|entry| entry.best_score)
    }

    pub fn build_response(&self, requested_limit: Option<usize>) -> ScoresResponse {
        let limit = requested_limit.unwrap_or(10).clamp(1, 100);
        let mut entries: Vec<ScoreboardEntry> = self
            .levels
            .iter()
            .map(|(code, entry)| ScoreboardEntry {
                level: code.clone(),
                plays: entry.plays,
                wins: entry.wins.min(entry.plays),
                best_score: entry.best_score,
                updated_at_iso: entry.updated_at_iso.clone(),
            })
            .collect();
        entries.sort_by(|a, b| {
            b.best_score
                .cmp(&a.best_score)
                .then_with(|| b.plays.cmp(&a.plays))
                .then_with(|| a.level.cmp(&b.level))
        });
        entries.truncate(limit);
        ScoresResponse {
            generated_at_iso: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            entries,
        }
    }

    fn save(&self) {
        if let Some(parent) = self.file_path.parent() {
            if let Err(error) = fs::create_dir_all(parent) {
                warn!(
                    "score-store: failed to create parent dir {}: {error}",
                    parent.display()
                );
                return;
            }
        }
        let payload = ScoreStoreFile {
            version: 1,
            levels: self.levels.clone(),
        };
        match serde_json::to_string_pretty(&payload) {
            Ok(text) => {
                if let Err(error) = fs::write(&self.file_path, text) {
                    warn!(
                        "score-store: failed to write {}: {error}",
                        self.file_path.display()
                    );
                }
            }
            Err(error) => {
                warn!(
                    "score-store: failed to serialize payload for {}: {error}",
                    self.file_path.display()
                );
            }
        }
    }
}

fn load_levels(path: &Path) -> HashMap<String, StoredScoreEntry> {
    let text = match fs::read_to_string(path) {
        Ok(value) => value,
        Err(error) => {
            if error.kind() != std::io::ErrorKind::NotFound {
                warn!("score-store: failed to read {}: {error}", path.display());
            }
            return HashMap::new();
        }
    };
    let parsed: ScoreStoreFileRaw = match serde_json::from_str::<ScoreStoreFileRaw>(&text) {
        Ok(value) if value.version == 1 => value,
        Ok(value) => {
            warn!(
                "score-store: unsupported version {} at {}",
                value.version,
                path.display()
            );
            return HashMap::new();
        }
        Err(error) => {
            warn!("score-store: failed to parse {}: {error}", path.display());
            return HashMap::new();
        }
    };

    let mut sanitized = HashMap::<String, StoredScoreEntry>::new();
    for (level_code, raw_value) in parsed.levels {
        let entry: StoredScoreEntry = match serde_json::from_value(raw_value) {
            Ok(entry) => entry,
            Err(error) => {
                warn!(
                    "score-store: skipping broken entry in {}: {error}",
                    path.display()
                );
                continue;
            }
        };
        if codec::decode(&level_code).is_err() {
            warn!("score-store: skipping entry with malformed level code");
            continue;
        }
        sanitized.insert(
            level_code,
            StoredScoreEntry {
                plays: entry.plays,
                wins: entry.wins.min(entry.plays),
                best_score: entry.best_score.max(0),
                updated_at_iso: entry.updated_at_iso,
            },
        );
    }
    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{GRID_COLUMNS, GRID_ROWS, TILE_DOT, TILE_PLAYER, TILE_WALL};

    fn sample_code(extra_dot: usize) -> String {
        let mut tiles = vec![vec![TILE_WALL; GRID_COLUMNS]; GRID_ROWS];
        tiles[5][6] = TILE_PLAYER;
        tiles[5][5] = TILE_DOT;
        tiles[3][extra_dot % GRID_COLUMNS] = TILE_DOT;
        codec::encode(&tiles)
    }

    fn temp_file(name: &str) -> PathBuf {
        let unique = format!(
            "{}-{}-{}",
            name,
            std::process::id(),
            rand::random::<u64>()
        );
        std::env::temp_dir().join(unique).join("scores.json")
    }

    #[test]
    fn record_game_keeps_the_best_score() {
        let path = temp_file("score-store-record");
        let mut store = ScoreStore::new(path.clone());
        let code = sample_code(1);
        store.record_game(&code, 120, false);
        store.record_game(&code, 80, true);

        assert_eq!(store.best_score(&code), Some(120));
        let response = store.build_response(Some(10));
        assert_eq!(response.entries.len(), 1);
        assert_eq!(response.entries[0].plays, 2);
        assert_eq!(response.entries[0].wins, 1);
        assert_eq!(response.entries[0].best_score, 120);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn malformed_level_codes_are_not_recorded() {
        let path = temp_file("score-store-malformed");
        let mut store = ScoreStore::new(path.clone());
        store.record_game("definitely not a level!", 999, true);
        assert!(store.build_response(None).entries.is_empty());

        let _ = fs::remove_file(path);
    }

    #[test]
    fn scores_survive_a_reload() {
        let path = temp_file("score-store-reload");
        let code = sample_code(2);
        {
            let mut store = ScoreStore::new(path.clone());
            store.record_game(&code, 300, true);
        }
        let store = ScoreStore::new(path.clone());
        assert_eq!(store.best_score(&code), Some(300));

        let _ = fs::remove_file(&path);
        if let Some(parent) = path.parent() {
            let _ = fs::remove_dir_all(parent);
        }
    }

    #[test]
    fn load_drops_invalid_entries_and_clamps_wins() {
        let path = temp_file("score-store-partial");
        let parent = path.parent().expect("parent exists").to_path_buf();
        fs::create_dir_all(&parent).expect("create dir");
        let code = sample_code(3);
        let raw = format!(
            r#"{{
  "version": 1,
  "levels": {{
    "{code}": {{
      "plays": 1,
      "wins": 5,
      "bestScore": -10,
      "updatedAtIso": "2026-01-01T00:00:00.000Z"
    }},
    "!!!": {{
      "plays": 1,
      "wins": 0,
      "bestScore": 50,
      "updatedAtIso": "2026-01-01T00:00:00.000Z"
    }}
  }}
}}"#
        );
        fs::write(&path, raw).expect("write file");

        let store = ScoreStore::new(path.clone());
        let response = store.build_response(Some(10));
        assert_eq!(response.entries.len(), 1);
        assert_eq!(response.entries[0].wins, 1);
        assert_eq!(response.entries[0].best_score, 0);

        let _ = fs::remove_file(&path);
        let _ = fs::remove_dir_all(&parent);
    }

    #[test]
    fn build_response_limits_range() {
        let path = temp_file("score-store-limit");
        let mut store = ScoreStore::new(path.clone());
        for idx in 0..3 {
            store.record_game(&sample_code(idx + 4), (idx as i32 + 1) * 10, false);
        }
        assert_eq!(store.build_response(Some(1)).entries.len(), 1);
        assert_eq!(store.build_response(Some(0)).entries.len(), 1);
        assert_eq!(store.build_response(Some(999)).entries.len(), 3);

        let _ = fs::remove_file(path);
    }
}
