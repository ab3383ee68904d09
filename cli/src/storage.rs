//! Save-file and leaderboard storage for the console shell.
//!
//! Boards are stored as `(size, goal, row-major cells)` JSON records under
//! `saves/`; scores are one `(name, score)` record per file under `scores/`.
//! Names are never overwritten: saving under a taken name is an error, the
//! same rule the score store uses to keep the leaderboard append-only.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use twenty48_core::Grid;

const SAVE_DIR: &str = "saves";
const SCORE_DIR: &str = "scores";

#[derive(Serialize, Deserialize)]
struct SavedBoard {
    size: usize,
    goal: u32,
    cells: Vec<u32>,
}

/// One leaderboard record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub name: String,
    pub score: u64,
}

/// Write the board under `saves/<name>.json`, refusing to overwrite.
pub fn save_board(base: &Path, name: &str, grid: &Grid) -> Result<()> {
    let path = record_path(base, SAVE_DIR, name)?;
    if path.exists() {
        bail!("a save named '{name}' already exists, choose a different name");
    }
    let record = SavedBoard {
        size: grid.size(),
        goal: grid.goal(),
        cells: grid.cells().to_vec(),
    };
    write_record(&path, &serde_json::to_string_pretty(&record)?)
}

/// Read `saves/<name>.json` back into a validated grid.
///
/// The grid invariants are re-checked on load, so a hand-edited or corrupt
/// save fails here instead of poisoning a session.
pub fn load_board(base: &Path, name: &str, seed: u64) -> Result<Grid> {
    let path = record_path(base, SAVE_DIR, name)?;
    let json = fs::read_to_string(&path).with_context(|| format!("no save named '{name}'"))?;
    let record: SavedBoard =
        serde_json::from_str(&json).with_context(|| format!("malformed save file '{name}'"))?;
    let grid = Grid::from_parts(record.size, record.goal, record.cells, seed)
        .with_context(|| format!("save '{name}' holds an invalid board"))?;
    Ok(grid)
}

/// Record a final score under `scores/<name>.json`, refusing to overwrite.
pub fn save_score(base: &Path, name: &str, score: u64) -> Result<()> {
    let path = record_path(base, SCORE_DIR, name)?;
    if path.exists() {
        bail!("a score named '{name}' already exists, choose a different name");
    }
    let entry = ScoreEntry {
        name: name.to_string(),
        score,
    };
    write_record(&path, &serde_json::to_string(&entry)?)
}

/// All recorded scores, highest first. Unreadable records are skipped with a
/// warning rather than failing the whole listing.
pub fn leaderboard(base: &Path) -> Result<Vec<ScoreEntry>> {
    let dir = base.join(SCORE_DIR);
    let mut entries = Vec::new();
    let listing = match fs::read_dir(&dir) {
        Ok(listing) => listing,
        // no scores recorded yet
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(entries),
        Err(err) => {
            return Err(err).with_context(|| format!("reading score directory {}", dir.display()))
        }
    };
    for item in listing {
        let path = item?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        match fs::read_to_string(&path)
            .map_err(anyhow::Error::from)
            .and_then(|json| serde_json::from_str::<ScoreEntry>(&json).map_err(Into::into))
        {
            Ok(entry) => entries.push(entry),
            Err(err) => warn!("skipping unreadable score file {}: {err}", path.display()),
        }
    }
    entries.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
    Ok(entries)
}

/// Build `<base>/<dir>/<name>.json`, rejecting names that would escape it.
fn record_path(base: &Path, dir: &str, name: &str) -> Result<PathBuf> {
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        bail!("names may only use letters, digits, '_' and '-'");
    }
    Ok(base.join(dir).join(format!("{name}.json")))
}

fn write_record(path: &Path, json: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_board_round_trip() {
        let dir = tempdir().unwrap();
        let grid = Grid::new(4, 2048, 5).unwrap();
        save_board(dir.path(), "mygame", &grid).unwrap();

        let loaded = load_board(dir.path(), "mygame", 5).unwrap();
        assert_eq!(loaded.size(), grid.size());
        assert_eq!(loaded.goal(), grid.goal());
        assert_eq!(loaded.cells(), grid.cells());
    }

    #[test]
    fn test_save_refuses_duplicate_name() {
        let dir = tempdir().unwrap();
        let grid = Grid::new(4, 2048, 5).unwrap();
        save_board(dir.path(), "mygame", &grid).unwrap();
        assert!(save_board(dir.path(), "mygame", &grid).is_err());
    }

    #[test]
    fn test_load_missing_save_fails() {
        let dir = tempdir().unwrap();
        assert!(load_board(dir.path(), "nothere", 0).is_err());
    }

    #[test]
    fn test_load_rejects_corrupt_board() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SAVE_DIR);
        fs::create_dir_all(&path).unwrap();
        // cell 3 is not a power of 2
        fs::write(
            path.join("bad.json"),
            r#"{"size":2,"goal":16,"cells":[2,3,0,0]}"#,
        )
        .unwrap();
        assert!(load_board(dir.path(), "bad", 0).is_err());
    }

    #[test]
    fn test_rejects_path_escaping_names() {
        let dir = tempdir().unwrap();
        let grid = Grid::new(4, 2048, 5).unwrap();
        assert!(save_board(dir.path(), "../evil", &grid).is_err());
        assert!(save_board(dir.path(), "", &grid).is_err());
    }

    #[test]
    fn test_leaderboard_sorted_descending() {
        let dir = tempdir().unwrap();
        save_score(dir.path(), "alice", 120).unwrap();
        save_score(dir.path(), "bob", 360).unwrap();
        save_score(dir.path(), "carol", 240).unwrap();

        let board = leaderboard(dir.path()).unwrap();
        let names: Vec<&str> = board.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["bob", "carol", "alice"]);
    }

    #[test]
    fn test_leaderboard_empty_without_scores() {
        let dir = tempdir().unwrap();
        assert!(leaderboard(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_leaderboard_skips_unreadable_records() {
        let dir = tempdir().unwrap();
        save_score(dir.path(), "alice", 120).unwrap();
        let scores = dir.path().join(SCORE_DIR);
        fs::write(scores.join("junk.json"), "not json").unwrap();

        let board = leaderboard(dir.path()).unwrap();
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].name, "alice");
    }

    #[test]
    fn test_score_refuses_duplicate_name() {
        let dir = tempdir().unwrap();
        save_score(dir.path(), "alice", 120).unwrap();
        assert!(save_score(dir.path(), "alice", 999).is_err());
    }
}
