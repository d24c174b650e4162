//! Game directory discovery
//!
//! Only the immediate children of the source root are considered. A
//! directory qualifies when its name contains the marker, compared
//! case-insensitively.

use std::io;
use std::path::{Path, PathBuf};

use crate::error::{PackError, Result};
use crate::naming::derive_game_name;

/// A discovered game directory paired with its packaged name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameEntry {
    /// Absolute path of the game directory inside the source root.
    pub source: PathBuf,
    /// Name of the directory created under the target root.
    pub name: String,
}

impl GameEntry {
    /// Pair `source` with its derived name. A directory named exactly like
    /// the strip token keeps its full name so it never maps onto the
    /// target root itself.
    pub fn new(source: PathBuf, strip_token: &str) -> Self {
        let mut name = derive_game_name(&source, strip_token);
        if name.is_empty() {
            name = derive_game_name(&source, "");
        }
        Self { source, name }
    }
}

/// Find the game directories directly under `root`.
///
/// Entries come back in directory listing order. A missing root yields an
/// empty list; a root that exists but cannot be listed is an error.
pub fn discover_games(root: &Path, marker: &str, strip_token: &str) -> Result<Vec<GameEntry>> {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            tracing::warn!("Source directory does not exist: {}", root.display());
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(PackError::ListDir {
                path: root.to_path_buf(),
                source,
            });
        }
    };

    let marker = marker.to_lowercase();
    let mut games = Vec::new();

    for entry in entries {
        let entry = entry.map_err(|source| PackError::ListDir {
            path: root.to_path_buf(),
            source,
        })?;

        let path = entry.path();
        // is_dir follows symlinks, so a linked game directory still counts
        if !path.is_dir() {
            continue;
        }

        if entry.file_name().to_string_lossy().to_lowercase().contains(&marker) {
            games.push(GameEntry::new(path, strip_token));
        }
    }

    Ok(games)
}
