//! metadata.json writer

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{PackError, Result};

/// Summary of a packaged collection, as read by the game launcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameManifest {
    pub game_names: Vec<String>,
    pub number_of_games: usize,
}

impl GameManifest {
    pub fn new(game_names: Vec<String>) -> Self {
        let number_of_games = game_names.len();
        Self {
            game_names,
            number_of_games,
        }
    }
}

/// Write the manifest for `game_names` to `path`, replacing any previous file.
pub fn write_manifest(path: &Path, game_names: &[String]) -> Result<GameManifest> {
    let manifest = GameManifest::new(game_names.to_vec());
    let json = serde_json::to_string_pretty(&manifest)?;

    std::fs::write(path, json).map_err(|source| PackError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(manifest)
}
