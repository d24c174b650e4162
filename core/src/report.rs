//! report.json: per-game outcome of a packaging run
//!
//! The manifest only lists names. The report records, for every game,
//! whether its copy succeeded and what happened when it was compiled.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::compile::CompileOutcome;
use crate::error::{PackError, Result};

/// Bumped whenever a field is removed or changes meaning.
pub const REPORT_SCHEMA_VERSION: u32 = 1;

/// Outcome of a step that either works or fails with a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum StepStatus {
    Ok,
    Failed { reason: String },
}

impl StepStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, StepStatus::Ok)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameReport {
    pub name: String,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub copy: StepStatus,
    pub compile: CompileOutcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    pub schema_version: u32,
    pub source: PathBuf,
    pub target: PathBuf,
    pub games: Vec<GameReport>,
}

impl BuildReport {
    pub fn new(source: PathBuf, target: PathBuf) -> Self {
        Self {
            schema_version: REPORT_SCHEMA_VERSION,
            source,
            target,
            games: Vec::new(),
        }
    }

    /// Names of games that made it into the target tree, in run order.
    pub fn packaged_names(&self) -> Vec<String> {
        self.games
            .iter()
            .filter(|game| game.copy.is_ok())
            .map(|game| game.name.clone())
            .collect()
    }

    pub fn compiled_count(&self) -> usize {
        self.count(|outcome| matches!(outcome, CompileOutcome::Compiled { .. }))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|outcome| matches!(outcome, CompileOutcome::Skipped))
    }

    /// Games whose copy or compile failed.
    pub fn failed_count(&self) -> usize {
        self.games
            .iter()
            .filter(|game| !game.copy.is_ok() || game.compile.is_failed())
            .count()
    }

    fn count(&self, predicate: impl Fn(&CompileOutcome) -> bool) -> usize {
        self.games.iter().filter(|game| predicate(&game.compile)).count()
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| PackError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::CompileFailure;
    use tempfile::TempDir;

    fn game(name: &str, copy: StepStatus, compile: CompileOutcome) -> GameReport {
        GameReport {
            name: name.to_string(),
            source: PathBuf::from(format!("/src/{}_game", name)),
            destination: PathBuf::from(format!("/out/{}", name)),
            copy,
            compile,
        }
    }

    fn sample() -> BuildReport {
        let mut report = BuildReport::new(PathBuf::from("/src"), PathBuf::from("/out"));
        report.games.push(game(
            "snake",
            StepStatus::Ok,
            CompileOutcome::Compiled {
                source: "main.go".into(),
                executable: "main".into(),
            },
        ));
        report.games.push(game("pong", StepStatus::Ok, CompileOutcome::Skipped));
        report.games.push(game(
            "chess",
            StepStatus::Ok,
            CompileOutcome::Failed {
                source: "chess.go".into(),
                reason: CompileFailure::MissingArtifact("chess".into()),
            },
        ));
        report.games.push(game(
            "maze",
            StepStatus::Failed {
                reason: "permission denied".into(),
            },
            CompileOutcome::NotAttempted,
        ));
        report
    }

    #[test]
    fn test_counts() {
        let report = sample();
        assert_eq!(report.compiled_count(), 1);
        assert_eq!(report.skipped_count(), 1);
        assert_eq!(report.failed_count(), 2);
        assert_eq!(report.packaged_names(), vec!["snake", "pong", "chess"]);
    }

    #[test]
    fn test_json_shape() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.json");
        sample().write(&path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["schemaVersion"], REPORT_SCHEMA_VERSION);
        assert_eq!(json["games"][0]["compile"]["status"], "compiled");
        assert_eq!(json["games"][0]["compile"]["executable"], "main");
        assert_eq!(json["games"][1]["compile"]["status"], "skipped");
        assert_eq!(json["games"][2]["compile"]["status"], "failed");
        assert_eq!(json["games"][3]["copy"]["status"], "failed");
        assert_eq!(json["games"][3]["compile"]["status"], "notAttempted");
    }
}
