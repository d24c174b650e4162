//! One packaging run: discover, copy, compile, then write the manifest.

use std::path::{Path, PathBuf};

use crate::compile::{CompileOutcome, Toolchain, compile_game};
use crate::config::{CopyFailurePolicy, PackConfig};
use crate::copy::copy_and_overwrite;
use crate::discovery::discover_games;
use crate::error::{PackError, Result};
use crate::manifest::write_manifest;
use crate::report::{BuildReport, GameReport, StepStatus};

/// Source and target roots of a run
#[derive(Debug, Clone)]
pub struct PackRequest {
    pub source: PathBuf,
    pub target: PathBuf,
    /// Write `report.json` next to the manifest.
    pub write_report: bool,
}

impl PackRequest {
    /// Resolve `source` and `target` against `cwd`. Absolute inputs are kept.
    pub fn resolve(cwd: &Path, source: &Path, target: &Path) -> Self {
        Self {
            source: cwd.join(source),
            target: cwd.join(target),
            write_report: true,
        }
    }
}

/// Package every game under `request.source` into `request.target`.
///
/// Compile failures are recorded and never stop the run. A copy failure
/// stops it under [`CopyFailurePolicy::Abort`]; games copied before that
/// stay on disk and no manifest is written.
pub fn run(request: &PackRequest, config: &PackConfig) -> Result<BuildReport> {
    tracing::info!("Source path: {}", request.source.display());

    let games = discover_games(&request.source, &config.marker, &config.strip_token)?;
    tracing::info!("Found {} game directories", games.len());
    for game in &games {
        tracing::info!("  {} -> {}", game.source.display(), game.name);
    }

    std::fs::create_dir_all(&request.target).map_err(|source| PackError::CreateTarget {
        path: request.target.clone(),
        source,
    })?;
    tracing::info!("Target path: {}", request.target.display());

    let toolchain = Toolchain::from_config(config);
    tracing::debug!(
        "Compiler: {} (timeout {:?})",
        toolchain.program().display(),
        toolchain.timeout()
    );

    let mut report = BuildReport::new(request.source.clone(), request.target.clone());

    for game in games {
        let destination = request.target.join(&game.name);
        tracing::info!("Packaging {}...", game.name);

        let (copy, compile) = match copy_and_overwrite(&game.source, &destination) {
            Ok(()) => {
                let outcome = compile_game(&destination, &toolchain, &config.source_extension);
                (StepStatus::Ok, outcome)
            }
            Err(err)
                if err.is_copy_failure()
                    && config.on_copy_failure == CopyFailurePolicy::Continue =>
            {
                tracing::warn!("  Copy failed, continuing: {}", err);
                // An overlapping destination is the source itself; leave it
                if !matches!(err, PackError::Overlap { .. }) {
                    discard_partial_copy(&destination);
                }
                let status = StepStatus::Failed {
                    reason: err.to_string(),
                };
                (status, CompileOutcome::NotAttempted)
            }
            Err(err) => return Err(err),
        };

        report.games.push(GameReport {
            name: game.name,
            source: game.source,
            destination,
            copy,
            compile,
        });
    }

    let manifest_path = request.target.join(&config.manifest_file);
    let manifest = write_manifest(&manifest_path, &report.packaged_names())?;
    tracing::info!(
        "Wrote {} ({} games)",
        manifest_path.display(),
        manifest.number_of_games
    );

    if request.write_report {
        let report_path = request.target.join(&config.report_file);
        report.write(&report_path)?;
        tracing::debug!("Wrote {}", report_path.display());
    }

    tracing::info!(
        "{} compiled, {} skipped, {} failed",
        report.compiled_count(),
        report.skipped_count(),
        report.failed_count()
    );

    Ok(report)
}

/// Remove what a failed copy left behind so the target only holds games
/// that are listed in the manifest.
fn discard_partial_copy(destination: &Path) {
    if !destination.exists() && !destination.is_symlink() {
        return;
    }
    let result = if destination.is_dir() && !destination.is_symlink() {
        std::fs::remove_dir_all(destination)
    } else {
        std::fs::remove_file(destination)
    };
    if let Err(err) = result {
        tracing::warn!(
            "  Failed to remove partial copy {}: {}",
            destination.display(),
            err
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::GameManifest;
    use std::fs;
    use tempfile::TempDir;

    fn read_manifest(target: &Path) -> GameManifest {
        let json = fs::read_to_string(target.join("metadata.json")).unwrap();
        serde_json::from_str(&json).unwrap()
    }

    fn request(root: &Path) -> PackRequest {
        PackRequest::resolve(root, Path::new("src"), Path::new("out"))
    }

    #[test]
    fn test_resolve_keeps_absolute_paths() {
        let request = PackRequest::resolve(Path::new("/work"), Path::new("games"), Path::new("/dist"));
        assert_eq!(request.source, PathBuf::from("/work/games"));
        assert_eq!(request.target, PathBuf::from("/dist"));
        assert!(request.write_report);
    }

    #[test]
    fn test_games_without_source_are_copied_uncompiled() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("src/x_game")).unwrap();
        fs::create_dir_all(root.path().join("src/y_game")).unwrap();
        fs::write(root.path().join("src/x_game/readme.txt"), "x").unwrap();

        let report = run(&request(root.path()), &PackConfig::default()).unwrap();

        let out = root.path().join("out");
        assert!(out.join("x/readme.txt").is_file());
        assert!(out.join("y").is_dir());

        let mut manifest = read_manifest(&out);
        manifest.game_names.sort();
        assert_eq!(manifest.game_names, vec!["x", "y"]);
        assert_eq!(manifest.number_of_games, 2);
        assert_eq!(report.skipped_count(), 2);
        assert!(out.join("report.json").is_file());
    }

    #[test]
    fn test_missing_source_root_writes_empty_manifest() {
        let root = TempDir::new().unwrap();

        let report = run(&request(root.path()), &PackConfig::default()).unwrap();

        assert!(report.games.is_empty());
        assert_eq!(read_manifest(&root.path().join("out")), GameManifest::new(vec![]));
    }

    #[test]
    fn test_report_can_be_disabled() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("src/x_game")).unwrap();
        let mut request = request(root.path());
        request.write_report = false;

        run(&request, &PackConfig::default()).unwrap();

        assert!(root.path().join("out/metadata.json").is_file());
        assert!(!root.path().join("out/report.json").exists());
    }

    #[test]
    fn test_target_equal_to_source_never_deletes_sources() {
        let root = TempDir::new().unwrap();
        let games = root.path().join("games");
        fs::create_dir_all(games.join("MiniGames")).unwrap();
        fs::write(games.join("MiniGames/main.go"), "package main").unwrap();
        let request = PackRequest::resolve(root.path(), Path::new("games"), Path::new("games"));

        let err = run(&request, &PackConfig::default()).unwrap_err();
        assert!(matches!(err, PackError::Overlap { .. }));
        assert!(games.join("MiniGames/main.go").is_file());

        let config = PackConfig {
            on_copy_failure: CopyFailurePolicy::Continue,
            ..PackConfig::default()
        };
        let report = run(&request, &config).unwrap();
        assert_eq!(report.failed_count(), 1);
        assert!(games.join("MiniGames/main.go").is_file());
    }

    #[test]
    fn test_custom_file_names_and_marker() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("src/maze-level")).unwrap();
        fs::create_dir_all(root.path().join("src/snake_game")).unwrap();
        let config = PackConfig {
            marker: "LEVEL".into(),
            strip_token: "-level".into(),
            manifest_file: "games.json".into(),
            ..PackConfig::default()
        };

        run(&request(root.path()), &config).unwrap();

        let json = fs::read_to_string(root.path().join("out/games.json")).unwrap();
        let manifest: GameManifest = serde_json::from_str(&json).unwrap();
        assert_eq!(manifest.game_names, vec!["maze"]);
        assert!(!root.path().join("out/snake_game").exists());
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn fake_compiler(dir: &Path) -> Vec<String> {
            let script = dir.join("fake-go.sh");
            fs::write(&script, "[ \"$1\" = build ] || exit 9\ncp \"$4\" \"$3\"\n").unwrap();
            vec!["sh".into(), script.display().to_string(), "build".into()]
        }

        #[test]
        fn test_end_to_end_compiles_marker_directories_only() {
            let root = TempDir::new().unwrap();
            fs::create_dir_all(root.path().join("src/alpha_game")).unwrap();
            fs::create_dir_all(root.path().join("src/beta")).unwrap();
            fs::write(
                root.path().join("src/alpha_game/main.go"),
                "package main\n\nfunc main() {}\n",
            )
            .unwrap();
            let config = PackConfig {
                compile_command: fake_compiler(root.path()),
                ..PackConfig::default()
            };

            let report = run(&request(root.path()), &config).unwrap();

            let out = root.path().join("out");
            let exe = out.join("alpha/main");
            assert!(exe.is_file());
            assert_eq!(fs::metadata(&exe).unwrap().permissions().mode() & 0o111, 0o111);
            assert!(!out.join("beta").exists());
            assert_eq!(read_manifest(&out), GameManifest::new(vec!["alpha".into()]));
            assert_eq!(report.compiled_count(), 1);
            // Sources stay untouched
            assert!(!root.path().join("src/alpha_game/main").exists());
        }

        #[test]
        fn test_compile_failure_does_not_stop_the_batch() {
            let root = TempDir::new().unwrap();
            for game in ["one_game", "two_game"] {
                fs::create_dir_all(root.path().join("src").join(game)).unwrap();
                fs::write(root.path().join("src").join(game).join("main.go"), "").unwrap();
            }
            let config = PackConfig {
                compile_command: vec![root.path().join("missing-go").display().to_string()],
                ..PackConfig::default()
            };

            let report = run(&request(root.path()), &config).unwrap();

            assert_eq!(report.failed_count(), 2);
            let mut manifest = read_manifest(&root.path().join("out"));
            manifest.game_names.sort();
            assert_eq!(manifest.game_names, vec!["one", "two"]);
        }

        /// Game directory whose copy fails for every user, root included.
        fn broken_game(root: &Path) {
            let broken = root.join("src/broken_game");
            fs::create_dir_all(&broken).unwrap();
            fs::write(broken.join("main.go"), "").unwrap();
            std::os::unix::fs::symlink("/nonexistent/gamepack/asset", broken.join("dangling"))
                .unwrap();
        }

        #[test]
        fn test_copy_failure_aborts_by_default() {
            let root = TempDir::new().unwrap();
            broken_game(root.path());

            let err = run(&request(root.path()), &PackConfig::default()).unwrap_err();

            assert!(err.is_copy_failure());
            assert!(!root.path().join("out/metadata.json").exists());
        }

        #[test]
        fn test_copy_failure_continue_discards_partial_copy() {
            let root = TempDir::new().unwrap();
            broken_game(root.path());
            fs::create_dir_all(root.path().join("src/snake_game")).unwrap();
            let config = PackConfig {
                on_copy_failure: CopyFailurePolicy::Continue,
                ..PackConfig::default()
            };

            let report = run(&request(root.path()), &config).unwrap();

            assert_eq!(report.failed_count(), 1);
            let broken = report.games.iter().find(|g| g.name == "broken").unwrap();
            assert!(!broken.copy.is_ok());
            assert_eq!(broken.compile, CompileOutcome::NotAttempted);
            assert!(!root.path().join("out/broken").exists());
            assert_eq!(
                read_manifest(&root.path().join("out")),
                GameManifest::new(vec!["snake".into()])
            );
        }
    }
}
