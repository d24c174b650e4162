//! Pack command - discover, copy and compile games, then write the manifest

use anyhow::{Context, Result};
use clap::Parser;
use gamepack_core::{BuildReport, CompileOutcome, CopyFailurePolicy, PackConfig, PackRequest};
use std::path::PathBuf;

/// Package a collection of mini-games
#[derive(Debug, Parser)]
#[command(name = "gamepack")]
#[command(about = "Copy, compile and catalogue mini-game directories")]
#[command(version)]
pub struct PackArgs {
    /// Directory whose immediate *game* subdirectories are packaged
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Directory receiving the packaged games and metadata.json
    #[arg(value_name = "TARGET")]
    pub target: PathBuf,

    /// Config file (default: gamepack.toml in the current directory, if any)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Seconds a single compile may take before it is killed
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Record copy failures and continue with the next game
    #[arg(long)]
    pub keep_going: bool,

    /// Do not write report.json
    #[arg(long)]
    pub no_report: bool,
}

impl PackArgs {
    fn apply_overrides(&self, config: &mut PackConfig) {
        if let Some(secs) = self.timeout {
            config.compile_timeout_secs = secs;
        }
        if self.keep_going {
            config.on_copy_failure = CopyFailurePolicy::Continue;
        }
    }
}

/// Execute the pack command
pub fn execute(args: PackArgs) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;

    let mut config = PackConfig::discover(args.config.as_deref(), &cwd)?;
    args.apply_overrides(&mut config);
    config.validate()?;

    let mut request = PackRequest::resolve(&cwd, &args.source, &args.target);
    request.write_report = !args.no_report;

    let report = gamepack_core::run(&request, &config).with_context(|| {
        format!(
            "Failed to package games from {} into {}",
            request.source.display(),
            request.target.display()
        )
    })?;

    print_summary(&report, &config);
    Ok(())
}

fn print_summary(report: &BuildReport, config: &PackConfig) {
    println!();
    for game in &report.games {
        let status = match (game.copy.is_ok(), &game.compile) {
            (false, _) => "✗ copy failed".to_string(),
            (true, CompileOutcome::Compiled { executable, .. }) => format!("✓ {}", executable),
            (true, CompileOutcome::Skipped) => "⊘ no source".to_string(),
            (true, CompileOutcome::Failed { reason, .. }) => format!("✗ {}", reason),
            (true, CompileOutcome::NotAttempted) => "⊘ not compiled".to_string(),
        };
        println!("  {:<20} {}", game.name, status);
    }

    println!();
    println!(
        "Done! {} games packaged: {} compiled, {} skipped, {} failed",
        report.packaged_names().len(),
        report.compiled_count(),
        report.skipped_count(),
        report.failed_count()
    );
    println!(
        "Manifest: {}",
        report.target.join(&config.manifest_file).display()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        PackArgs::command().debug_assert();
    }

    #[test]
    fn test_requires_exactly_two_positionals() {
        assert!(PackArgs::try_parse_from(["gamepack"]).is_err());
        assert!(PackArgs::try_parse_from(["gamepack", "games"]).is_err());
        assert!(PackArgs::try_parse_from(["gamepack", "games", "dist", "extra"]).is_err());

        let args = PackArgs::try_parse_from(["gamepack", "games", "dist"]).unwrap();
        assert_eq!(args.source, PathBuf::from("games"));
        assert_eq!(args.target, PathBuf::from("dist"));
        assert!(!args.keep_going);
    }

    #[test]
    fn test_overrides() {
        let args =
            PackArgs::try_parse_from(["gamepack", "a", "b", "--timeout", "5", "--keep-going"])
                .unwrap();
        let mut config = PackConfig::default();
        args.apply_overrides(&mut config);

        assert_eq!(config.compile_timeout_secs, 5);
        assert_eq!(config.on_copy_failure, CopyFailurePolicy::Continue);
    }
}
