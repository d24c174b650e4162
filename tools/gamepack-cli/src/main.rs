//! gamepack - package a collection of mini-games
//!
//! # Usage
//!
//! ```bash
//! # Copy every *game* directory of ./games into ./dist, compile each
//! # game's Go source and write dist/metadata.json
//! gamepack games dist
//!
//! # Keep going when a game directory cannot be copied
//! gamepack games dist --keep-going
//! ```
//!
//! # Config (gamepack.toml)
//!
//! Read from the working directory when present, or from `--config`.
//!
//! ```toml
//! marker = "game"
//! strip_token = "_game"
//! source_extension = ".go"
//! compile_command = ["go", "build"]
//! compile_timeout_secs = 300
//! ```
//!
//! Logging honours `RUST_LOG` (default `info`).

mod pack;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = pack::PackArgs::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    pack::execute(args)
}
