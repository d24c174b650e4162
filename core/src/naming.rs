//! Packaged game names

use std::path::Path;

/// Derive the packaged name of a game directory.
///
/// Every occurrence of `strip_token` is removed from the base name, not only
/// a trailing one, so `foo_game_bar_game` becomes `foo_bar`.
pub fn derive_game_name(path: &Path, strip_token: &str) -> String {
    let base = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    if strip_token.is_empty() {
        base
    } else {
        base.replace(strip_token, "")
    }
}
