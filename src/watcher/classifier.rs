//! Path classification for mod artifacts.
//!
//! Decides whether a filesystem path names a game modification package
//! worth reporting. Pure and stateless: no I/O, never fails.

use std::path::Path;

/// Extensions (lowercase, without the dot) recognised as mod artifacts.
pub const MOD_EXTENSIONS: &[&str] = &["esp", "esm", "bsa", "ba2", "pak", "jar"];

/// Check if `path` names a relevant mod artifact.
///
/// Rejects partial-write markers (`~` prefix, `~` right before the
/// extension, `.tmp` suffix) and anything whose extension is not in
/// [`MOD_EXTENSIONS`]. Extension matching is case-insensitive.
pub fn is_relevant(path: &Path) -> bool {
    let Some(name) = mod_name(path) else {
        return false;
    };

    if name.starts_with('~') || name.ends_with(".tmp") {
        return false;
    }

    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return false;
    };
    if stem.ends_with('~') {
        return false;
    }

    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => {
            let ext = ext.to_ascii_lowercase();
            MOD_EXTENSIONS.contains(&ext.as_str())
        }
        None => false,
    }
}

/// Identifier used to key pending changes: the final path segment.
///
/// Returns `None` for empty paths, `..`, or names that are not valid UTF-8.
pub fn mod_name(path: &Path) -> Option<&str> {
    path.file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
}
