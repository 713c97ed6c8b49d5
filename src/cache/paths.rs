//! Per-repository index locations under the user cache directory

use std::hash::Hasher;
use std::path::{Path, PathBuf};

use rustc_hash::FxHasher;

const APP_DIR: &str = "revgraph";
const SLUG_LEN: usize = 24;

/// Directory holding everything revgraph stores for `repo_path`:
/// `<cache root>/revgraph/<slug>-<hash>/`.
pub fn get_cache_dir(repo_path: &Path) -> PathBuf {
    cache_root().join(APP_DIR).join(repo_key(repo_path))
}

/// Directory of the commit index for `repo_path`
pub fn get_index_db_path(repo_path: &Path) -> PathBuf {
    get_cache_dir(repo_path).join("index")
}

/// Platform cache directory (`dirs` resolves `%LOCALAPPDATA%` on Windows),
/// then `~/.cache`, then the working directory.
fn cache_root() -> PathBuf {
    dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".cache")))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Readable, collision-resistant directory name for a repository.
///
/// The slug comes from the canonical path so `.` names the real directory;
/// the hash covers the whole path so equally named checkouts stay apart.
fn repo_key(repo_path: &Path) -> String {
    let canonical = repo_path
        .canonicalize()
        .unwrap_or_else(|_| repo_path.to_path_buf());

    let mut hasher = FxHasher::default();
    hasher.write(canonical.as_os_str().to_string_lossy().as_bytes());

    format!("{}-{:016x}", slug(&canonical), hasher.finish())
}

fn slug(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();
    let slug: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .take(SLUG_LEN)
        .collect();
    if slug.is_empty() {
        "repo".to_string()
    } else {
        slug
    }
}
