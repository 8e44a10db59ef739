//! Cache file path derivation.
//!
//! A key's SHA-256 hex digest is split into three two-character directory
//! levels; the rest of the digest plus [`CACHE_FILE_EXTENSION`] names the file:
//!
//! ```text
//! <root>/ab/cd/ef/0123...cache
//! ```

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// Extension carried by every committed cache file.
pub const CACHE_FILE_EXTENSION: &str = "cache";

/// Width of each directory level, in hex characters.
const SHARD_WIDTH: usize = 2;

/// Number of nested directory levels.
const SHARD_DEPTH: usize = 3;

/// Returns the hex SHA-256 digest of `key`.
pub fn key_digest(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

/// Maps a key to its file under `root`.
pub fn cache_path(root: &Path, key: &str) -> PathBuf {
    let digest = key_digest(key);
    let (shards, rest) = digest.split_at(SHARD_WIDTH * SHARD_DEPTH);

    let mut path = root.to_path_buf();
    for level in 0..SHARD_DEPTH {
        path.push(&shards[level * SHARD_WIDTH..(level + 1) * SHARD_WIDTH]);
    }
    path.push(format!("{rest}.{CACHE_FILE_EXTENSION}"));
    path
}

/// Returns true if `path` names a committed cache file.
pub fn is_cache_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == CACHE_FILE_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_stable() {
        assert_eq!(
            key_digest("hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_cache_path_layout() {
        let path = cache_path(Path::new("/var/cache"), "hello");
        assert_eq!(
            path,
            PathBuf::from(
                "/var/cache/2c/f2/4d/ba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824.cache"
            )
        );
    }

    #[test]
    fn test_cache_path_is_deterministic() {
        let root = Path::new("root");
        assert_eq!(cache_path(root, "key"), cache_path(root, "key"));
        assert_ne!(cache_path(root, "key"), cache_path(root, "key2"));
    }

    #[test]
    fn test_is_cache_file() {
        assert!(is_cache_file(Path::new("/a/b/abc.cache")));
        assert!(!is_cache_file(Path::new("/a/b/.tmp-abc.partial")));
        assert!(!is_cache_file(Path::new("/a/b/cache")));
        assert!(!is_cache_file(Path::new("/a/b/notes.txt")));
    }
}
