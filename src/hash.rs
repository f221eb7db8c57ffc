//! BLAKE3 hashing for written config files
//!
//! Install records the hash of every config file it writes; uninstall
//! compares against it to tell operator edits from untouched output.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use blake3::Hasher;

use crate::error::{self, Result};

/// Hash prefix for BLAKE3 hashes
pub const HASH_PREFIX: &str = "blake3:";

/// BLAKE3 hash of in-memory contents
pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{}{}", HASH_PREFIX, blake3::hash(bytes).to_hex())
}

/// Calculate BLAKE3 hash of a file
pub fn hash_file(path: &Path) -> Result<String> {
    let read_failed = |e: std::io::Error| error::file_read_failed(path.display().to_string(), e.to_string());
    let file = File::open(path).map_err(read_failed)?;

    let mut reader = BufReader::new(file);
    let mut hasher = Hasher::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader.read(&mut buffer).map_err(read_failed)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{}{}", HASH_PREFIX, hasher.finalize().to_hex()))
}

/// Verify a hash matches the expected value
pub fn verify_hash(expected: &str, actual: &str) -> bool {
    let normalize = |h: &str| h.strip_prefix(HASH_PREFIX).unwrap_or(h).to_string();
    normalize(expected) == normalize(actual)
}

/// Whether the file at `path` still has the recorded hash
///
/// A missing file is treated as unchanged.
pub fn is_unchanged(path: &Path, recorded: &str) -> Result<bool> {
    if !path.exists() {
        return Ok(true);
    }
    Ok(verify_hash(recorded, &hash_file(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_hash_file_matches_bytes() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("test.conf");
        std::fs::write(&file_path, "test content").unwrap();

        let hash = hash_file(&file_path).unwrap();
        assert!(hash.starts_with(HASH_PREFIX));
        assert_eq!(hash, hash_bytes(b"test content"));
    }

    #[test]
    fn test_hash_file_not_found() {
        let result = hash_file(Path::new("/nonexistent/file.txt"));
        assert!(result.is_err());
    }

    #[test]
    fn test_verify_hash() {
        let hash1 = format!("{}abc123", HASH_PREFIX);
        assert!(verify_hash(&hash1, &hash1.clone()));
        assert!(verify_hash(&hash1, "abc123"));
        assert!(!verify_hash(&hash1, &format!("{}def456", HASH_PREFIX)));
    }

    #[test]
    fn test_is_unchanged() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("api-paste.ini");
        std::fs::write(&path, "[DEFAULT]\n").unwrap();
        let recorded = hash_file(&path).unwrap();
        assert!(is_unchanged(&path, &recorded).unwrap());

        std::fs::write(&path, "[DEFAULT]\nverbose = True\n").unwrap();
        assert!(!is_unchanged(&path, &recorded).unwrap());

        std::fs::remove_file(&path).unwrap();
        assert!(is_unchanged(&path, &recorded).unwrap());
    }
}
