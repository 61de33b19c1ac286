//! Content hashing for dedup classification (§4.4).

use crate::error::{AppError, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const CHUNK_SIZE: usize = 64 * 1024;

/// Streams `path` through `SHA-256` and returns the digest as 64 lowercase
/// hex characters, matching [`crate::models::blocked_hash::validate_hash`].
///
/// # Errors
///
/// Returns [`AppError::IoError`] if the file cannot be opened or read.
pub fn hash_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| AppError::io(path.to_string_lossy(), e))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; CHUNK_SIZE];

    loop {
        let read = file
            .read(&mut buffer)
            .map_err(|e| AppError::io(path.to_string_lossy(), e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn hashing_is_deterministic_and_lowercase_hex() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.mp3");
        std::fs::write(&path, b"some audio bytes").unwrap();

        let first = hash_file(&path).unwrap();
        let second = hash_file(&path).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn different_content_hashes_differently() {
        let dir = tempfile::tempdir().unwrap();
        let path_a = dir.path().join("a.mp3");
        let path_b = dir.path().join("b.mp3");
        std::fs::write(&path_a, b"aaaa").unwrap();
        std::fs::write(&path_b, b"bbbb").unwrap();

        assert_ne!(hash_file(&path_a).unwrap(), hash_file(&path_b).unwrap());
    }

    #[test]
    fn hashing_across_chunk_boundary_matches_single_shot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.mp3");
        let mut file = File::create(&path).unwrap();
        let chunk = vec![b'x'; CHUNK_SIZE + 37];
        file.write_all(&chunk).unwrap();
        drop(file);

        let mut hasher = Sha256::new();
        hasher.update(&chunk);
        let expected = hex::encode(hasher.finalize());

        assert_eq!(hash_file(&path).unwrap(), expected);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = hash_file(Path::new("/nonexistent/path/book.mp3"));
        assert!(matches!(result, Err(AppError::IoError { .. })));
    }
}
