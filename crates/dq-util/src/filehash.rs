//! Streaming file hashing with XXH64, mirroring the chunked read-then-update
//! loop the original file hasher uses instead of loading the whole file.

use dq_core::{DqError, DqResult};
use std::fs::File;
use std::hash::Hasher;
use std::io::Read;
use std::path::Path;
use twox_hash::XxHash64;

const CHUNK_SIZE: usize = 1024;

/// Hash the contents of `path` with XXH64 (seed 0), reading in fixed-size
/// chunks rather than slurping the whole file into memory.
pub fn hash_file(path: &Path) -> DqResult<u64> {
    let mut file = File::open(path)
        .map_err(|e| DqError::internal(format!("cannot open {}: {}", path.display(), e)))?;
    let mut hasher = XxHash64::with_seed(0);
    let mut buf = [0u8; CHUNK_SIZE];

    loop {
        let n = file
            .read(&mut buf)
            .map_err(|e| DqError::internal(format!("read error on {}: {}", path.display(), e)))?;
        if n == 0 {
            break;
        }
        hasher.write(&buf[..n]);
    }
    Ok(hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn same_contents_hash_the_same() {
        let dir = std::env::temp_dir();
        let path_a = dir.join("dq_util_filehash_test_a.bin");
        let path_b = dir.join("dq_util_filehash_test_b.bin");
        std::fs::File::create(&path_a).unwrap().write_all(b"hello world").unwrap();
        std::fs::File::create(&path_b).unwrap().write_all(b"hello world").unwrap();

        let ha = hash_file(&path_a).unwrap();
        let hb = hash_file(&path_b).unwrap();
        assert_eq!(ha, hb);

        let _ = std::fs::remove_file(&path_a);
        let _ = std::fs::remove_file(&path_b);
    }

    #[test]
    fn different_contents_hash_differently() {
        let dir = std::env::temp_dir();
        let path_a = dir.join("dq_util_filehash_test_c.bin");
        let path_b = dir.join("dq_util_filehash_test_d.bin");
        std::fs::File::create(&path_a).unwrap().write_all(b"abc").unwrap();
        std::fs::File::create(&path_b).unwrap().write_all(b"xyz").unwrap();

        let ha = hash_file(&path_a).unwrap();
        let hb = hash_file(&path_b).unwrap();
        assert_ne!(ha, hb);

        let _ = std::fs::remove_file(&path_a);
        let _ = std::fs::remove_file(&path_b);
    }

    #[test]
    fn chunk_boundary_spanning_content_hashes_consistently() {
        let dir = std::env::temp_dir();
        let path = dir.join("dq_util_filehash_test_e.bin");
        let content = vec![7u8; CHUNK_SIZE * 3 + 17];
        std::fs::File::create(&path).unwrap().write_all(&content).unwrap();

        let h1 = hash_file(&path).unwrap();
        let h2 = hash_file(&path).unwrap();
        assert_eq!(h1, h2);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_file_is_an_error() {
        let path = std::env::temp_dir().join("dq_util_filehash_does_not_exist.bin");
        assert!(hash_file(&path).is_err());
    }
}
