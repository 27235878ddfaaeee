//! Extractor build fingerprint
//!
//! The AcousticBrainz server identifies which extractor build produced a
//! document by the SHA-1 of the extractor binary, so the hash is computed
//! once at startup and stamped into every submission.

use crate::Result;
use sha1::{Digest, Sha1};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Calculate the lowercase hex SHA-1 of a file's contents
pub fn calculate_build_sha(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha1::new();
    let mut buffer = [0u8; 64 * 1024];

    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
