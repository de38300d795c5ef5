//! SHA-256 helpers for evidence files, plus format checks for digests,
//! addresses, and transaction hashes.

use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, Read};
use std::path::Path;

const CHUNK_SIZE: usize = 8192;

/// Hash raw bytes and return a lowercase hex string.
pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Hash a file in fixed-size chunks and return a lowercase hex string.
///
/// Evidence images can be large; streaming keeps memory bounded by
/// `CHUNK_SIZE` regardless of file size.
pub(crate) fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; CHUNK_SIZE];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// True for exactly 64 lowercase hex characters.
pub(crate) fn is_sha256_hex(value: &str) -> bool {
    value.len() == 64 && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// True for `0x` followed by 64 hex characters of either case.
pub(crate) fn is_tx_hash(value: &str) -> bool {
    is_prefixed_hex(value, 64)
}

/// True for `0x` followed by 40 hex characters of either case.
pub(crate) fn is_address(value: &str) -> bool {
    is_prefixed_hex(value, 40)
}

fn is_prefixed_hex(value: &str, digits: usize) -> bool {
    match value.strip_prefix("0x") {
        Some(rest) => rest.len() == digits && rest.bytes().all(|b| b.is_ascii_hexdigit()),
        None => false,
    }
}
