//! Versioned bincode snapshots of aggregate state.
//!
//! A snapshot is the `u16` format version followed by the bincode body
//! (standard config). Files are written to a temporary sibling and renamed
//! into place so a crash never leaves a torn snapshot behind.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::constants::SNAPSHOT_VERSION;
use crate::error::PersistError;

pub fn encode_snapshot<T: bincode::Encode>(value: &T) -> Result<Vec<u8>, PersistError> {
    let config = bincode::config::standard();
    let mut bytes = bincode::encode_to_vec(SNAPSHOT_VERSION, config)
        .map_err(|e| PersistError::Encode(e.to_string()))?;
    let body = bincode::encode_to_vec(value, config).map_err(|e| PersistError::Encode(e.to_string()))?;
    bytes.extend_from_slice(&body);
    Ok(bytes)
}

pub fn decode_snapshot<T: bincode::Decode<()>>(bytes: &[u8]) -> Result<T, PersistError> {
    let config = bincode::config::standard();
    let (version, header_len): (u16, usize) =
        bincode::decode_from_slice(bytes, config).map_err(|e| PersistError::Decode(e.to_string()))?;
    if version != SNAPSHOT_VERSION {
        return Err(PersistError::Version { found: version, expected: SNAPSHOT_VERSION });
    }
    let (value, read): (T, usize) = bincode::decode_from_slice(&bytes[header_len..], config)
        .map_err(|e| PersistError::Decode(e.to_string()))?;
    if header_len + read != bytes.len() {
        return Err(PersistError::Decode(format!(
            "{} trailing bytes",
            bytes.len() - header_len - read
        )));
    }
    Ok(value)
}

/// Atomically write a snapshot of `value` to `path`.
pub fn save_snapshot<T: bincode::Encode>(path: &Path, value: &T) -> Result<(), PersistError> {
    let bytes = encode_snapshot(value)?;
    let tmp = temp_path(path);
    fs::write(&tmp, &bytes).map_err(|e| PersistError::Io(e.to_string()))?;
    fs::rename(&tmp, path).map_err(|e| PersistError::Io(e.to_string()))?;
    debug!(path = %path.display(), bytes = bytes.len(), "snapshot saved");
    Ok(())
}

pub fn load_snapshot<T: bincode::Decode<()>>(path: &Path) -> Result<T, PersistError> {
    let bytes = fs::read(path).map_err(|e| PersistError::Io(e.to_string()))?;
    let value = decode_snapshot(&bytes)?;
    debug!(path = %path.display(), bytes = bytes.len(), "snapshot loaded");
    Ok(value)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
