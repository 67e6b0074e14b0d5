//! Directory-backed snapshot slots.
//!
//! Each topic maps to `<hex(topic)>.snap` inside the store directory, so any
//! topic string is a valid file name and the mapping can be reversed when
//! listing slots at startup. Writes land in a temp file in the same directory
//! and are renamed over the slot once synced.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tempfile::NamedTempFile;
use tracing::warn;

use crate::persistence::SnapshotStore;
use crate::utils::error::StorageError;

const SLOT_EXT: &str = "snap";

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Use `dir` for snapshot slots, creating it if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn slot_path(&self, topic: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{SLOT_EXT}", hex_encode(topic.as_bytes())))
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn hex_decode(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok())
        .collect()
}

fn slot_topic(path: &Path) -> Result<String, StorageError> {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    hex_decode(stem)
        .and_then(|raw| String::from_utf8(raw).ok())
        .filter(|topic| !topic.is_empty())
        .ok_or_else(|| StorageError::InvalidSlot(path.display().to_string()))
}

impl SnapshotStore for FileStore {
    fn save(&self, topic: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.slot_path(topic)).map_err(|e| e.error)?;
        Ok(())
    }

    fn load(&self, topic: &str) -> Result<Option<Bytes>, StorageError> {
        match fs::read(self.slot_path(topic)) {
            Ok(raw) => Ok(Some(Bytes::from(raw))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn topics(&self) -> Result<Vec<String>, StorageError> {
        let mut topics = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(SLOT_EXT) {
                continue;
            }
            match slot_topic(&path) {
                Ok(topic) => topics.push(topic),
                Err(e) => warn!("ignoring snapshot slot: {e}"),
            }
        }
        topics.sort();
        Ok(topics)
    }
}
