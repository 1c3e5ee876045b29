//! Durable storage of the index and metadata as two artifacts under one root.
//!
//! Index artifact layout (all little-endian):
//!
//! | bytes | field                      |
//! |-------|----------------------------|
//! | 4     | magic `RVIX`               |
//! | 4     | format version (`u32`)     |
//! | 4     | dimension (`u32`)          |
//! | 8     | vector count (`u64`)       |
//! | 4·n·d | components (`f32`)         |
//!
//! The metadata artifact is pretty-printed JSON of [`MetadataStore`].

use crate::error::{StoreError, StoreResult};
use crate::metadata::MetadataStore;
use crate::vector_index::{FlatIndex, VectorIndex};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the binary index artifact.
pub const INDEX_FILE: &str = "vector_index.bin";

/// File name of the JSON metadata artifact.
pub const METADATA_FILE: &str = "metadata.json";

const MAGIC: &[u8; 4] = b"RVIX";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 20;

/// Reads and writes the two store artifacts under a root directory.
#[derive(Debug, Clone)]
pub struct Persistence {
    root: PathBuf,
    index_path: PathBuf,
    metadata_path: PathBuf,
}

impl Persistence {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            index_path: root.join(INDEX_FILE),
            metadata_path: root.join(METADATA_FILE),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn metadata_path(&self) -> &Path {
        &self.metadata_path
    }

    /// Write both artifacts, replacing any previous ones.
    ///
    /// Both are staged to temp files before either is renamed into place, so
    /// a failed serialization or write leaves the previous pair intact. The
    /// previous index is kept as a backup until the metadata rename succeeds
    /// and is restored if it fails.
    pub fn save(&self, index: &FlatIndex, metadata: &MetadataStore) -> StoreResult<()> {
        if index.size() != metadata.len() {
            return Err(StoreError::write(
                &self.root,
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!(
                        "refusing to save {} vectors with {} metadata records",
                        index.size(),
                        metadata.len()
                    ),
                ),
            ));
        }

        fs::create_dir_all(&self.root).map_err(|e| StoreError::write(&self.root, e))?;

        let index_bytes = encode_index(index)?;
        let metadata_json = serde_json::to_vec_pretty(metadata).map_err(|e| {
            StoreError::write(
                &self.metadata_path,
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })?;

        let index_tmp = tmp_path(&self.index_path);
        let metadata_tmp = tmp_path(&self.metadata_path);

        let staged = fs::write(&index_tmp, &index_bytes)
            .map_err(|e| StoreError::write(&index_tmp, e))
            .and_then(|_| {
                fs::write(&metadata_tmp, &metadata_json)
                    .map_err(|e| StoreError::write(&metadata_tmp, e))
            });
        if let Err(e) = staged {
            let _ = fs::remove_file(&index_tmp);
            let _ = fs::remove_file(&metadata_tmp);
            return Err(e);
        }

        self.swap_in(&index_tmp, &metadata_tmp)?;

        tracing::debug!(
            "Saved {} vectors and metadata to {:?}",
            index.size(),
            self.root
        );
        Ok(())
    }

    /// Rename both staged files over the live pair.
    ///
    /// On any failure the live pair is left as it was before the call and the
    /// staged files are removed.
    fn swap_in(&self, index_tmp: &Path, metadata_tmp: &Path) -> StoreResult<()> {
        let backup = backup_path(&self.index_path);
        let had_index = self.index_path.exists();

        if had_index {
            if let Err(e) = fs::rename(&self.index_path, &backup) {
                let _ = fs::remove_file(index_tmp);
                let _ = fs::remove_file(metadata_tmp);
                return Err(StoreError::write(&self.index_path, e));
            }
        }

        if let Err(e) = fs::rename(index_tmp, &self.index_path) {
            let _ = fs::remove_file(index_tmp);
            let _ = fs::remove_file(metadata_tmp);
            self.restore_index(&backup, had_index);
            return Err(StoreError::write(&self.index_path, e));
        }

        if let Err(e) = fs::rename(metadata_tmp, &self.metadata_path) {
            let _ = fs::remove_file(metadata_tmp);
            self.restore_index(&backup, had_index);
            return Err(StoreError::write(&self.metadata_path, e));
        }

        if had_index {
            let _ = fs::remove_file(&backup);
        }
        Ok(())
    }

    /// Put the previous index back, or remove the new one when there was none.
    fn restore_index(&self, backup: &Path, had_index: bool) {
        let restored = if had_index {
            fs::rename(backup, &self.index_path)
        } else {
            fs::remove_file(&self.index_path)
        };
        if let Err(e) = restored {
            tracing::error!(
                "Failed to restore previous index at {:?}: {}",
                self.index_path,
                e
            );
        }
    }

    /// Load both artifacts, or empty structures when neither exists.
    pub fn load(&self, dimension: usize) -> StoreResult<(FlatIndex, MetadataStore)> {
        let index_exists = self.index_path.exists();
        let metadata_exists = self.metadata_path.exists();

        match (index_exists, metadata_exists) {
            (false, false) => {
                tracing::debug!("No artifacts under {:?}, starting empty", self.root);
                return Ok((FlatIndex::new(dimension), MetadataStore::new()));
            }
            (true, false) => {
                return Err(StoreError::corruption(
                    &self.metadata_path,
                    "index artifact exists but metadata artifact is missing",
                ))
            }
            (false, true) => {
                return Err(StoreError::corruption(
                    &self.index_path,
                    "metadata artifact exists but index artifact is missing",
                ))
            }
            (true, true) => {}
        }

        let bytes = fs::read(&self.index_path)
            .map_err(|e| StoreError::corruption(&self.index_path, e.to_string()))?;
        let index = decode_index(&bytes, dimension, &self.index_path)?;

        let json = fs::read(&self.metadata_path)
            .map_err(|e| StoreError::corruption(&self.metadata_path, e.to_string()))?;
        let metadata: MetadataStore = serde_json::from_slice(&json)
            .map_err(|e| StoreError::corruption(&self.metadata_path, e.to_string()))?;

        if !metadata.is_aligned() {
            return Err(StoreError::corruption(
                &self.metadata_path,
                format!("ragged metadata columns {:?}", metadata.column_lengths()),
            ));
        }

        if metadata.len() != index.size() {
            return Err(StoreError::corruption(
                &self.root,
                format!(
                    "index holds {} vectors but metadata holds {} records",
                    index.size(),
                    metadata.len()
                ),
            ));
        }

        tracing::info!(
            "Loaded {} vectors (dimension {}) from {:?}",
            index.size(),
            dimension,
            self.root
        );
        Ok((index, metadata))
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".bak");
    path.with_file_name(name)
}

fn encode_index(index: &FlatIndex) -> StoreResult<Vec<u8>> {
    let dimension = u32::try_from(index.dimension()).map_err(|_| {
        StoreError::Config(format!("dimension {} does not fit the index format", index.dimension()))
    })?;

    let raw = index.as_raw();
    let mut bytes = Vec::with_capacity(HEADER_LEN + raw.len() * 4);
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&dimension.to_le_bytes());
    bytes.extend_from_slice(&(index.size() as u64).to_le_bytes());
    for &value in raw {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    Ok(bytes)
}

fn decode_index(bytes: &[u8], dimension: usize, path: &Path) -> StoreResult<FlatIndex> {
    if bytes.len() < HEADER_LEN {
        return Err(StoreError::corruption(path, "truncated header"));
    }
    if &bytes[0..4] != MAGIC {
        return Err(StoreError::corruption(path, "not a vector index artifact"));
    }

    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version != FORMAT_VERSION {
        return Err(StoreError::corruption(
            path,
            format!("unsupported format version {}", version),
        ));
    }

    let stored_dimension = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
    if stored_dimension != dimension {
        return Err(StoreError::DimensionMismatch {
            expected: dimension,
            actual: stored_dimension,
        });
    }

    let mut count_bytes = [0u8; 8];
    count_bytes.copy_from_slice(&bytes[12..20]);
    let count = u64::from_le_bytes(count_bytes) as usize;

    let payload = &bytes[HEADER_LEN..];
    let expected_len = count
        .checked_mul(dimension)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| StoreError::corruption(path, "vector count overflows"))?;
    if payload.len() != expected_len {
        return Err(StoreError::corruption(
            path,
            format!(
                "payload is {} bytes, header promises {}",
                payload.len(),
                expected_len
            ),
        ));
    }

    let data: Vec<f32> = payload
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    FlatIndex::from_raw(dimension, data)
}
