//! Snapshot persistence for a document store

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use taxograph_core::TaxonomyEntity;
use tracing::debug;

use crate::error::StoreError;
use crate::memory::MemoryStore;

/// Current snapshot layout version
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub version: u32,
    pub entity_count: usize,
    pub saved_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct SnapshotRef<'a, E> {
    header: &'a SnapshotHeader,
    entities: &'a [E],
}

#[derive(Deserialize)]
struct Snapshot<E> {
    header: SnapshotHeader,
    entities: Vec<E>,
}

/// On-disk encoding, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    Json,
    Bincode,
}

impl SnapshotFormat {
    /// `.json` files are JSON, anything else is bincode.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => SnapshotFormat::Json,
            _ => SnapshotFormat::Bincode,
        }
    }
}

/// Write every document of `store` to `path`, creating parent directories.
pub fn save_snapshot<E>(store: &MemoryStore<E>, path: &Path) -> Result<SnapshotHeader, StoreError>
where
    E: TaxonomyEntity + Serialize,
{
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let entities = store.entities();
    let header = SnapshotHeader {
        version: SNAPSHOT_VERSION,
        entity_count: entities.len(),
        saved_at: Utc::now(),
    };
    let snapshot = SnapshotRef {
        header: &header,
        entities: &entities,
    };

    let mut writer = BufWriter::new(File::create(path)?);
    match SnapshotFormat::from_path(path) {
        SnapshotFormat::Json => serde_json::to_writer_pretty(&mut writer, &snapshot)?,
        SnapshotFormat::Bincode => bincode::serialize_into(&mut writer, &snapshot)?,
    }
    writer.flush()?;

    debug!(path = %path.display(), entities = header.entity_count, "snapshot saved");
    Ok(header)
}

/// Read a snapshot written by [`save_snapshot`].
pub fn load_snapshot<E>(path: &Path) -> Result<(SnapshotHeader, MemoryStore<E>), StoreError>
where
    E: TaxonomyEntity + DeserializeOwned,
{
    let reader = BufReader::new(File::open(path)?);
    let snapshot: Snapshot<E> = match SnapshotFormat::from_path(path) {
        SnapshotFormat::Json => serde_json::from_reader(reader)?,
        SnapshotFormat::Bincode => bincode::deserialize_from(reader)?,
    };
    if snapshot.header.version != SNAPSHOT_VERSION {
        return Err(StoreError::UnsupportedVersion(snapshot.header.version));
    }

    debug!(path = %path.display(), entities = snapshot.entities.len(), "snapshot loaded");
    Ok((snapshot.header, MemoryStore::from_entities(snapshot.entities)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use taxograph_core::{Concept, ROOT_ID};
    use tempfile::TempDir;

    fn store() -> MemoryStore<Concept> {
        MemoryStore::from_entities([
            Concept::new("A").with_parents([ROOT_ID]).with_label("Animal"),
            Concept::new("B").with_parents(["A"]).with_ancestors([ROOT_ID]),
        ])
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(SnapshotFormat::from_path(Path::new("store.json")), SnapshotFormat::Json);
        assert_eq!(SnapshotFormat::from_path(Path::new("store.JSON")), SnapshotFormat::Json);
        assert_eq!(SnapshotFormat::from_path(Path::new("store.bin")), SnapshotFormat::Bincode);
        assert_eq!(SnapshotFormat::from_path(Path::new("store")), SnapshotFormat::Bincode);
    }

    #[test]
    fn test_save_and_load_both_formats() {
        let dir = TempDir::new().unwrap();
        for name in ["nested/store.json", "nested/store.bin"] {
            let path = dir.path().join(name);
            let saved = save_snapshot(&store(), &path).unwrap();
            assert_eq!(saved.entity_count, 2);

            let (header, loaded) = load_snapshot::<Concept>(&path).unwrap();
            assert_eq!(header, saved);
            assert_eq!(loaded.entities(), store().entities());
        }
    }

    #[test]
    fn test_unsupported_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("old.json");
        std::fs::write(
            &path,
            r#"{"header": {"version": 99, "entity_count": 0, "saved_at": "2024-01-01T00:00:00Z"}, "entities": []}"#,
        )
        .unwrap();

        let err = load_snapshot::<Concept>(&path).unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedVersion(99)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = load_snapshot::<Concept>(&dir.path().join("absent.bin")).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
    }
}
