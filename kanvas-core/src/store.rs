//! Filesystem persistence for a canvas.
//!
//! A [`CanvasStore`] keeps one `canvas.json` [`CanvasDocument`] plus a
//! `blobs/` directory holding the encoded bytes of every embedded image,
//! one file per image id.
//!
//! ```text
//! data_dir/
//! ├── canvas.json
//! └── blobs/
//!     ├── 6f1c2c84-....bin
//!     └── ...
//! ```

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

use crate::schema::CanvasDocument;
use crate::{ImageId, Scene, Viewport};

/// Largest encoded image the blob store accepts (50 MiB).
pub const MAX_BLOB_BYTES: usize = 50 * 1024 * 1024;

const DOCUMENT_FILE: &str = "canvas.json";
const BLOB_DIR: &str = "blobs";
const BLOB_EXT: &str = "bin";

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An I/O error occurred during persistence.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// An image exceeds [`MAX_BLOB_BYTES`].
    #[error("Image {id} is {size} bytes, over the {max} byte limit")]
    BlobTooLarge {
        /// Offending image.
        id: ImageId,
        /// Its encoded size.
        size: usize,
        /// The limit.
        max: usize,
    },
}

/// Outcome of a save.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReport {
    /// Images written to the document.
    pub images: usize,
    /// Blobs written (unchanged blobs are skipped).
    pub blobs_written: usize,
    /// Images left out because they exceed the size limit.
    pub skipped: Vec<ImageId>,
    /// Stale blobs removed.
    pub pruned: usize,
}

/// Filesystem-backed canvas storage.
#[derive(Debug)]
pub struct CanvasStore {
    data_dir: PathBuf,
    max_blob_bytes: usize,
    /// Source key last written for each blob, to skip rewrites.
    written: HashMap<ImageId, Uuid>,
}

impl CanvasStore {
    /// Open (creating if needed) a store rooted at `data_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directories cannot be created.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(data_dir.join(BLOB_DIR))?;
        Ok(Self {
            data_dir,
            max_blob_bytes: MAX_BLOB_BYTES,
            written: HashMap::new(),
        })
    }

    /// Override the per-image size limit.
    #[must_use]
    pub fn with_max_blob_bytes(mut self, max: usize) -> Self {
        self.max_blob_bytes = max;
        self
    }

    /// Root directory.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn document_path(&self) -> PathBuf {
        self.data_dir.join(DOCUMENT_FILE)
    }

    fn blob_path(&self, id: &str) -> PathBuf {
        self.data_dir
            .join(BLOB_DIR)
            .join(format!("{}.{BLOB_EXT}", sanitize_filename(id)))
    }

    /// Save the scene and viewport.
    ///
    /// Images over the size limit are left out with a warning; blobs no
    /// longer referenced are pruned.
    ///
    /// # Errors
    ///
    /// Returns an error if the document or a blob cannot be written.
    pub fn save(&mut self, scene: &Scene, viewport: Viewport) -> Result<SaveReport, StoreError> {
        let (mut doc, blobs) = CanvasDocument::from_scene(scene, viewport, current_timestamp_ms());
        let mut report = SaveReport::default();

        for blob in blobs {
            if blob.bytes.len() > self.max_blob_bytes {
                let err = StoreError::BlobTooLarge {
                    id: blob.id,
                    size: blob.bytes.len(),
                    max: self.max_blob_bytes,
                };
                tracing::warn!("Not persisting image: {err}");
                report.skipped.push(blob.id);
                continue;
            }
            let path = self.blob_path(&blob.id.to_string());
            if self.written.get(&blob.id) == Some(&blob.key) && path.exists() {
                continue;
            }
            write_atomic(&path, &blob.bytes)?;
            self.written.insert(blob.id, blob.key);
            report.blobs_written += 1;
        }

        let skipped: HashSet<String> = report.skipped.iter().map(ToString::to_string).collect();
        doc.images.retain(|img| !skipped.contains(&img.id));
        report.images = doc.images.len();

        let json = serde_json::to_string_pretty(&doc)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        write_atomic(&self.document_path(), json.as_bytes())?;

        report.pruned = self.prune_unused(&doc)?;
        tracing::debug!(
            images = report.images,
            blobs = report.blobs_written,
            pruned = report.pruned,
            "canvas saved"
        );
        Ok(report)
    }

    /// Read the raw document, or `None` if nothing has been saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn document(&self) -> Result<Option<CanvasDocument>, StoreError> {
        let path = self.document_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)?;
        let doc = serde_json::from_str(&contents)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(Some(doc))
    }

    /// Load the saved scene and viewport, or `None` if nothing has been saved.
    ///
    /// Missing blobs drop their image with a warning rather than failing the
    /// whole load.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or parsed.
    pub fn load(&mut self) -> Result<Option<(Scene, Viewport)>, StoreError> {
        let Some(doc) = self.document()? else {
            return Ok(None);
        };
        let mut blobs: HashMap<String, Arc<[u8]>> = HashMap::new();
        for img in &doc.images {
            if img.source != crate::schema::SourceDocument::Blob {
                continue;
            }
            match std::fs::read(self.blob_path(&img.id)) {
                Ok(bytes) => {
                    blobs.insert(img.id.clone(), Arc::from(bytes));
                }
                Err(e) => tracing::warn!("Failed to read blob for image {}: {e}", img.id),
            }
        }
        self.written.clear();
        let (scene, viewport) = doc.into_scene(blobs);
        // Loaded blobs get fresh source keys; remember them so an unchanged
        // canvas is not rewritten on the next save.
        for img in scene.images() {
            if let crate::ImageSource::Encoded { key, .. } = &img.source {
                self.written.insert(img.id, *key);
            }
        }
        Ok(Some((scene, viewport)))
    }

    /// Delete blob files not referenced by `doc`. Returns how many were removed.
    fn prune_unused(&self, doc: &CanvasDocument) -> Result<usize, StoreError> {
        let live: HashSet<&str> = doc.images.iter().map(|img| img.id.as_str()).collect();
        let mut removed = 0;
        for entry in std::fs::read_dir(self.data_dir.join(BLOB_DIR))? {
            let path = entry?.path();
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if live.contains(stem) {
                continue;
            }
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::warn!("Failed to prune blob {}: {e}", path.display());
            } else {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Delete blob files not referenced by the saved document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document or blob directory cannot be read.
    pub fn cleanup(&mut self) -> Result<usize, StoreError> {
        let doc = self.document()?.unwrap_or_default();
        let removed = self.prune_unused(&doc)?;
        let live: HashSet<String> = doc.images.into_iter().map(|img| img.id).collect();
        self.written.retain(|id, _| live.contains(&id.to_string()));
        Ok(removed)
    }

    /// Remove the document and every blob.
    ///
    /// # Errors
    ///
    /// Returns an error if files cannot be removed.
    pub fn clear_all(&mut self) -> Result<(), StoreError> {
        let doc = self.document_path();
        if doc.exists() {
            std::fs::remove_file(doc)?;
        }
        let blobs = self.data_dir.join(BLOB_DIR);
        if blobs.exists() {
            std::fs::remove_dir_all(&blobs)?;
        }
        std::fs::create_dir_all(blobs)?;
        self.written.clear();
        Ok(())
    }
}

/// Write via a temporary file and rename so readers never see a partial file.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Sanitize an id for use as a filename.
///
/// Replaces any character that is not alphanumeric, `-`, or `_` with `_`.
fn sanitize_filename(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Get the current Unix timestamp in milliseconds.
fn current_timestamp_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| {
        // Timestamp will not exceed u64 max for millennia
        #[allow(clippy::cast_possible_truncation)]
        {
            d.as_millis() as u64
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CropBox, ImageSource, PlacedImage};

    fn sample_scene() -> (Scene, ImageId, ImageId) {
        let mut scene = Scene::new();
        let uri = scene
            .add(
                PlacedImage::new(ImageSource::uri("https://example.com/a.png"), 1.0, 2.0, 30.0, 40.0)
                    .with_rotation(12.5)
                    .with_crop(CropBox::new(0.1, 0.1, 0.5, 0.5).expect("valid")),
            )
            .expect("add");
        let blob = scene
            .add(PlacedImage::new(ImageSource::encoded(vec![9u8; 64]), 50.0, 0.0, 10.0, 10.0))
            .expect("add");
        (scene, uri, blob)
    }

    #[test]
    fn test_load_empty_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = CanvasStore::open(dir.path()).expect("open");
        assert!(store.load().expect("load").is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (scene, uri, blob) = sample_scene();
        let viewport = Viewport::new(10.0, 20.0, 1.5);

        let mut store = CanvasStore::open(dir.path()).expect("open");
        let report = store.save(&scene, viewport).expect("save");
        assert_eq!(report.images, 2);
        assert_eq!(report.blobs_written, 1);

        let mut reopened = CanvasStore::open(dir.path()).expect("open");
        let (loaded, loaded_vp) = reopened.load().expect("load").expect("saved");
        assert_eq!(loaded_vp, viewport);
        assert_eq!(loaded.len(), 2);

        let a = loaded.get(uri).expect("uri image");
        assert_eq!(a.source, ImageSource::uri("https://example.com/a.png"));
        assert!((a.rotation - 12.5).abs() < f64::EPSILON);
        assert!(a.crop_box.is_some());

        let b = loaded.get(blob).expect("blob image");
        match &b.source {
            ImageSource::Encoded { bytes, .. } => assert_eq!(bytes.len(), 64),
            ImageSource::Uri(_) => panic!("expected encoded source"),
        }
        assert_eq!(loaded.index_of(blob), Some(1));
    }

    #[test]
    fn test_unchanged_blob_not_rewritten() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (scene, _, _) = sample_scene();
        let mut store = CanvasStore::open(dir.path()).expect("open");
        store.save(&scene, Viewport::default()).expect("save");
        let second = store.save(&scene, Viewport::default()).expect("save");
        assert_eq!(second.blobs_written, 0);
    }

    #[test]
    fn test_oversized_blob_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (scene, uri, blob) = sample_scene();
        let mut store = CanvasStore::open(dir.path())
            .expect("open")
            .with_max_blob_bytes(16);
        let report = store.save(&scene, Viewport::default()).expect("save");
        assert_eq!(report.skipped, vec![blob]);
        assert_eq!(report.images, 1);

        let (loaded, _) = store.load().expect("load").expect("saved");
        assert!(loaded.contains(uri));
        assert!(!loaded.contains(blob));
    }

    #[test]
    fn test_removed_image_blob_pruned() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (mut scene, _, blob) = sample_scene();
        let mut store = CanvasStore::open(dir.path()).expect("open");
        store.save(&scene, Viewport::default()).expect("save");
        assert!(store.blob_path(&blob.to_string()).exists());

        scene.remove(&[blob]);
        let report = store.save(&scene, Viewport::default()).expect("save");
        assert_eq!(report.pruned, 1);
        assert!(!store.blob_path(&blob.to_string()).exists());
    }

    #[test]
    fn test_cleanup_removes_orphans() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (scene, _, _) = sample_scene();
        let mut store = CanvasStore::open(dir.path()).expect("open");
        store.save(&scene, Viewport::default()).expect("save");
        std::fs::write(store.blob_path("orphan"), b"x").expect("write orphan");
        assert_eq!(store.cleanup().expect("cleanup"), 1);
    }

    #[test]
    fn test_clear_all() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (scene, _, _) = sample_scene();
        let mut store = CanvasStore::open(dir.path()).expect("open");
        store.save(&scene, Viewport::default()).expect("save");
        store.clear_all().expect("clear");
        assert!(store.load().expect("load").is_none());
    }

    #[test]
    fn test_corrupt_document_is_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(DOCUMENT_FILE), "not json").expect("write");
        let mut store = CanvasStore::open(dir.path()).expect("open");
        assert!(matches!(store.load(), Err(StoreError::Serialization(_))));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("../etc/passwd"), "___etc_passwd");
    }
}
