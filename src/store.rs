//! Derivative store: named resized bitmaps with at most one held in memory.
//!
//! A session keeps its decoded original for its whole lifetime, because every
//! resize reads from it. Derivatives are different: each one may be large,
//! and a session can produce many. The store keeps at most one derivative
//! decoded at a time and writes the others to temporary files.
//!
//! # States
//!
//! Every derivative is in one of two states:
//!
//! - **Resident**: the bitmap is in memory. It may also have a spill file
//!   from an earlier cycle, which is still a valid copy since bitmaps never
//!   change.
//! - **Spilled**: only the spill file exists.
//!
//! The *active* identifier names the entry currently resident, or
//! [`ORIGINAL_ID`] when no derivative is. All transitions go through
//! [`DerivativeStore::activate`]:
//!
//! 1. Unknown identifiers and missing spill files are rejected before any
//!    state changes.
//! 2. The active derivative is spilled. A spill file left from an earlier
//!    cycle is reused; otherwise the bitmap is encoded to a fresh PNG. If the
//!    write fails the previous entry stays resident.
//! 3. The target is reloaded from its spill file. If that fails, the previous
//!    derivative is reloaded and made active again (or, failing that, the
//!    original).
//!
//! [`DerivativeStore::discard_active`] is the one shortcut: it releases the
//! active derivative without encoding it, for a caller about to replace it.
//!
//! # Spill files
//!
//! Spill files are lossless PNGs in a per-store directory created on first
//! use under the configured root, with random names. The SHA-256 of each
//! file's contents is recorded when it is written; a reload whose bytes no
//! longer match is refused.
//!
//! Files are [`TempPath`]s and the directory a [`TempDir`], so dropping the
//! store deletes everything on every exit path. [`DerivativeStore::close`]
//! does the same but reports I/O errors.

use crate::imaging::{Bitmap, Codec, Dimensions, ImageFormat, Quality};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{Builder, TempDir, TempPath};
use thiserror::Error;
use tracing::{debug, warn};

/// Identifier of the original bitmap. Never spilled, never a resize target.
pub const ORIGINAL_ID: &str = "original_image";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to spill '{id}': {reason}")]
    SpillFailure { id: String, reason: String },
    #[error("failed to reload '{id}' from {}: {reason}", path.display())]
    ReloadFailure {
        id: String,
        path: PathBuf,
        reason: String,
    },
    #[error("unknown derivative '{0}'")]
    UnknownIdentifier(String),
    #[error("'{0}' cannot be used as a derivative identifier")]
    InvalidIdentifier(String),
}

impl StoreError {
    pub fn user_message(&self) -> &'static str {
        match self {
            StoreError::SpillFailure { .. } | StoreError::ReloadFailure { .. } => {
                "The image could not be processed."
            }
            StoreError::UnknownIdentifier(_) => "The requested image version does not exist.",
            StoreError::InvalidIdentifier(_) => "The image version name is not allowed.",
        }
    }
}

/// A lossless copy of a derivative on disk.
struct SpillFile {
    path: TempPath,
    digest: String,
}

impl SpillFile {
    fn load(&self, codec: &impl Codec, id: &str) -> Result<Bitmap, StoreError> {
        let failure = |reason: String| StoreError::ReloadFailure {
            id: id.to_string(),
            path: self.path.to_path_buf(),
            reason,
        };
        let bytes = std::fs::read(&self.path).map_err(|e| failure(e.to_string()))?;
        if format!("{:x}", Sha256::digest(&bytes)) != self.digest {
            return Err(failure("contents changed since spill".into()));
        }
        codec
            .decode(&bytes, ImageFormat::Png)
            .map_err(|e| failure(e.to_string()))
    }
}

enum EntryState {
    Resident {
        bitmap: Bitmap,
        spill: Option<SpillFile>,
    },
    Spilled(SpillFile),
}

struct Derivative {
    dimensions: Dimensions,
    state: EntryState,
}

impl Derivative {
    fn resident(&self) -> Option<&Bitmap> {
        match &self.state {
            EntryState::Resident { bitmap, .. } => Some(bitmap),
            EntryState::Spilled(_) => None,
        }
    }

    fn spill_path(&self) -> Option<&Path> {
        match &self.state {
            EntryState::Resident { spill, .. } => spill.as_ref().map(|s| &*s.path),
            EntryState::Spilled(s) => Some(&*s.path),
        }
    }
}

pub struct DerivativeStore<C: Codec> {
    codec: C,
    original: Bitmap,
    /// `None` when the original is active.
    active: Option<String>,
    entries: HashMap<String, Derivative>,
    spill_root: PathBuf,
    spill_dir: Option<TempDir>,
}

impl<C: Codec> DerivativeStore<C> {
    /// Spill files go in a fresh directory under `spill_root`, created on
    /// the first spill.
    pub fn new(original: Bitmap, codec: C, spill_root: PathBuf) -> Self {
        Self {
            codec,
            original,
            active: None,
            entries: HashMap::new(),
            spill_root,
            spill_dir: None,
        }
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn original(&self) -> &Bitmap {
        &self.original
    }

    /// Identifier of the entry currently in memory.
    pub fn active(&self) -> &str {
        self.active.as_deref().unwrap_or(ORIGINAL_ID)
    }

    /// Bitmap of the active entry.
    pub fn active_bitmap(&self) -> &Bitmap {
        self.active
            .as_deref()
            .and_then(|id| self.entries.get(id))
            .and_then(Derivative::resident)
            .unwrap_or(&self.original)
    }

    pub fn contains(&self, id: &str) -> bool {
        id == ORIGINAL_ID || self.entries.contains_key(id)
    }

    /// Dimensions recorded when the entry was created. Nothing is reloaded.
    pub fn size_of(&self, id: &str) -> Result<Dimensions, StoreError> {
        if id == ORIGINAL_ID {
            return Ok(self.original.dimensions());
        }
        self.entries
            .get(id)
            .map(|d| d.dimensions)
            .ok_or_else(|| StoreError::UnknownIdentifier(id.to_string()))
    }

    /// Derivative identifiers, sorted.
    pub fn derivatives(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Number of derivatives currently decoded in memory (0 or 1).
    pub fn resident_derivatives(&self) -> usize {
        self.entries
            .values()
            .filter(|d| d.resident().is_some())
            .count()
    }

    pub fn is_resident(&self, id: &str) -> bool {
        id == ORIGINAL_ID || self.entries.get(id).is_some_and(|d| d.resident().is_some())
    }

    /// Paths of all spill files that currently exist, sorted.
    pub fn spill_files(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self
            .entries
            .values()
            .filter_map(Derivative::spill_path)
            .map(Path::to_path_buf)
            .collect();
        paths.sort();
        paths
    }

    /// The per-store spill directory, once created.
    pub fn spill_dir(&self) -> Option<&Path> {
        self.spill_dir.as_ref().map(TempDir::path)
    }

    /// Make `id` the resident entry.
    ///
    /// A no-op when `id` is already active. On error the previously active
    /// entry is still active and resident, except when both the target and
    /// the rollback reload fail, in which case the original is active.
    pub fn activate(&mut self, id: &str) -> Result<(), StoreError> {
        if self.active() == id {
            return Ok(());
        }

        let target = if id == ORIGINAL_ID {
            None
        } else {
            let entry = self
                .entries
                .get(id)
                .ok_or_else(|| StoreError::UnknownIdentifier(id.to_string()))?;
            if let EntryState::Spilled(spill) = &entry.state {
                if !spill.path.exists() {
                    return Err(StoreError::ReloadFailure {
                        id: id.to_string(),
                        path: spill.path.to_path_buf(),
                        reason: "spill file is missing".into(),
                    });
                }
            }
            Some(id.to_string())
        };

        let previous = self.active.clone();
        self.spill_active()?;

        let Some(target) = target else {
            debug!(active = ORIGINAL_ID, "activated");
            return Ok(());
        };

        match self.load(&target) {
            Ok(()) => {
                debug!(active = %target, "activated");
                self.active = Some(target);
                Ok(())
            }
            Err(err) => {
                if let Some(prev) = previous {
                    match self.load(&prev) {
                        Ok(()) => self.active = Some(prev),
                        Err(rollback) => {
                            warn!(
                                previous = %prev,
                                error = %rollback,
                                "rollback reload failed, original is active"
                            );
                        }
                    }
                }
                Err(err)
            }
        }
    }

    /// Install a freshly resized bitmap under `id` as the resident entry.
    ///
    /// If `id` is active it is overwritten in place. Otherwise the active
    /// derivative is spilled first. Any previous entry under `id`, including
    /// its spill file, is discarded.
    pub fn put(&mut self, id: &str, bitmap: Bitmap) -> Result<(), StoreError> {
        if id.is_empty() || id == ORIGINAL_ID {
            return Err(StoreError::InvalidIdentifier(id.to_string()));
        }

        if self.active.as_deref() != Some(id) {
            self.activate(ORIGINAL_ID)?;
        }

        let entry = Derivative {
            dimensions: bitmap.dimensions(),
            state: EntryState::Resident {
                bitmap,
                spill: None,
            },
        };
        if self.entries.insert(id.to_string(), entry).is_some() {
            debug!(id, "replaced derivative");
        }
        self.active = Some(id.to_string());
        Ok(())
    }

    /// Release the active derivative without encoding it, ahead of replacing
    /// it. The original becomes active.
    ///
    /// An entry that still has a spill file from an earlier cycle stays
    /// addressable as spilled. One that never spilled is removed.
    pub fn discard_active(&mut self) {
        let Some(id) = self.active.take() else {
            return;
        };
        let Some(entry) = self.entries.remove(&id) else {
            return;
        };
        match entry.state {
            EntryState::Resident {
                bitmap,
                spill: Some(file),
            } => {
                drop(bitmap);
                self.entries.insert(
                    id.clone(),
                    Derivative {
                        dimensions: entry.dimensions,
                        state: EntryState::Spilled(file),
                    },
                );
                debug!(id = %id, "discarded resident bitmap, spill file kept");
            }
            EntryState::Resident { spill: None, .. } => {
                debug!(id = %id, "discarded derivative");
            }
            spilled @ EntryState::Spilled(_) => {
                self.entries.insert(
                    id,
                    Derivative {
                        dimensions: entry.dimensions,
                        state: spilled,
                    },
                );
            }
        }
    }

    /// Delete every spill file and the spill directory, reporting I/O errors.
    pub fn close(self) -> std::io::Result<()> {
        let Self {
            entries, spill_dir, ..
        } = self;
        drop(entries);
        match spill_dir {
            Some(dir) => {
                debug!(dir = %dir.path().display(), "removing spill directory");
                dir.close()
            }
            None => Ok(()),
        }
    }

    /// Move the active derivative out of memory. The original becomes active.
    fn spill_active(&mut self) -> Result<(), StoreError> {
        let Some(id) = self.active.take() else {
            return Ok(());
        };
        let Some(mut entry) = self.entries.remove(&id) else {
            return Ok(());
        };

        let result = match entry.state {
            EntryState::Resident {
                bitmap,
                spill: Some(file),
            } => {
                drop(bitmap);
                debug!(id = %id, path = %file.path.display(), "reusing spill file");
                entry.state = EntryState::Spilled(file);
                Ok(())
            }
            EntryState::Resident { bitmap, spill: None } => match self.write_spill(&id, &bitmap) {
                Ok(file) => {
                    drop(bitmap);
                    entry.state = EntryState::Spilled(file);
                    Ok(())
                }
                Err(err) => {
                    entry.state = EntryState::Resident {
                        bitmap,
                        spill: None,
                    };
                    Err(err)
                }
            },
            spilled @ EntryState::Spilled(_) => {
                entry.state = spilled;
                Ok(())
            }
        };

        self.entries.insert(id.clone(), entry);
        if result.is_err() {
            self.active = Some(id);
        }
        result
    }

    /// Decode a spilled entry back into memory, keeping its spill file.
    fn load(&mut self, id: &str) -> Result<(), StoreError> {
        let mut entry = self
            .entries
            .remove(id)
            .ok_or_else(|| StoreError::UnknownIdentifier(id.to_string()))?;

        let result = match entry.state {
            EntryState::Spilled(file) => match file.load(&self.codec, id) {
                Ok(bitmap) => {
                    debug!(id, path = %file.path.display(), "reloaded spill file");
                    entry.state = EntryState::Resident {
                        bitmap,
                        spill: Some(file),
                    };
                    Ok(())
                }
                Err(err) => {
                    entry.state = EntryState::Spilled(file);
                    Err(err)
                }
            },
            resident @ EntryState::Resident { .. } => {
                entry.state = resident;
                Ok(())
            }
        };

        self.entries.insert(id.to_string(), entry);
        result
    }

    fn write_spill(&mut self, id: &str, bitmap: &Bitmap) -> Result<SpillFile, StoreError> {
        let failure = |reason: String| StoreError::SpillFailure {
            id: id.to_string(),
            reason,
        };

        let bytes = self
            .codec
            .encode(bitmap, ImageFormat::Png, Quality::default())
            .map_err(|e| failure(e.to_string()))?;

        let dir = match self.spill_dir.take() {
            Some(dir) => self.spill_dir.insert(dir),
            None => {
                let dir = Builder::new()
                    .prefix("image-session-")
                    .tempdir_in(&self.spill_root)
                    .map_err(|e| {
                        failure(format!(
                            "cannot create spill directory in {}: {e}",
                            self.spill_root.display()
                        ))
                    })?;
                debug!(dir = %dir.path().display(), "created spill directory");
                self.spill_dir.insert(dir)
            }
        };

        let mut file = Builder::new()
            .prefix("spill-")
            .suffix(".png")
            .tempfile_in(dir.path())
            .map_err(|e| failure(e.to_string()))?;
        file.write_all(&bytes)
            .and_then(|()| file.flush())
            .map_err(|e| failure(e.to_string()))?;

        let path = file.into_temp_path();
        debug!(id, path = %path.display(), bytes = bytes.len(), "spilled derivative");
        Ok(SpillFile {
            path,
            digest: format!("{:x}", Sha256::digest(&bytes)),
        })
    }
}
