//! Image session: one upload, its original bitmap, and its derivatives.
//!
//! ```text
//! Upload ─► validate ─► read ─► decode ─► original ─┬─► resize ─► put(id)
//!                                                    └─► save(id) ─► dir/base.ext
//! ```
//!
//! Construction never fails outright. A session whose upload was rejected
//! is still a value: [`ImageSession::is_initialized`] is `false`,
//! [`ImageSession::init_error`] says why, and every other operation returns
//! [`SessionError::NotInitialized`] without doing any work.
//!
//! All temporary files belong to the session's [`DerivativeStore`] and are
//! removed when the session is dropped or [closed](ImageSession::close).

use crate::error::{Result, SessionError};
use crate::imaging::{
    AllowedFormats, Codec, Dimensions, Quality, ResizeEngine, ResizeFilter, ResizeMode,
    ResizeParams, RustCodec, SaveTarget, ValidationError, decode_upload, encode_to_file, validate,
};
use crate::store::{DerivativeStore, ORIGINAL_ID, StoreError};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// An uploaded file as handed over by the transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    /// Client-side file name. Only used in diagnostics.
    pub name: String,
    pub declared_mime_type: String,
    pub byte_size: u64,
    pub source_path: PathBuf,
}

impl Upload {
    /// Describe a local file. Without an explicit MIME type one is guessed
    /// from the extension, falling back to `application/octet-stream`.
    pub fn from_file(path: &Path, mime: Option<&str>) -> std::io::Result<Self> {
        let byte_size = std::fs::metadata(path)?.len();
        let declared_mime_type = match mime {
            Some(m) => m.to_string(),
            None => path
                .extension()
                .and_then(|e| e.to_str())
                .and_then(crate::imaging::ImageFormat::mime_for_extension)
                .unwrap_or("application/octet-stream")
                .to_string(),
        };
        Ok(Self {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            declared_mime_type,
            byte_size,
            source_path: path.to_path_buf(),
        })
    }
}

/// Per-session settings, usually built from [`SessionConfig`](crate::config::SessionConfig).
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    /// Directory under which the session creates its spill directory.
    pub spill_root: PathBuf,
    pub filter: ResizeFilter,
    /// JPEG quality used when `save` is called without one.
    pub default_quality: Quality,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            spill_root: std::env::temp_dir(),
            filter: ResizeFilter::default(),
            default_quality: Quality::default(),
        }
    }
}

enum SessionState<C: Codec> {
    Ready(DerivativeStore<C>),
    Failed(SessionError),
}

pub struct ImageSession<C: Codec = RustCodec> {
    state: SessionState<C>,
    engine: ResizeEngine,
    default_quality: Quality,
}

impl ImageSession<RustCodec> {
    /// Validate, read and decode `upload` with the built-in codec.
    pub fn initialize(upload: &Upload, allowed: &AllowedFormats, options: &SessionOptions) -> Self {
        Self::initialize_with(upload, allowed, options, RustCodec::new())
    }
}

impl<C: Codec> ImageSession<C> {
    pub fn initialize_with(
        upload: &Upload,
        allowed: &AllowedFormats,
        options: &SessionOptions,
        codec: C,
    ) -> Self {
        let state = match open(upload, allowed, options, codec) {
            Ok(store) => {
                info!(
                    name = %upload.name,
                    dimensions = %store.original().dimensions(),
                    "session initialized"
                );
                SessionState::Ready(store)
            }
            Err(err) => {
                warn!(name = %upload.name, error = %err, "upload rejected");
                SessionState::Failed(err)
            }
        };
        Self {
            state,
            engine: ResizeEngine::new(options.filter),
            default_quality: options.default_quality,
        }
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.state, SessionState::Ready(_))
    }

    /// Why construction failed, if it did.
    pub fn init_error(&self) -> Option<&SessionError> {
        match &self.state {
            SessionState::Ready(_) => None,
            SessionState::Failed(err) => Some(err),
        }
    }

    /// The derivative store, for inspection. `None` if not initialized.
    pub fn store(&self) -> Option<&DerivativeStore<C>> {
        match &self.state {
            SessionState::Ready(store) => Some(store),
            SessionState::Failed(_) => None,
        }
    }

    fn ready(&self) -> Result<&DerivativeStore<C>> {
        match &self.state {
            SessionState::Ready(store) => Ok(store),
            SessionState::Failed(err) => Err(SessionError::NotInitialized(err.detail())),
        }
    }

    fn ready_mut(&mut self) -> Result<&mut DerivativeStore<C>> {
        match &mut self.state {
            SessionState::Ready(store) => Ok(store),
            SessionState::Failed(err) => Err(SessionError::NotInitialized(err.detail())),
        }
    }

    pub fn original_size(&self) -> Result<Dimensions> {
        self.size_of(ORIGINAL_ID)
    }

    /// Dimensions of the original or of a derivative. Never reloads anything.
    pub fn size_of(&self, id: &str) -> Result<Dimensions> {
        Ok(self.ready()?.size_of(id)?)
    }

    /// Identifier of the bitmap currently in memory.
    pub fn active(&self) -> Result<&str> {
        Ok(self.ready()?.active())
    }

    /// Derivative identifiers, sorted.
    pub fn derivatives(&self) -> Result<Vec<&str>> {
        Ok(self.ready()?.derivatives())
    }

    /// Derive `id` from the original and make it the active entry.
    ///
    /// Target dimensions are checked before the store is touched. The active
    /// derivative is then spilled, or just released when it is the one being
    /// replaced, so the new bitmap is never in memory alongside another
    /// derivative. Returns the dimensions actually produced (which differ
    /// from the box for ShrinkKeepAspect).
    pub fn resize(
        &mut self,
        id: &str,
        mode: ResizeMode,
        width: u32,
        height: u32,
    ) -> Result<Dimensions> {
        let engine = self.engine;
        let store = self.ready_mut()?;
        if id.is_empty() || id == ORIGINAL_ID {
            return Err(StoreError::InvalidIdentifier(id.to_string()).into());
        }

        let params = ResizeParams::new(mode, width, height);
        params.check()?;

        if store.active() == id {
            store.discard_active();
        } else {
            store.activate(ORIGINAL_ID)?;
        }
        let bitmap = engine.resize(store.original(), &params)?;
        let dimensions = bitmap.dimensions();
        store.put(id, bitmap)?;

        info!(id, %mode, requested = %Dimensions::new(width, height), %dimensions, "derived");
        Ok(dimensions)
    }

    /// Encode `id` to `dir/base_name.<ext>` and return the written path.
    ///
    /// `quality` only affects JPEG; `None` uses the session default.
    pub fn save(
        &mut self,
        id: &str,
        dir: &Path,
        base_name: &str,
        format: &str,
        quality: Option<Quality>,
    ) -> Result<PathBuf> {
        let quality = quality.unwrap_or(self.default_quality);
        let store = self.ready_mut()?;
        let target = SaveTarget::new(dir, base_name, format)?;
        store.activate(id)?;
        Ok(encode_to_file(
            store.codec(),
            store.active_bitmap(),
            &target,
            quality,
        )?)
    }

    /// Remove every temporary file now, reporting I/O errors. Dropping the
    /// session does the same silently.
    pub fn close(self) -> std::io::Result<()> {
        match self.state {
            SessionState::Ready(store) => store.close(),
            SessionState::Failed(_) => Ok(()),
        }
    }
}

fn open<C: Codec>(
    upload: &Upload,
    allowed: &AllowedFormats,
    options: &SessionOptions,
    codec: C,
) -> Result<DerivativeStore<C>> {
    let format = validate(&upload.declared_mime_type, upload.byte_size, allowed)?;
    let bytes = read_upload(upload)?;
    let original = decode_upload(&codec, &upload.name, &bytes, format)?;
    Ok(DerivativeStore::new(
        original,
        codec,
        options.spill_root.clone(),
    ))
}

fn read_upload(upload: &Upload) -> std::result::Result<Vec<u8>, ValidationError> {
    if upload.name.is_empty() {
        return Err(ValidationError::MalformedUpload("upload has no name".into()));
    }
    if upload.byte_size == 0 {
        return Err(ValidationError::MalformedUpload(format!(
            "upload '{}' is empty",
            upload.name
        )));
    }
    let bytes = std::fs::read(&upload.source_path).map_err(|e| {
        ValidationError::MalformedUpload(format!(
            "cannot read {}: {e}",
            upload.source_path.display()
        ))
    })?;
    if bytes.len() as u64 != upload.byte_size {
        return Err(ValidationError::MalformedUpload(format!(
            "upload '{}' declared {} bytes but {} were read",
            upload.name,
            upload.byte_size,
            bytes.len()
        )));
    }
    Ok(bytes)
}
