//! # Image Session
//!
//! Takes one uploaded image, checks it, decodes it, and produces named
//! resized variants that can be saved as JPEG, GIF or PNG.
//!
//! # Architecture
//!
//! ```text
//! upload ─► validate ─► decode ─► original ─► resize ─► derivative store ─► save
//! ```
//!
//! An [`ImageSession`] owns everything produced for one upload. Every
//! failure is a typed [`SessionError`] carrying a diagnostic detail string
//! and a separate message that is safe to show to an end user.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`session`] | `Upload` ingestion and the `ImageSession` lifecycle |
//! | [`store`] | Derivative store: one resident derivative, the rest spilled to temp files |
//! | [`imaging`] | Validation, codec, resize engine, decode/save adapters |
//! | [`error`] | `SessionError`, the aggregate of every component error |
//! | [`config`] | `image-session.toml` loading, merging, and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Resizes Always Start From the Original
//!
//! Derivatives are never used as a resize source. The original is decoded
//! once and kept for the whole session, so every variant is derived at full
//! quality no matter how many were made before it.
//!
//! ## One Derivative in Memory
//!
//! A session may produce many large variants. The [`store`] keeps only the
//! active one decoded and writes the others to lossless PNG files in a
//! private temporary directory. Switching back reloads the file. Since
//! bitmaps never change, a file written once is reused on every later cycle.
//!
//! ## Cleanup by Ownership
//!
//! Spill files and their directory are `tempfile` guards owned by the
//! session. Dropping the session, whether after success, an error, or an
//! early return, deletes them. No caller bookkeeping is needed.
//!
//! ## Exact Geometry
//!
//! Resize geometry is computed with integer arithmetic only (see
//! [`imaging::calculations`]), so tie-breaks on aspect ratios are exact and
//! identical on every platform.

pub mod config;
pub mod error;
pub mod imaging;
pub mod output;
pub mod session;
pub mod store;

pub use error::SessionError;
pub use session::{ImageSession, SessionOptions, Upload};

#[cfg(test)]
pub(crate) mod test_helpers;
