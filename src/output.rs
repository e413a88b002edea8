//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! photo.jpg (image/jpeg, 48213 bytes)
//!     Original: 800x600
//! ```
//!
//! ## Derive
//!
//! ```text
//! photo.jpg (image/jpeg, 48213 bytes)
//!     Original: 800x600
//!     001 thumb: shrink 200x200 → 200x150
//!         Saved: out/thumb.jpg
//!     002 square: crop 300x300 → 300x300
//!         Saved: out/square.png
//!
//! Derived 2 variants
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure and do no I/O.

use crate::imaging::{Dimensions, ImageFormat, ResizeMode};
use crate::session::Upload;
use serde::Serialize;
use std::path::PathBuf;

/// One saved derivative, as reported by `derive`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedVariant {
    pub id: String,
    #[serde(serialize_with = "serialize_display")]
    pub mode: ResizeMode,
    pub requested: Dimensions,
    pub dimensions: Dimensions,
    #[serde(serialize_with = "serialize_display")]
    pub format: ImageFormat,
    pub path: PathBuf,
}

/// Everything `derive` produced for one upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeriveReport {
    pub source: String,
    pub original: Dimensions,
    pub variants: Vec<DerivedVariant>,
}

fn serialize_display<T: std::fmt::Display, S: serde::Serializer>(
    value: &T,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn upload_header(upload: &Upload) -> String {
    format!(
        "{} ({}, {} bytes)",
        upload.name, upload.declared_mime_type, upload.byte_size
    )
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// Check
// ============================================================================

pub fn format_check_output(upload: &Upload, original: Dimensions) -> Vec<String> {
    vec![
        upload_header(upload),
        format!("{}Original: {}", indent(1), original),
    ]
}

pub fn print_check_output(upload: &Upload, original: Dimensions) {
    for line in format_check_output(upload, original) {
        println!("{}", line);
    }
}

// ============================================================================
// Derive
// ============================================================================

pub fn format_derive_output(upload: &Upload, report: &DeriveReport) -> Vec<String> {
    let mut lines = vec![
        upload_header(upload),
        format!("{}Original: {}", indent(1), report.original),
    ];
    for (i, variant) in report.variants.iter().enumerate() {
        lines.push(format!(
            "{}{} {}: {} {} → {}",
            indent(1),
            format_index(i + 1),
            variant.id,
            variant.mode,
            variant.requested,
            variant.dimensions
        ));
        lines.push(format!("{}Saved: {}", indent(2), variant.path.display()));
    }
    lines.push(String::new());
    lines.push(format!("Derived {}", plural(report.variants.len(), "variant")));
    lines
}

pub fn print_derive_output(upload: &Upload, report: &DeriveReport) {
    for line in format_derive_output(upload, report) {
        println!("{}", line);
    }
}

/// One line for a failed command: the user-safe message only.
pub fn format_error(user_message: &str) -> String {
    format!("Error: {}", user_message)
}
