//! End-to-end session tests through the public API with the real codec.

use image::{DynamicImage, ImageFormat as CodecFormat, Rgb, RgbImage};
use image_session::imaging::{AllowedFormats, ImageFormat, Quality, ResizeMode};
use image_session::store::ORIGINAL_ID;
use image_session::{ImageSession, SessionError, SessionOptions, Upload};
use std::io::Cursor;
use std::path::Path;
use tempfile::TempDir;

fn encoded(width: u32, height: u32, format: CodecFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x ^ y) % 256) as u8])
    });
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut cursor, format)
        .unwrap();
    cursor.into_inner()
}

fn upload(dir: &Path, name: &str, mime: &str, bytes: &[u8]) -> Upload {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    Upload {
        name: name.to_string(),
        declared_mime_type: mime.to_string(),
        byte_size: bytes.len() as u64,
        source_path: path,
    }
}

fn options(spill_root: &Path) -> SessionOptions {
    SessionOptions {
        spill_root: spill_root.to_path_buf(),
        ..SessionOptions::default()
    }
}

#[test]
fn jpeg_thumbnail_scenario() {
    let input = TempDir::new().unwrap();
    let spills = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let bytes = encoded(800, 600, CodecFormat::Jpeg);
    let upload = upload(input.path(), "photo.jpg", "image/jpeg", &bytes);

    let mut session = ImageSession::initialize(&upload, &AllowedFormats::All, &options(spills.path()));
    assert!(session.is_initialized());
    assert_eq!(session.original_size().unwrap().as_tuple(), (800, 600));

    let dims = session
        .resize("thumb", ResizeMode::ShrinkKeepAspect, 200, 200)
        .unwrap();
    assert_eq!(dims.as_tuple(), (200, 150));

    let path = session
        .save("thumb", out.path(), "t1", "jpeg", Some(Quality::new(90)))
        .unwrap();
    assert_eq!(path, out.path().join("t1.jpg"));
    assert_eq!(image::image_dimensions(&path).unwrap(), (200, 150));
}

#[test]
fn many_variants_then_save_each() {
    let input = TempDir::new().unwrap();
    let spills = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let bytes = encoded(400, 300, CodecFormat::Png);
    let upload = upload(input.path(), "source.png", "image/png", &bytes);
    let mut session = ImageSession::initialize(&upload, &AllowedFormats::All, &options(spills.path()));

    let variants = [
        ("stretch", ResizeMode::Stretch, 120, 40, (120, 40)),
        ("shrink", ResizeMode::ShrinkKeepAspect, 100, 100, (100, 75)),
        ("square", ResizeMode::CropCenterResize, 300, 300, (300, 300)),
        ("tall", ResizeMode::CropCenterResize, 50, 100, (50, 100)),
    ];
    for (id, mode, w, h, expected) in variants {
        let dims = session.resize(id, mode, w, h).unwrap();
        assert_eq!(dims.as_tuple(), expected, "{id}");
        assert!(session.store().unwrap().resident_derivatives() <= 1);
    }
    assert_eq!(
        session.derivatives().unwrap(),
        vec!["shrink", "square", "stretch", "tall"]
    );

    // Save in a different order than created: every one needs a reload.
    for (i, (id, _, _, _, expected)) in variants.iter().enumerate().rev() {
        let format = ["png", "gif", "jpg", "png"][i];
        let path = session.save(id, out.path(), id, format, None).unwrap();
        assert_eq!(image::image_dimensions(&path).unwrap(), *expected, "{id}");
        assert!(session.store().unwrap().resident_derivatives() <= 1);
    }

    let orig = session
        .save(ORIGINAL_ID, out.path(), "orig", "png", None)
        .unwrap();
    let saved = image::open(&orig).unwrap();
    let original = image::load_from_memory(&bytes).unwrap();
    assert_eq!(saved.as_bytes(), original.as_bytes());
}

#[test]
fn temp_files_are_gone_after_drop() {
    let input = TempDir::new().unwrap();
    let spills = TempDir::new().unwrap();
    let bytes = encoded(64, 64, CodecFormat::Png);
    let upload = upload(input.path(), "p.png", "image/png", &bytes);

    {
        let mut session =
            ImageSession::initialize(&upload, &AllowedFormats::All, &options(spills.path()));
        for id in ["a", "b", "c", "a"] {
            session.resize(id, ResizeMode::Stretch, 16, 16).unwrap();
        }
        let store = session.store().unwrap();
        assert!(store.spill_dir().is_some());
        assert_eq!(store.spill_files().len(), 2);
    }

    assert_eq!(std::fs::read_dir(spills.path()).unwrap().count(), 0);
}

#[test]
fn temp_files_are_gone_after_an_error_exit() {
    let input = TempDir::new().unwrap();
    let spills = TempDir::new().unwrap();
    let bytes = encoded(64, 64, CodecFormat::Png);
    let upload = upload(input.path(), "p.png", "image/png", &bytes);

    fn work(upload: &Upload, spills: &Path) -> Result<(), SessionError> {
        let mut session = ImageSession::initialize(upload, &AllowedFormats::All, &options(spills));
        session.resize("a", ResizeMode::Stretch, 8, 8)?;
        session.resize("b", ResizeMode::Stretch, 8, 8)?;
        session.resize("c", ResizeMode::Stretch, 0, 8)?;
        Ok(())
    }

    let err = work(&upload, spills.path()).unwrap_err();
    assert_eq!(err.user_message(), "The requested image size is not valid.");
    assert_eq!(std::fs::read_dir(spills.path()).unwrap().count(), 0);
}

#[test]
fn rejected_upload_is_queryable_but_inert() {
    let input = TempDir::new().unwrap();
    let spills = TempDir::new().unwrap();
    let bytes = encoded(10, 10, CodecFormat::Gif);
    let upload = upload(input.path(), "a.gif", "image/gif", &bytes);
    let allowed = AllowedFormats::only([ImageFormat::Jpeg]).unwrap();

    let mut session = ImageSession::initialize(&upload, &allowed, &options(spills.path()));

    assert!(!session.is_initialized());
    let cause = session.init_error().unwrap();
    assert!(cause.detail().contains("image/gif"));
    assert_eq!(
        cause.user_message(),
        "The uploaded file is not a supported image type."
    );
    let err = session
        .resize("a", ResizeMode::Stretch, 5, 5)
        .unwrap_err();
    assert!(matches!(err, SessionError::NotInitialized(_)));
}

#[test]
fn save_rejects_bad_names_and_formats() {
    let input = TempDir::new().unwrap();
    let spills = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let bytes = encoded(20, 20, CodecFormat::Png);
    let upload = upload(input.path(), "p.png", "image/png", &bytes);
    let mut session = ImageSession::initialize(&upload, &AllowedFormats::All, &options(spills.path()));

    for (name, format, message) in [
        ("bad name", "png", "The output file name is not valid."),
        ("../escape", "png", "The output file name is not valid."),
        ("ok", "webp", "The requested output format is not supported."),
    ] {
        let err = session
            .save(ORIGINAL_ID, out.path(), name, format, None)
            .unwrap_err();
        assert_eq!(err.user_message(), message, "{name}.{format}");
    }
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
}
