//! Supported image formats and the upload allow-list.
//!
//! Only three formats go in or out: JPEG, GIF and PNG. Uploads are matched
//! by their declared MIME type; exports are named by [`ImageFormat::extension`].

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One of the three formats the codec handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ImageFormat {
    Jpeg,
    Gif,
    Png,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 3] = [ImageFormat::Jpeg, ImageFormat::Gif, ImageFormat::Png];

    /// Map a declared MIME type to a format.
    ///
    /// `image/pjpeg` is the progressive-JPEG type some browsers still send.
    /// Matching is exact: no case folding, no `; param` suffixes.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/jpeg" | "image/pjpeg" => Some(ImageFormat::Jpeg),
            "image/gif" => Some(ImageFormat::Gif),
            "image/png" => Some(ImageFormat::Png),
            _ => None,
        }
    }

    /// Canonical MIME type.
    pub fn mime(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Png => "image/png",
        }
    }

    /// File extension used for exported files (no dot).
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Gif => "gif",
            ImageFormat::Png => "png",
        }
    }

    /// Guess the MIME type from a file extension. Used by the CLI when no
    /// `--mime` is given; the transport layer normally supplies it.
    pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" | "jpe" => Some("image/jpeg"),
            "gif" => Some("image/gif"),
            "png" => Some("image/png"),
            _ => None,
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Gif => "gif",
            ImageFormat::Png => "png",
        };
        f.write_str(name)
    }
}

/// Error returned when parsing a format name fails.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown image format '{0}' (expected jpeg, gif or png)")]
pub struct UnknownFormat(pub String);

impl FromStr for ImageFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            "gif" => Ok(ImageFormat::Gif),
            "png" => Ok(ImageFormat::Png),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

/// The set of formats an upload may be in.
///
/// Always non-empty: [`AllowedFormats::only`] rejects an empty set, so an
/// invalid allow-list is caught when configuration is built, not per upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AllowedFormats {
    #[default]
    All,
    Only(BTreeSet<ImageFormat>),
}

impl AllowedFormats {
    /// Build a restricted allow-list. Returns `None` for an empty set.
    pub fn only(formats: impl IntoIterator<Item = ImageFormat>) -> Option<Self> {
        let set: BTreeSet<ImageFormat> = formats.into_iter().collect();
        if set.is_empty() {
            None
        } else {
            Some(AllowedFormats::Only(set))
        }
    }

    /// Parse configuration names: `["all"]` or any of `jpeg`, `gif`, `png`.
    ///
    /// Every name is checked. `"all"` mixed with other valid names still
    /// means all formats.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, String> {
        let mut set = BTreeSet::new();
        let mut all = false;
        for name in names {
            let name = name.as_ref();
            if name.trim().eq_ignore_ascii_case("all") {
                all = true;
                continue;
            }
            let format = name.parse::<ImageFormat>().map_err(|e| e.to_string())?;
            set.insert(format);
        }
        if all {
            return Ok(AllowedFormats::All);
        }
        Self::only(set).ok_or_else(|| "allowed_formats must not be empty".to_string())
    }

    pub fn allows(&self, format: ImageFormat) -> bool {
        match self {
            AllowedFormats::All => true,
            AllowedFormats::Only(set) => set.contains(&format),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_mapping_covers_pjpeg() {
        assert_eq!(ImageFormat::from_mime("image/jpeg"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_mime("image/pjpeg"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_mime("image/gif"), Some(ImageFormat::Gif));
        assert_eq!(ImageFormat::from_mime("image/png"), Some(ImageFormat::Png));
    }

    #[test]
    fn mime_mapping_rejects_everything_else() {
        assert_eq!(ImageFormat::from_mime("image/webp"), None);
        assert_eq!(ImageFormat::from_mime("image/x-png"), None);
        assert_eq!(ImageFormat::from_mime("text/plain"), None);
        assert_eq!(ImageFormat::from_mime(""), None);
    }

    #[test]
    fn mime_mapping_is_exact() {
        assert_eq!(ImageFormat::from_mime("IMAGE/PNG"), None);
        assert_eq!(ImageFormat::from_mime(" image/png"), None);
        assert_eq!(ImageFormat::from_mime("image/jpeg; charset=binary"), None);
    }

    #[test]
    fn unknown_format_message() {
        let err = "bmp".parse::<ImageFormat>().unwrap_err();
        assert_eq!(err, UnknownFormat("bmp".into()));
        assert_eq!(
            err.to_string(),
            "unknown image format 'bmp' (expected jpeg, gif or png)"
        );
    }

    #[test]
    fn parse_format_names() {
        assert_eq!("jpg".parse::<ImageFormat>(), Ok(ImageFormat::Jpeg));
        assert_eq!("JPEG".parse::<ImageFormat>(), Ok(ImageFormat::Jpeg));
        assert_eq!("png".parse::<ImageFormat>(), Ok(ImageFormat::Png));
        assert!("bmp".parse::<ImageFormat>().is_err());
    }

    #[test]
    fn extensions() {
        assert_eq!(ImageFormat::Jpeg.extension(), "jpg");
        assert_eq!(ImageFormat::Gif.extension(), "gif");
        assert_eq!(ImageFormat::Png.extension(), "png");
    }

    #[test]
    fn allow_list_all_sentinel() {
        let allowed = AllowedFormats::from_names(&["all"]).unwrap();
        assert_eq!(allowed, AllowedFormats::All);
        for format in ImageFormat::ALL {
            assert!(allowed.allows(format));
        }
    }

    #[test]
    fn allow_list_restricts() {
        let allowed = AllowedFormats::from_names(&["jpeg", "png"]).unwrap();
        assert!(allowed.allows(ImageFormat::Jpeg));
        assert!(allowed.allows(ImageFormat::Png));
        assert!(!allowed.allows(ImageFormat::Gif));
    }

    #[test]
    fn allow_list_rejects_empty_and_unknown() {
        let empty: [&str; 0] = [];
        assert!(AllowedFormats::from_names(&empty).is_err());
        assert!(AllowedFormats::from_names(&["tiff"]).is_err());
        assert!(AllowedFormats::only([]).is_none());
    }

    #[test]
    fn allow_list_checks_every_name_regardless_of_order() {
        assert!(AllowedFormats::from_names(&["all", "tiff"]).is_err());
        assert!(AllowedFormats::from_names(&["tiff", "all"]).is_err());
        assert_eq!(
            AllowedFormats::from_names(&["png", "all"]).unwrap(),
            AllowedFormats::All
        );
    }
}
