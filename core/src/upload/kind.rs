// vitrine/src/upload/kind.rs

//! Image formats accepted for product pictures and their magic-byte detection.

use tracing::warn;

/// The picture formats the catalog stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKind {
  Jpeg,
  Png,
  Gif,
  Webp,
}

impl ImageKind {
  pub const ALL: [ImageKind; 4] = [ImageKind::Jpeg, ImageKind::Png, ImageKind::Gif, ImageKind::Webp];

  pub fn mime_type(self) -> &'static str {
    match self {
      ImageKind::Jpeg => "image/jpeg",
      ImageKind::Png => "image/png",
      ImageKind::Gif => "image/gif",
      ImageKind::Webp => "image/webp",
    }
  }

  /// Extension used when the client supplied none.
  pub fn canonical_extension(self) -> &'static str {
    match self {
      ImageKind::Jpeg => "jpg",
      ImageKind::Png => "png",
      ImageKind::Gif => "gif",
      ImageKind::Webp => "webp",
    }
  }

  pub fn from_extension(extension: &str) -> Option<Self> {
    match extension.to_ascii_lowercase().as_str() {
      "jpg" | "jpeg" => Some(ImageKind::Jpeg),
      "png" => Some(ImageKind::Png),
      "gif" => Some(ImageKind::Gif),
      "webp" => Some(ImageKind::Webp),
      _ => None,
    }
  }

  /// Maps a declared MIME type (parameters and case ignored). `image/jpg` is a
  /// common client spelling of `image/jpeg`.
  pub fn from_mime_type(mime: &str) -> Option<Self> {
    let essence = mime.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    match essence.as_str() {
      "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(ImageKind::Jpeg),
      "image/png" => Some(ImageKind::Png),
      "image/gif" => Some(ImageKind::Gif),
      "image/webp" => Some(ImageKind::Webp),
      _ => None,
    }
  }

  /// Detects the format from the leading bytes of the file.
  pub fn sniff(data: &[u8]) -> Option<Self> {
    if data.len() >= 3 && data[..3] == [0xFF, 0xD8, 0xFF] {
      return Some(ImageKind::Jpeg);
    }
    if data.len() >= 8 && data[..8] == [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A] {
      return Some(ImageKind::Png);
    }
    if data.len() >= 6 && (&data[..6] == b"GIF87a" || &data[..6] == b"GIF89a") {
      return Some(ImageKind::Gif);
    }
    if data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP" {
      return Some(ImageKind::Webp);
    }
    warn!(
      "Unrecognized image content, first bytes: {:02X?}",
      &data[..8.min(data.len())]
    );
    None
  }
}

impl std::fmt::Display for ImageKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.mime_type())
  }
}
