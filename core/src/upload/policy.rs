// vitrine/src/upload/policy.rs

use crate::upload::kind::ImageKind;

/// Limits applied to every picture upload, whatever the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
  pub max_file_size_bytes: u64,
  pub allowed_kinds: Vec<ImageKind>,
}

impl UploadPolicy {
  pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 5 * 1024 * 1024;

  pub fn new(max_file_size_bytes: u64) -> Self {
    Self {
      max_file_size_bytes,
      allowed_kinds: ImageKind::ALL.to_vec(),
    }
  }

  pub fn allows(&self, kind: ImageKind) -> bool {
    self.allowed_kinds.contains(&kind)
  }

  pub fn allowed_mime_types(&self) -> Vec<&'static str> {
    self.allowed_kinds.iter().map(|k| k.mime_type()).collect()
  }

  /// Upper bound on a base64 text that can still decode to an acceptable file.
  pub(crate) fn max_encoded_len(&self) -> u64 {
    self.max_file_size_bytes.div_ceil(3) * 4
  }
}

impl Default for UploadPolicy {
  fn default() -> Self {
    Self::new(Self::DEFAULT_MAX_FILE_SIZE_BYTES)
  }
}
