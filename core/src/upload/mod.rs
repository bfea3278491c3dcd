//! Picture upload validation and storage.

pub mod error;
pub mod kind;
pub mod policy;
pub mod store;
pub mod validate;

pub use error::UploadError;
pub use kind::ImageKind;
pub use policy::UploadPolicy;
pub use store::{StoredFile, UploadStore};
pub use validate::{sanitize_file_name, UploadSource, ValidatedImage};
