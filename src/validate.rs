//! Format Validator: the minimal guarantee checked before any codec runs.
//!
//! An expected mismatch (missing file, directory instead of file, wrong
//! extension) is reported as a [`Validation`] value, not an error. Only a
//! genuine file-system failure while probing the path, such as a permission
//! error on a parent directory, surfaces as [`ConvertError::Unreadable`].

use crate::error::ConvertError;
use crate::format::{extension_of, FormatSpec};
use std::io::ErrorKind as IoErrorKind;
use std::path::Path;
use tracing::debug;

/// Outcome of [`validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Valid,
    /// Nothing exists at the path.
    Missing(String),
    /// Something exists but it is not a regular file.
    NotAFile(String),
    /// The extension is absent or not in the allowed set.
    UnsupportedExtension(String),
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid)
    }

    /// Human-readable reason; empty for [`Validation::Valid`].
    pub fn reason(&self) -> &str {
        match self {
            Validation::Valid => "",
            Validation::Missing(r) | Validation::NotAFile(r) | Validation::UnsupportedExtension(r) => r,
        }
    }

    /// Turn a failed validation into the matching error.
    pub fn into_result(self, path: &Path) -> Result<(), ConvertError> {
        match self {
            Validation::Valid => Ok(()),
            Validation::Missing(reason) | Validation::NotAFile(reason) => {
                Err(ConvertError::FileNotFound {
                    path: path.to_path_buf(),
                    reason,
                })
            }
            Validation::UnsupportedExtension(reason) => Err(ConvertError::UnsupportedFormat(reason)),
        }
    }
}

/// Check that `path` is an existing regular file whose extension is in `allowed`.
pub fn validate(path: &Path, allowed: &FormatSpec) -> Result<Validation, ConvertError> {
    let meta = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == IoErrorKind::NotFound => {
            return Ok(Validation::Missing(format!(
                "File does not exist: {}",
                path.display()
            )));
        }
        Err(e) => {
            return Err(ConvertError::Unreadable {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    if !meta.is_file() {
        return Ok(Validation::NotAFile(format!("Not a file: {}", path.display())));
    }

    match extension_of(path) {
        Some(ext) if allowed.contains(&ext) => {
            debug!("Validated {} as .{}", path.display(), ext);
            Ok(Validation::Valid)
        }
        Some(ext) => Ok(Validation::UnsupportedExtension(format!(
            "Unsupported file extension: {}. Allowed: {}",
            ext,
            allowed.describe()
        ))),
        None => Ok(Validation::UnsupportedExtension(format!(
            "File has no extension: {}. Allowed: {}",
            path.display(),
            allowed.describe()
        ))),
    }
}
