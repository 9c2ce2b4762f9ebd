//! Upload validation.
//!
//! Runs before anything touches storage: a rejected upload has no side
//! effects.

use planview_core::{Error, Result};

/// Checks presence, extension, and size of an uploaded image.
#[derive(Debug, Clone)]
pub struct UploadValidator {
    allowed_extensions: Vec<String>,
    max_file_size: u64,
}

impl UploadValidator {
    /// Create a validator. Extensions are matched case-insensitively.
    pub fn new(allowed_extensions: &[String], max_file_size: u64) -> Self {
        Self {
            allowed_extensions: allowed_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            max_file_size,
        }
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Extension of `filename` if it is on the allow-list.
    ///
    /// Only the text after the last dot counts, so `plan.png.exe` is
    /// rejected and a name without a dot never matches.
    pub fn allowed_extension(&self, filename: &str) -> Option<String> {
        let (_, ext) = filename.rsplit_once('.')?;
        let ext = ext.to_ascii_lowercase();
        self.allowed_extensions.contains(&ext).then_some(ext)
    }

    /// Validate a declared filename and byte length.
    ///
    /// Returns the lowercased extension on success.
    pub fn validate(&self, filename: Option<&str>, size: u64) -> Result<String> {
        let filename = filename.ok_or(Error::NoFile)?;
        if filename.is_empty() {
            return Err(Error::NoFileSelected);
        }

        let ext = self
            .allowed_extension(filename)
            .ok_or_else(|| Error::DisallowedExtension {
                allowed: self.allowed_extensions.join(", "),
            })?;

        if size > self.max_file_size {
            return Err(Error::TooLarge {
                size,
                limit: self.max_file_size,
            });
        }
        Ok(ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use planview_core::config::UploadConfig;

    fn validator() -> UploadValidator {
        let cfg = UploadConfig::default();
        UploadValidator::new(&cfg.allowed_extensions, cfg.max_file_size)
    }

    #[test]
    fn test_accepts_allowed_extensions_case_insensitively() {
        let v = validator();
        for name in ["a.png", "b.JPG", "c.Jpeg", "d.gif", "e.BMP", "f.webp"] {
            assert!(v.validate(Some(name), 10).is_ok(), "{name}");
        }
        assert_eq!(v.validate(Some("plan.PNG"), 1).unwrap(), "png");
    }

    #[test]
    fn test_rejects_disallowed_extensions() {
        let v = validator();
        for name in ["plan.pdf", "plan", "plan.png.exe", "png", "plan.tiff"] {
            let err = v.validate(Some(name), 10).unwrap_err();
            assert!(matches!(err, Error::DisallowedExtension { .. }), "{name}");
        }
        let err = v.validate(Some("plan.pdf"), 10).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid file type. Allowed types: png, jpg, jpeg, gif, bmp, webp"
        );
    }

    #[test]
    fn test_missing_and_empty_filename() {
        let v = validator();
        assert!(matches!(v.validate(None, 1).unwrap_err(), Error::NoFile));
        assert!(matches!(
            v.validate(Some(""), 1).unwrap_err(),
            Error::NoFileSelected
        ));
    }

    #[test]
    fn test_size_ceiling_is_inclusive() {
        let v = validator();
        let limit = v.max_file_size();
        assert!(v.validate(Some("plan.png"), limit).is_ok());

        let err = v.validate(Some("plan.png"), limit + 1).unwrap_err();
        assert!(matches!(err, Error::TooLarge { .. }));
        assert_eq!(err.to_string(), "File size (16.00MB) exceeds the 16MB limit");
    }

    #[test]
    fn test_extension_checked_before_size() {
        let v = validator();
        let err = v.validate(Some("plan.pdf"), u64::MAX).unwrap_err();
        assert!(matches!(err, Error::DisallowedExtension { .. }));
    }
}
