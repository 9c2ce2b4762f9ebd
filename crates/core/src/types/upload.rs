//! Uploaded image lifecycle types.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// An image received from a caller, before it is written to storage.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    /// Filename as declared by the caller.
    pub filename: String,
    /// Lowercased extension without the dot.
    pub extension: String,
    /// Raw image bytes.
    pub bytes: Bytes,
}

impl UploadedImage {
    /// Size of the image in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Reference to an image written to the working area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRef {
    /// Per-upload name the bytes were stored under (token plus sanitized filename).
    pub name: String,
    /// Number of bytes written.
    pub size: u64,
}

/// Name correlating a stored temp copy across two independent requests.
///
/// Single use: the copy behind it is removed once the 3D view is rendered
/// or an error path cleans it up.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TempHandle(String);

impl TempHandle {
    /// Marker every temp copy name starts with.
    pub const PREFIX: &'static str = "temp_";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the name carries the temp marker.
    pub fn has_prefix(&self) -> bool {
        self.0.starts_with(Self::PREFIX)
    }
}

impl std::fmt::Display for TempHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TempHandle {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TempHandle {
    fn from(s: String) -> Self {
        Self(s)
    }
}
