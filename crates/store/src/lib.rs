#![deny(unused)]
//! Transient Store for Planview.
//!
//! Uploaded images are written under a sanitized name, then copied under a
//! `temp_` handle so a later, independent request can find the same bytes.
//! Two backends are provided: the filesystem (production) and an in-memory
//! map (tests, ephemeral deployments).

pub mod fs;
pub mod memory;
pub mod retention;

use planview_core::{types::TempHandle, Error, Result};

pub use fs::FsTransientStore;
pub use memory::InMemoryTransientStore;
pub use retention::{spawn_sweeper, RetentionPolicy};

/// Reduce a caller-supplied filename to a safe, flat ASCII name.
///
/// Directory components become separators, whitespace runs collapse to a
/// single `_`, anything outside `[A-Za-z0-9_.-]` is dropped, and leading or
/// trailing dots and underscores are stripped. May return an empty string.
pub fn secure_filename(name: &str) -> String {
    let flattened: String = name
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    flattened
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect::<String>()
        .trim_matches(|c| c == '.' || c == '_')
        .to_string()
}

/// Per-request name for the primary copy of a sanitized upload name.
///
/// Concurrent uploads of the same filename never share a primary copy.
pub(crate) fn stored_name_for(sanitized: &str) -> String {
    let token = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}", &token[..8], sanitized)
}

/// Temp handle for a primary copy minted by `stored_name_for`.
pub(crate) fn temp_name_for(stored_name: &str) -> TempHandle {
    TempHandle::new(format!("{}{}", TempHandle::PREFIX, stored_name))
}

/// Reject handles that were not minted by `duplicate`.
///
/// Unknown or unsafe names surface as not-found so callers cannot probe
/// the working directory.
pub(crate) fn check_handle(handle: &TempHandle) -> Result<()> {
    let name = handle.as_str();
    if !handle.has_prefix() || secure_filename(name) != name {
        return Err(Error::not_found(name));
    }
    Ok(())
}

/// Whether `name` can be addressed in the working area as-is.
pub(crate) fn is_safe_name(name: &str) -> bool {
    !name.is_empty() && secure_filename(name) == name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_filename() {
        assert_eq!(secure_filename("My cool plan.png"), "My_cool_plan.png");
        assert_eq!(secure_filename("../../etc/passwd"), "etc_passwd");
        assert_eq!(secure_filename("..\\windows\\plan.JPG"), "windows_plan.JPG");
        assert_eq!(secure_filename("plan (1)?.png"), "plan_1.png");
        assert_eq!(secure_filename("étage.png"), "tage.png");
        assert_eq!(secure_filename("..."), "");
    }

    #[test]
    fn test_stored_names_are_unique_per_upload() {
        let a = stored_name_for("plan.png");
        let b = stored_name_for("plan.png");
        assert_ne!(a, b);
        assert!(a.ends_with("_plan.png"));
        assert!(is_safe_name(&a));
        assert!(!a.starts_with(TempHandle::PREFIX));

        let handle = temp_name_for(&a);
        assert!(handle.has_prefix());
        assert_eq!(handle.as_str(), format!("temp_{a}"));
        assert!(check_handle(&handle).is_ok());
    }

    #[test]
    fn test_check_handle_rejects_unsafe_names() {
        for bad in ["plan.png", "temp_../x.png", "../temp_x.png", "temp_a b.png"] {
            let err = check_handle(&TempHandle::from(bad)).unwrap_err();
            assert!(matches!(err, Error::NotFound(_)), "{bad}");
        }
    }
}
