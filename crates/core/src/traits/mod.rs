//! Core traits for Planview.
//!
//! Traits are organized by the seam they describe:
//! - `store`: Transient Store traits (TransientStore, Prunable)
//! - `vision`: hosted-model traits (VisionModel)

pub mod store;
pub mod vision;

pub use store::*;
pub use vision::*;
