//! Core type definitions for Planview.
//!
//! `upload` holds the image lifecycle types shared by the validator and the
//! transient store; `model` holds the hosted-model request/response shapes.

pub mod model;
pub mod upload;

pub use model::*;
pub use upload::*;
