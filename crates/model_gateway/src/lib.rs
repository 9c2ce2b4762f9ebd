#![deny(unused)]
//! Model Gateway for Planview.
//!
//! This crate provides:
//! - A `generateContent` REST client for the hosted vision model
//! - The fixed prompts sent with each image
//! - Classification of upstream failures into the error taxonomy

pub mod classify;
pub mod gemini;
pub mod prompts;

pub use classify::{ErrorClassifier, FailureKind, GeminiErrorClassifier};
pub use gemini::GeminiClient;
pub use prompts::{FEEDBACK_PROMPT, ISOMETRIC_PROMPT};
