#![deny(unused)]
//! HTTP gateway for Planview.
//!
//! This crate wires the upload lifecycle together: validation, the
//! transient store, vision feedback, and the pseudo-3D view, behind an
//! axum router.

pub mod pseudo3d;
pub mod render;
pub mod server;
pub mod validator;
pub mod vision;

pub use pseudo3d::{RenderParams, RenderedImage};
pub use render::{RenderOutcome, RenderPath, ViewGenerator};
pub use server::{AnalyzeResponse, GatewayConfig, GatewayServer, GenerateResponse};
pub use validator::UploadValidator;
pub use vision::VisionProcessor;
