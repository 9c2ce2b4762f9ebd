//! Hosted vision-language model traits.

use async_trait::async_trait;

use crate::types::{ImagePayload, ModelResponse, UpstreamFailure};

/// A hosted model accepting an image plus a text prompt.
///
/// Implementations report failures unclassified; callers decide what a
/// failure means for their operation.
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        image: &ImagePayload,
    ) -> std::result::Result<ModelResponse, UpstreamFailure>;
}
