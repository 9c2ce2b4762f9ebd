//! Vision feedback for uploaded floor plans.
//!
//! Sends the plan and a fixed review prompt to the hosted vision model and
//! returns its bullet-point feedback. No retries: each failure is
//! classified once and surfaced.

use bytes::Bytes;
use std::sync::Arc;

use planview_core::{
    traits::VisionModel,
    types::{ImagePayload, UpstreamFailure},
    Error, Result,
};
use planview_model_gateway::{ErrorClassifier, FEEDBACK_PROMPT};

/// MIME type sniffed from the image's magic bytes.
pub fn detect_mime(image_data: &[u8]) -> Result<&'static str> {
    image::guess_format(image_data)
        .map(|f| f.to_mime_type())
        .map_err(|e| Error::image(format!("unrecognized image data: {}", e)))
}

/// Vision processor for analyzing floor plans.
pub struct VisionProcessor {
    /// Hosted model client.
    model: Arc<dyn VisionModel>,
    classifier: Arc<dyn ErrorClassifier>,
    /// Model name feedback is requested from.
    model_name: String,
}

impl VisionProcessor {
    /// Create a new vision processor.
    pub fn new(
        model: Arc<dyn VisionModel>,
        classifier: Arc<dyn ErrorClassifier>,
        model_name: impl Into<String>,
    ) -> Self {
        Self {
            model,
            classifier,
            model_name: model_name.into(),
        }
    }

    fn classify(&self, failure: &UpstreamFailure) -> Error {
        let err = self.classifier.classify(failure).into_error(failure);
        planview_governance::track_upstream_error(err.kind());
        err
    }

    /// Request review feedback for a floor plan.
    pub async fn analyze(&self, image_data: &Bytes) -> Result<String> {
        let payload = ImagePayload::new(detect_mime(image_data)?, image_data.clone());

        tracing::info!(
            model = %self.model_name,
            image_size = image_data.len(),
            "Analyzing floor plan"
        );

        let response = self
            .model
            .generate(&self.model_name, FEEDBACK_PROMPT, &payload)
            .await
            .map_err(|f| self.classify(&f))?;

        if let Some(reason) = response.block_reason() {
            planview_governance::track_upstream_error("safety_blocked");
            return Err(Error::SafetyBlocked(reason));
        }

        response.text().ok_or_else(|| {
            planview_governance::track_upstream_error("empty_response");
            Error::EmptyResponse
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use planview_core::mocks::MockVisionModel;
    use planview_core::types::ModelResponse;
    use planview_model_gateway::GeminiErrorClassifier;
    use std::io::Cursor;

    fn plan() -> Bytes {
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(4, 4))
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        Bytes::from(out)
    }

    fn processor(mock: MockVisionModel) -> VisionProcessor {
        VisionProcessor::new(Arc::new(mock), Arc::new(GeminiErrorClassifier), "gemini-2.5-flash")
    }

    #[tokio::test]
    async fn test_analyze_returns_feedback() {
        let p = processor(MockVisionModel::text("• Door: widen to 32in"));
        assert_eq!(p.analyze(&plan()).await.unwrap(), "• Door: widen to 32in");
    }

    #[tokio::test]
    async fn test_analyze_classifies_failures() {
        let cases = [
            (UpstreamFailure::http(403, None, "denied"), "auth"),
            (UpstreamFailure::transport("API key not valid"), "auth"),
            (UpstreamFailure::http(429, None, "slow down"), "quota"),
            (UpstreamFailure::transport("blocked by safety"), "safety_blocked"),
            (UpstreamFailure::http(500, None, "boom"), "upstream"),
        ];
        for (failure, kind) in cases {
            let p = processor(MockVisionModel::failing(failure));
            assert_eq!(p.analyze(&plan()).await.unwrap_err().kind(), kind);
        }
    }

    #[tokio::test]
    async fn test_analyze_preserves_upstream_message() {
        let p = processor(MockVisionModel::failing(UpstreamFailure::transport("socket hang up")));
        let err = p.analyze(&plan()).await.unwrap_err();
        assert_eq!(err.to_string(), "Gemini API error: socket hang up");
    }

    #[tokio::test]
    async fn test_empty_and_blocked_responses() {
        let p = processor(MockVisionModel::new(vec![Ok(ModelResponse::default())]));
        assert!(matches!(p.analyze(&plan()).await, Err(Error::EmptyResponse)));

        let blocked: ModelResponse =
            serde_json::from_value(serde_json::json!({"promptFeedback": {"blockReason": "SAFETY"}}))
                .unwrap();
        let p = processor(MockVisionModel::new(vec![Ok(blocked)]));
        assert!(matches!(p.analyze(&plan()).await, Err(Error::SafetyBlocked(_))));
    }

    #[tokio::test]
    async fn test_analyze_rejects_non_image_bytes() {
        let mock = Arc::new(MockVisionModel::text("unused"));
        let p = VisionProcessor::new(mock.clone(), Arc::new(GeminiErrorClassifier), "m");
        let err = p.analyze(&Bytes::from_static(b"hello")).await.unwrap_err();
        assert!(matches!(err, Error::Image(_)));
        assert_eq!(mock.call_count(), 0);
    }
}
