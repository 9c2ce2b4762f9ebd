//! 3D view generation.
//!
//! The hosted model is asked for an isometric rendering first. The models
//! in use are analysis-only, so the response normally carries text and no
//! image; in that case the plan is run through the local [`pseudo3d`]
//! pipeline instead. The local result is a visual approximation, not
//! generated imagery.
//!
//! Model-name problems get one retry against the fallback model. If that
//! also reports the model as unavailable, a final text round trip decides
//! between a degraded result (the normalized original, flagged as such) and
//! an error carrying both failures.

use base64::Engine;
use bytes::Bytes;
use std::sync::Arc;

use planview_core::{
    traits::VisionModel,
    types::{ImagePayload, ModelResponse, UpstreamFailure},
    Error, Result,
};
use planview_model_gateway::{ErrorClassifier, FailureKind, ISOMETRIC_PROMPT};

use crate::pseudo3d::{self, RenderParams, RenderedImage};
use crate::vision::detect_mime;

/// Which path produced a 3D view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPath {
    /// The model returned an image.
    Inline,
    /// The local pseudo-3D pipeline ran.
    Local,
    /// Every model was unavailable; the normalized original is returned.
    Degraded,
}

impl RenderPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inline => "inline",
            Self::Local => "local",
            Self::Degraded => "degraded",
        }
    }
}

/// A rendered 3D view and how it was produced.
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub image: RenderedImage,
    pub path: RenderPath,
}

impl RenderOutcome {
    pub fn is_degraded(&self) -> bool {
        self.path == RenderPath::Degraded
    }
}

/// Produces the 3D view of a stored floor plan.
pub struct ViewGenerator {
    model: Arc<dyn VisionModel>,
    classifier: Arc<dyn ErrorClassifier>,
    /// Model asked for an image first.
    image_model: String,
    /// Analysis model used for the retry and the final round trip.
    fallback_model: String,
    params: RenderParams,
}

impl ViewGenerator {
    pub fn new(
        model: Arc<dyn VisionModel>,
        classifier: Arc<dyn ErrorClassifier>,
        image_model: impl Into<String>,
        fallback_model: impl Into<String>,
    ) -> Self {
        Self {
            model,
            classifier,
            image_model: image_model.into(),
            fallback_model: fallback_model.into(),
            params: RenderParams::default(),
        }
    }

    /// Generate the 3D view for `image_data`.
    pub async fn generate(&self, image_data: Bytes) -> Result<RenderOutcome> {
        let payload = ImagePayload::new(detect_mime(&image_data)?, image_data.clone());

        let response = match self
            .model
            .generate(&self.image_model, ISOMETRIC_PROMPT, &payload)
            .await
        {
            Ok(response) => response,
            Err(first) if self.classifier.is_model_problem(&first) => {
                tracing::warn!(
                    model = %self.image_model,
                    fallback = %self.fallback_model,
                    error = %first,
                    "Image model not available, retrying with fallback model"
                );
                match self
                    .model
                    .generate(&self.fallback_model, ISOMETRIC_PROMPT, &payload)
                    .await
                {
                    Ok(response) => response,
                    Err(second) => return self.recover(image_data, &payload, second).await,
                }
            }
            Err(first) => return Err(self.surface(&first)),
        };

        if let Some(image) = self.extract_inline(&response).await? {
            return Ok(RenderOutcome {
                image,
                path: RenderPath::Inline,
            });
        }

        tracing::info!("No image in model response, rendering pseudo-3D view locally");
        let params = self.params.clone();
        let image = run_blocking(move || pseudo3d::render(&image_data, &params)).await?;
        Ok(RenderOutcome {
            image,
            path: RenderPath::Local,
        })
    }

    /// Decode an image embedded in the response, re-encoded as PNG.
    async fn extract_inline(&self, response: &ModelResponse) -> Result<Option<RenderedImage>> {
        let Some(inline) = response.inline_image() else {
            return Ok(None);
        };
        let raw = base64::engine::general_purpose::STANDARD
            .decode(inline.data.trim())
            .map_err(|e| Error::image(format!("model returned invalid image data: {}", e)))?;
        tracing::info!(size = raw.len(), "Model returned an image");
        run_blocking(move || pseudo3d::reencode_png(&raw)).await.map(Some)
    }

    /// Handle a failure of the fallback model.
    async fn recover(
        &self,
        image_data: Bytes,
        payload: &ImagePayload,
        failure: UpstreamFailure,
    ) -> Result<RenderOutcome> {
        if self.classifier.classify(&failure) != FailureKind::ModelUnavailable {
            return Err(self.surface(&failure));
        }

        tracing::warn!(
            model = %self.fallback_model,
            error = %failure,
            "Fallback model unavailable, checking it once more before degrading"
        );
        match self
            .model
            .generate(&self.fallback_model, ISOMETRIC_PROMPT, payload)
            .await
        {
            Ok(_) => {
                let image = run_blocking(move || pseudo3d::normalized_png(&image_data)).await?;
                tracing::warn!("Returning degraded 3D view (normalized original)");
                Ok(RenderOutcome {
                    image,
                    path: RenderPath::Degraded,
                })
            }
            Err(last) => {
                planview_governance::track_upstream_error("model_unavailable");
                Err(Error::ModelUnavailable(format!(
                    "{}. Fallback also failed: {}",
                    failure, last
                )))
            }
        }
    }

    fn surface(&self, failure: &UpstreamFailure) -> Error {
        let err = self.classifier.classify(failure).into_error(failure);
        planview_governance::track_upstream_error(err.kind());
        tracing::error!(
            model = %self.image_model,
            error = %err,
            "3D view generation failed"
        );
        err
    }
}

/// Run CPU-bound image work off the async executor.
async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::internal(format!("render task failed: {}", e)))?
}
