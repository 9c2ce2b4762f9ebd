//! Upstream failure classification.
//!
//! The provider's HTTP status and status string are consulted first.
//! Substring matching on the message is a best-effort fallback for failures
//! that carry no structured signal (transport errors, proxies, SDK-style
//! messages) and is not a contract: provider wording can change at any time.

use planview_core::{types::UpstreamFailure, Error};

/// Category an upstream failure falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Auth,
    Quota,
    SafetyBlocked,
    ModelUnavailable,
    Generic,
}

impl FailureKind {
    /// Convert into the error surfaced to callers.
    pub fn into_error(self, failure: &UpstreamFailure) -> Error {
        let detail = failure.to_string();
        match self {
            Self::Auth => Error::Auth(detail),
            Self::Quota => Error::Quota(detail),
            Self::SafetyBlocked => Error::SafetyBlocked(detail),
            Self::ModelUnavailable => Error::ModelUnavailable(detail),
            Self::Generic => Error::Upstream(detail),
        }
    }
}

/// Maps raw upstream failures onto [`FailureKind`].
pub trait ErrorClassifier: Send + Sync {
    fn classify(&self, failure: &UpstreamFailure) -> FailureKind;

    /// Whether a failure means the requested model name is unusable.
    ///
    /// Broader than `classify(..) == ModelUnavailable`: any mention of the
    /// model, or of something missing or invalid, is enough to justify one
    /// retry against another model name. Auth and quota failures never are.
    fn is_model_problem(&self, failure: &UpstreamFailure) -> bool {
        match self.classify(failure) {
            FailureKind::ModelUnavailable => true,
            FailureKind::Auth | FailureKind::Quota => false,
            _ => {
                let lower = failure.message.to_lowercase();
                ["model", "not found", "does not exist", "invalid", "not available"]
                    .iter()
                    .any(|term| lower.contains(term))
            }
        }
    }
}

/// Classifier for the Generative Language API.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeminiErrorClassifier;

impl GeminiErrorClassifier {
    fn is_auth(failure: &UpstreamFailure) -> bool {
        if matches!(failure.status, Some(401) | Some(403)) {
            return true;
        }
        if matches!(
            failure.code.as_deref(),
            Some("UNAUTHENTICATED") | Some("PERMISSION_DENIED")
        ) {
            return true;
        }
        let text = failure.to_string();
        text.contains("API key")
            || text.contains("401")
            || text.contains("403")
            || text.to_lowercase().contains("authentication")
    }

    fn structured(failure: &UpstreamFailure) -> Option<FailureKind> {
        match failure.code.as_deref() {
            Some("RESOURCE_EXHAUSTED") => return Some(FailureKind::Quota),
            Some("NOT_FOUND") => return Some(FailureKind::ModelUnavailable),
            _ => {}
        }
        match failure.status {
            Some(429) => Some(FailureKind::Quota),
            Some(404) => Some(FailureKind::ModelUnavailable),
            _ => None,
        }
    }

    fn heuristic(failure: &UpstreamFailure) -> FailureKind {
        let lower = failure.message.to_lowercase();
        if lower.contains("quota") || lower.contains("rate limit") || lower.contains("429") {
            FailureKind::Quota
        } else if lower.contains("safety") {
            FailureKind::SafetyBlocked
        } else if lower.contains("model")
            && ["not found", "does not exist", "invalid", "not available"]
                .iter()
                .any(|term| lower.contains(term))
        {
            FailureKind::ModelUnavailable
        } else {
            FailureKind::Generic
        }
    }
}

impl ErrorClassifier for GeminiErrorClassifier {
    fn classify(&self, failure: &UpstreamFailure) -> FailureKind {
        if Self::is_auth(failure) {
            return FailureKind::Auth;
        }
        Self::structured(failure).unwrap_or_else(|| Self::heuristic(failure))
    }
}
