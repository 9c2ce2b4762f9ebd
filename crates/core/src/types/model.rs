//! Hosted-model request and response shapes.
//!
//! Responses follow the `generateContent` wire format. Both camelCase and
//! snake_case spellings of the inline image fields are accepted, and image
//! parts are looked up under `candidates[].content.parts[]` as well as a
//! top-level `parts[]`.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Image bytes sent alongside a prompt.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub mime_type: String,
    pub data: Bytes,
}

impl ImagePayload {
    pub fn new(mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }
}

/// Response body of a `generateContent` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelResponse {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<Candidate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<Part>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, alias = "inline_data", skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

/// Base64 encoded binary payload embedded in a response part.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default, alias = "mime_type", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub data: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
}

impl ModelResponse {
    /// A response holding a single text part.
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            candidates: vec![Candidate {
                content: Some(Content {
                    parts: vec![Part {
                        text: Some(text.into()),
                        inline_data: None,
                    }],
                    role: Some("model".into()),
                }),
                finish_reason: Some("STOP".into()),
            }],
            ..Default::default()
        }
    }

    fn all_parts(&self) -> impl Iterator<Item = &Part> {
        self.candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|c| c.parts.iter())
            .chain(self.parts.iter())
    }

    /// Concatenated text of every part, or `None` when there is none.
    pub fn text(&self) -> Option<String> {
        let text: String = self
            .all_parts()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// First embedded image, candidates first, then top-level parts.
    pub fn inline_image(&self) -> Option<&InlineData> {
        self.all_parts()
            .filter_map(|p| p.inline_data.as_ref())
            .find(|d| !d.data.is_empty())
    }

    /// Why the provider's safety filter withheld output, if it did.
    pub fn block_reason(&self) -> Option<String> {
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.clone())
        {
            return Some(reason);
        }
        if self.text().is_none()
            && self
                .candidates
                .iter()
                .any(|c| c.finish_reason.as_deref() == Some("SAFETY"))
        {
            return Some("SAFETY".to_string());
        }
        None
    }
}

/// A failed call to the hosted model, before classification.
///
/// `status` is the HTTP status when the call reached the provider and
/// `code` the provider's own status string (e.g. `PERMISSION_DENIED`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamFailure {
    pub status: Option<u16>,
    pub code: Option<String>,
    pub message: String,
}

impl UpstreamFailure {
    /// A failure that never produced an HTTP response.
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            code: None,
            message: message.into(),
        }
    }

    pub fn http(status: u16, code: Option<String>, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for UpstreamFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.status, &self.code) {
            (Some(status), Some(code)) => write!(f, "{} {}: {}", status, code, self.message),
            (Some(status), None) => write!(f, "{} {}", status, self.message),
            _ => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for UpstreamFailure {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_from_candidates() {
        let resp: ModelResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"parts": [{"text": "• Door: widen"}, {"text": " to 32in"}]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(resp.text().as_deref(), Some("• Door: widen to 32in"));
        assert!(resp.inline_image().is_none());
    }

    #[test]
    fn test_inline_image_snake_case_top_level() {
        let resp: ModelResponse = serde_json::from_value(json!({
            "parts": [{"inline_data": {"mime_type": "image/png", "data": "iVBORw=="}}]
        }))
        .unwrap();
        let img = resp.inline_image().unwrap();
        assert_eq!(img.data, "iVBORw==");
        assert_eq!(img.mime_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn test_inline_image_prefers_candidates() {
        let resp: ModelResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"inlineData": {"mimeType": "image/png", "data": "AAAA"}}]}}],
            "parts": [{"inlineData": {"mimeType": "image/png", "data": "BBBB"}}]
        }))
        .unwrap();
        assert_eq!(resp.inline_image().unwrap().data, "AAAA");
    }

    #[test]
    fn test_block_reason() {
        let resp: ModelResponse = serde_json::from_value(json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        }))
        .unwrap();
        assert_eq!(resp.block_reason().as_deref(), Some("SAFETY"));

        let resp: ModelResponse = serde_json::from_value(json!({
            "candidates": [{"finishReason": "SAFETY"}]
        }))
        .unwrap();
        assert_eq!(resp.block_reason().as_deref(), Some("SAFETY"));

        assert!(ModelResponse::text_only("ok").block_reason().is_none());
    }

    #[test]
    fn test_upstream_failure_display() {
        let f = UpstreamFailure::http(403, Some("PERMISSION_DENIED".into()), "API key not valid");
        assert_eq!(f.to_string(), "403 PERMISSION_DENIED: API key not valid");
        assert_eq!(UpstreamFailure::transport("timed out").to_string(), "timed out");
    }
}
